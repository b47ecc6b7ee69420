use std::sync::Arc;

use server::config::Config;
use server::services::directory::{MemoryDirectory, PgDirectory, RoomDirectory};
use server::services::identity::{DevIdentity, IdentityResolver, PgIdentity};
use server::{db, routes, services, state};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // A missing .env is normal outside development.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("failed to load .env: {e}");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run(Config::from_env()).await {
        tracing::error!(error = %e, "board service stopped");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let (directory, identity): (Arc<dyn RoomDirectory>, Arc<dyn IdentityResolver>) = match &config.database_url {
        Some(url) => {
            let pool = db::init_pool(url, config.db_max_connections).await?;
            tracing::info!(max_connections = config.db_max_connections, "database ready");
            let identity: Arc<dyn IdentityResolver> =
                if config.dev_auth { Arc::new(DevIdentity) } else { Arc::new(PgIdentity::new(pool.clone())) };
            (Arc::new(PgDirectory::new(pool)), identity)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; rooms live in memory and dev tokens are accepted");
            (Arc::new(MemoryDirectory::open()), Arc::new(DevIdentity))
        }
    };
    if config.dev_auth {
        tracing::warn!("DEV_AUTH enabled; websocket tokens are trusted as user:role:name");
    }

    let port = config.port;
    let state = state::AppState::new(config, directory, identity);

    // Spawn background persistence task.
    let _persistence = services::persistence::spawn_persistence_task(state.clone());

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!(%port, "board service listening");
    axum::serve(listener, app).await?;
    Ok(())
}
