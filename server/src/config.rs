//! Process configuration loaded from the environment.
//!
//! `.env` is read by `dotenvy` in `main` before [`Config::from_env`] runs, so
//! every knob can live either in the shell or in the file.

use std::str::FromStr;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1000;
const DEFAULT_CLIENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Absent selects the in-memory room directory.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Sleep between dirty-room flush passes.
    pub flush_interval_ms: u64,
    /// Outbound queue depth per websocket connection.
    pub client_channel_capacity: usize,
    /// Reject mutating frames from participants who are not on the allow-list.
    pub enforce_edit_rights: bool,
    /// Accept `user:role:name` tokens instead of one-time tickets.
    pub dev_auth: bool,
    /// Bearer token required on `/internal/*` routes when set.
    pub internal_token: Option<String>,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            database_url: env_string("DATABASE_URL"),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            flush_interval_ms: env_parse("FLUSH_INTERVAL_MS", DEFAULT_FLUSH_INTERVAL_MS),
            client_channel_capacity: env_parse("CLIENT_CHANNEL_CAPACITY", DEFAULT_CLIENT_CHANNEL_CAPACITY),
            enforce_edit_rights: env_parse("ENFORCE_EDIT_RIGHTS", true),
            dev_auth: env_parse("DEV_AUTH", false),
            internal_token: env_string("INTERNAL_TOKEN"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            client_channel_capacity: DEFAULT_CLIENT_CHANNEL_CAPACITY,
            enforce_edit_rights: true,
            dev_auth: false,
            internal_token: None,
        }
    }
}

/// Parse `key` from the environment, falling back to `default` when the
/// variable is unset or does not parse.
pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
