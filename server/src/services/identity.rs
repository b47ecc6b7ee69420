//! Identity resolution for websocket upgrades.
//!
//! DESIGN
//! ======
//! Clients pass a bearer credential as the `token` query parameter. In
//! production the credential is a one-time ticket minted by the account
//! service into `ws_tickets`; consuming it is a single atomic DELETE. Local
//! development can switch to `DevIdentity`, which trusts a
//! `user:role:name` triple.

use frames::{ErrorCode, Role};
use sqlx::{PgPool, Row};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
    pub username: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("missing credential")]
    Missing,
    #[error("invalid or expired credential")]
    Invalid,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ErrorCode for IdentityError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Missing | Self::Invalid => "E_UNAUTHORIZED",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

#[async_trait::async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Identity, IdentityError>;
}

/// Parse a role name. Legacy `teacher`/`student` spellings are accepted.
#[must_use]
pub fn parse_role(raw: &str) -> Role {
    match raw.trim().to_ascii_lowercase().as_str() {
        "owner" | "teacher" => Role::Owner,
        _ => Role::Participant,
    }
}

// =============================================================================
// TICKETS
// =============================================================================

/// Consumes one-time tickets from Postgres.
pub struct PgIdentity {
    pool: PgPool,
}

impl PgIdentity {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl IdentityResolver for PgIdentity {
    async fn resolve(&self, token: &str) -> Result<Identity, IdentityError> {
        if token.is_empty() {
            return Err(IdentityError::Missing);
        }
        let row = sqlx::query(
            "DELETE FROM ws_tickets t USING users u \
             WHERE t.ticket = $1 AND t.expires_at > now() AND u.id = t.user_id \
             RETURNING t.user_id, u.username, u.role",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(IdentityError::Invalid);
        };
        let role: String = row.try_get("role")?;
        Ok(Identity { user_id: row.try_get("user_id")?, role: parse_role(&role), username: row.try_get("username")? })
    }
}

// =============================================================================
// DEVELOPMENT
// =============================================================================

/// Trusts `user:role:name` tokens. `name` defaults to the user id.
pub struct DevIdentity;

#[async_trait::async_trait]
impl IdentityResolver for DevIdentity {
    async fn resolve(&self, token: &str) -> Result<Identity, IdentityError> {
        let mut parts = token.splitn(3, ':');
        let user_id = parts.next().map(str::trim).unwrap_or_default();
        if user_id.is_empty() {
            return Err(IdentityError::Missing);
        }
        let Some(role) = parts.next() else {
            return Err(IdentityError::Invalid);
        };
        let username = parts.next().map(str::trim).filter(|n| !n.is_empty()).unwrap_or(user_id);
        Ok(Identity { user_id: user_id.to_owned(), role: parse_role(role), username: username.to_owned() })
    }
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
