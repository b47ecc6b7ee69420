//! Client-side error taxonomy.

use frames::{ErrorCode, EventError};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The local participant lacks edit rights. Never surfaced to others.
    #[error("editing is not permitted")]
    PermissionDenied,
    /// The room no longer exists; local state must be dropped.
    #[error("room not found")]
    RoomNotFound,
    /// Upload or API failure; the optimistic element is rolled back.
    #[error("network error: {0}")]
    TransientNetwork(String),
    #[error(transparent)]
    Decode(#[from] EventError),
}

impl ErrorCode for CoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "E_FORBIDDEN",
            Self::RoomNotFound => "E_ROOM_NOT_FOUND",
            Self::TransientNetwork(_) => "E_NETWORK",
            Self::Decode(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::TransientNetwork(_))
    }
}
