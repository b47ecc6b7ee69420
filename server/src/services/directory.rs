//! Room directory: persisted room metadata and element snapshots.
//!
//! DESIGN
//! ======
//! The board service only needs five questions answered by storage, so they
//! sit behind the [`RoomDirectory`] trait. `PgDirectory` stores rooms in
//! Postgres with elements and the allow-list as JSONB arrays;
//! `MemoryDirectory` keeps records in a map for tests and database-less
//! development.
//!
//! ERROR HANDLING
//! ==============
//! Persisted elements are decoded one by one. A record that still does not
//! parse after the legacy defaults is kept verbatim in
//! [`RoomRecord::unreadable`] and written back after the readable elements on
//! every save, so one bad element neither blocks the room nor gets erased.

use std::collections::HashMap;

use frames::{Element, ErrorCode};
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::warn;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("room not found: {0}")]
    NotFound(String),
    #[error("element encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ErrorCode for DirectoryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => "E_DATABASE",
            Self::NotFound(_) => "E_ROOM_NOT_FOUND",
            Self::Encode(_) => "E_ENCODE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Persisted view of a room.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomRecord {
    pub room_id: String,
    pub name: String,
    pub owner_id: Option<String>,
    pub elements: Vec<Element>,
    /// Persisted entries that could not be decoded, kept as stored.
    pub unreadable: Vec<Value>,
    pub allow_list: Vec<String>,
    pub participants: Vec<String>,
}

impl RoomRecord {
    /// Fresh, empty record.
    #[must_use]
    pub fn empty(room_id: impl Into<String>, name: impl Into<String>, owner_id: Option<String>) -> Self {
        Self {
            room_id: room_id.into(),
            name: name.into(),
            owner_id,
            elements: Vec::new(),
            unreadable: Vec::new(),
            allow_list: Vec::new(),
            participants: Vec::new(),
        }
    }
}

#[async_trait::async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Load a room for hydration. `Ok(None)` when it does not exist.
    async fn load_room(&self, room_id: &str) -> Result<Option<RoomRecord>, DirectoryError>;

    /// Existence probe backing `GET /api/rooms/{id}`.
    async fn exists(&self, room_id: &str) -> Result<bool, DirectoryError>;

    /// Overwrite the room's persisted element array with `elements`
    /// followed by the `unreadable` entries from hydration.
    async fn save_elements(
        &self,
        room_id: &str,
        elements: &[Element],
        unreadable: &[Value],
    ) -> Result<(), DirectoryError>;

    /// Remember that `user_id` joined. Idempotent.
    async fn add_participant(&self, room_id: &str, user_id: &str, role: &str) -> Result<(), DirectoryError>;

    /// Add `user_id` to, or remove it from, the allow-list. Idempotent.
    async fn set_allowed(&self, room_id: &str, user_id: &str, allowed: bool) -> Result<(), DirectoryError>;
}

// =============================================================================
// POSTGRES
// =============================================================================

pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RoomDirectory for PgDirectory {
    async fn load_room(&self, room_id: &str) -> Result<Option<RoomRecord>, DirectoryError> {
        let row = sqlx::query_as::<_, (String, Option<String>, Value, Value)>(
            "SELECT name, owner_id, elements, allow_list FROM rooms WHERE room_id = $1",
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((name, owner_id, elements, allow_list)) = row else {
            return Ok(None);
        };

        let participants: Vec<String> =
            sqlx::query_scalar("SELECT user_id FROM room_participants WHERE room_id = $1 ORDER BY joined_at")
                .bind(room_id)
                .fetch_all(&self.pool)
                .await?;

        let (elements, unreadable) = decode_elements(room_id, elements);
        Ok(Some(RoomRecord {
            room_id: room_id.to_owned(),
            name,
            owner_id,
            elements,
            unreadable,
            allow_list: decode_allow_list(allow_list),
            participants,
        }))
    }

    async fn exists(&self, room_id: &str) -> Result<bool, DirectoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM rooms WHERE room_id = $1)")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn save_elements(
        &self,
        room_id: &str,
        elements: &[Element],
        unreadable: &[Value],
    ) -> Result<(), DirectoryError> {
        let payload = encode_elements(elements, unreadable)?;
        let result = sqlx::query("UPDATE rooms SET elements = $2, updated_at = now() WHERE room_id = $1")
            .bind(room_id)
            .bind(payload)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DirectoryError::NotFound(room_id.to_owned()));
        }
        Ok(())
    }

    async fn add_participant(&self, room_id: &str, user_id: &str, role: &str) -> Result<(), DirectoryError> {
        sqlx::query(
            "INSERT INTO room_participants (room_id, user_id, role, joined_at) \
             VALUES ($1, $2, $3, now()) \
             ON CONFLICT (room_id, user_id) DO NOTHING",
        )
        .bind(room_id)
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_allowed(&self, room_id: &str, user_id: &str, allowed: bool) -> Result<(), DirectoryError> {
        let sql = if allowed {
            "UPDATE rooms SET allow_list = CASE \
                 WHEN allow_list ? $2 THEN allow_list \
                 ELSE allow_list || to_jsonb($2::text) END, \
             updated_at = now() WHERE room_id = $1"
        } else {
            "UPDATE rooms SET allow_list = allow_list - $2::text, updated_at = now() WHERE room_id = $1"
        };
        let result = sqlx::query(sql).bind(room_id).bind(user_id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DirectoryError::NotFound(room_id.to_owned()));
        }
        Ok(())
    }
}

/// Split a persisted array into decoded elements and entries kept verbatim.
fn decode_elements(room_id: &str, raw: Value) -> (Vec<Element>, Vec<Value>) {
    let items = match raw {
        Value::Array(items) => items,
        Value::Null => return (Vec::new(), Vec::new()),
        other => vec![other],
    };
    let mut elements = Vec::with_capacity(items.len());
    let mut unreadable = Vec::new();
    for item in items {
        match Element::deserialize(&item) {
            Ok(element) => elements.push(element),
            Err(e) => {
                warn!(%room_id, error = %e, "keeping unreadable persisted element as stored");
                unreadable.push(item);
            }
        }
    }
    (elements, unreadable)
}

/// Persisted array: decoded elements first, then the entries kept verbatim.
fn encode_elements(elements: &[Element], unreadable: &[Value]) -> Result<Value, serde_json::Error> {
    let mut items = Vec::with_capacity(elements.len() + unreadable.len());
    for element in elements {
        items.push(serde_json::to_value(element)?);
    }
    items.extend(unreadable.iter().cloned());
    Ok(Value::Array(items))
}

fn decode_allow_list(raw: Value) -> Vec<String> {
    let Value::Array(items) = raw else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(id) => Some(id),
            _ => None,
        })
        .collect()
}

// =============================================================================
// MEMORY
// =============================================================================

/// In-process directory. Records vanish with the process.
#[derive(Default)]
pub struct MemoryDirectory {
    rooms: RwLock<HashMap<String, RoomRecord>>,
    /// Unknown rooms are created empty on first load.
    create_on_load: bool,
}

impl MemoryDirectory {
    /// Directory that only knows rooms added with [`MemoryDirectory::insert`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory that creates an empty room for any id it is asked to load.
    #[must_use]
    pub fn open() -> Self {
        Self { rooms: RwLock::new(HashMap::new()), create_on_load: true }
    }

    pub async fn insert(&self, record: RoomRecord) {
        self.rooms.write().await.insert(record.room_id.clone(), record);
    }

    pub async fn remove(&self, room_id: &str) -> Option<RoomRecord> {
        self.rooms.write().await.remove(room_id)
    }

    pub async fn get(&self, room_id: &str) -> Option<RoomRecord> {
        self.rooms.read().await.get(room_id).cloned()
    }
}

#[async_trait::async_trait]
impl RoomDirectory for MemoryDirectory {
    async fn load_room(&self, room_id: &str) -> Result<Option<RoomRecord>, DirectoryError> {
        let mut rooms = self.rooms.write().await;
        if let Some(record) = rooms.get(room_id) {
            return Ok(Some(record.clone()));
        }
        if !self.create_on_load {
            return Ok(None);
        }
        let record = RoomRecord::empty(room_id, "Untitled Board", None);
        rooms.insert(room_id.to_owned(), record.clone());
        Ok(Some(record))
    }

    async fn exists(&self, room_id: &str) -> Result<bool, DirectoryError> {
        Ok(self.rooms.read().await.contains_key(room_id))
    }

    async fn save_elements(
        &self,
        room_id: &str,
        elements: &[Element],
        unreadable: &[Value],
    ) -> Result<(), DirectoryError> {
        let mut rooms = self.rooms.write().await;
        let record = rooms.get_mut(room_id).ok_or_else(|| DirectoryError::NotFound(room_id.to_owned()))?;
        record.elements = elements.to_vec();
        record.unreadable = unreadable.to_vec();
        Ok(())
    }

    async fn add_participant(&self, room_id: &str, user_id: &str, _role: &str) -> Result<(), DirectoryError> {
        let mut rooms = self.rooms.write().await;
        let record = rooms.get_mut(room_id).ok_or_else(|| DirectoryError::NotFound(room_id.to_owned()))?;
        if !record.participants.iter().any(|p| p == user_id) {
            record.participants.push(user_id.to_owned());
        }
        Ok(())
    }

    async fn set_allowed(&self, room_id: &str, user_id: &str, allowed: bool) -> Result<(), DirectoryError> {
        let mut rooms = self.rooms.write().await;
        let record = rooms.get_mut(room_id).ok_or_else(|| DirectoryError::NotFound(room_id.to_owned()))?;
        let present = record.allow_list.iter().any(|id| id == user_id);
        if allowed && !present {
            record.allow_list.push(user_id.to_owned());
        } else if !allowed {
            record.allow_list.retain(|id| id != user_id);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "directory_test.rs"]
mod tests;
