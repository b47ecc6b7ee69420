//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the room directory, the identity resolver, and a map of live
//! rooms. Each live room owns its authoritative element store, allow-list,
//! connected clients, and a dirty flag plus revision counter for debounced
//! persistence.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use frames::{ElementStore, Frame, PresenceEntry};
use serde_json::Value;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::config::Config;
use crate::services::directory::{RoomDirectory, RoomRecord};
use crate::services::identity::IdentityResolver;

// =============================================================================
// ROOM STATE
// =============================================================================

/// One live websocket connection in a room.
pub struct ConnectedClient {
    pub tx: mpsc::Sender<Frame>,
    pub presence: PresenceEntry,
}

/// Per-room live state. Kept in memory while any client is connected.
/// Flushed to the directory by the persistence task.
pub struct RoomState {
    pub name: String,
    pub owner_id: Option<String>,
    pub elements: ElementStore,
    /// Persisted entries that could not be decoded; written back on flush.
    pub unreadable: Vec<Value>,
    /// Participants currently allowed to edit.
    pub allow_list: HashSet<String>,
    /// Every user who has ever joined.
    pub participants: HashSet<String>,
    /// Connected clients keyed by connection id.
    pub clients: HashMap<Uuid, ConnectedClient>,
    /// Elements changed since the last successful flush.
    pub dirty: bool,
    /// Bumped on every element mutation.
    pub revision: u64,
}

impl RoomState {
    #[must_use]
    pub fn new(name: impl Into<String>, owner_id: Option<String>) -> Self {
        Self {
            name: name.into(),
            owner_id,
            elements: ElementStore::new(),
            unreadable: Vec::new(),
            allow_list: HashSet::new(),
            participants: HashSet::new(),
            clients: HashMap::new(),
            dirty: false,
            revision: 0,
        }
    }

    /// Hydrate live state from a persisted record.
    #[must_use]
    pub fn from_record(record: RoomRecord) -> Self {
        Self {
            name: record.name,
            owner_id: record.owner_id,
            elements: ElementStore::from_elements(record.elements),
            unreadable: record.unreadable,
            allow_list: record.allow_list.into_iter().collect(),
            participants: record.participants.into_iter().collect(),
            clients: HashMap::new(),
            dirty: false,
            revision: 0,
        }
    }

    /// Record an element mutation for the flush task.
    pub fn touch(&mut self) {
        self.dirty = true;
        self.revision += 1;
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub directory: Arc<dyn RoomDirectory>,
    pub identity: Arc<dyn IdentityResolver>,
    pub rooms: Arc<RwLock<HashMap<String, RoomState>>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config, directory: Arc<dyn RoomDirectory>, identity: Arc<dyn IdentityResolver>) -> Self {
        Self { config: Arc::new(config), directory, identity, rooms: Arc::new(RwLock::new(HashMap::new())) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
