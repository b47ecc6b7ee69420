//! Persistence service: background flush for dirty rooms.
//!
//! DESIGN
//! ======
//! A background task flushes every dirty room, then sleeps
//! `FLUSH_INTERVAL_MS` before the next cycle. Each flush captures the
//! room's element array and revision under the lock and writes it without
//! holding the lock, so websocket handling never waits on storage I/O.
//!
//! ERROR HANDLING
//! ==============
//! The dirty flag is cleared only when the revision that was written is
//! still the room's current revision. A failed write, or an edit that lands
//! while the write is in flight, leaves the room dirty for the next cycle.
//! Repeated writes are acceptable; silent data loss is not.

use std::time::Duration;

use frames::Element;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::services::directory::DirectoryError;
use crate::state::{AppState, RoomState};

/// Element array captured from a dirty room at one revision.
#[derive(Debug)]
pub(crate) struct DirtySnapshot {
    pub(crate) room_id: String,
    pub(crate) revision: u64,
    pub(crate) elements: Vec<Element>,
    pub(crate) unreadable: Vec<Value>,
}

impl DirtySnapshot {
    pub(crate) fn capture(room_id: &str, room: &RoomState) -> Self {
        Self {
            room_id: room_id.to_owned(),
            revision: room.revision,
            elements: room.elements.to_vec(),
            unreadable: room.unreadable.clone(),
        }
    }

    pub(crate) async fn write(&self, state: &AppState) -> Result<(), DirectoryError> {
        state.directory.save_elements(&self.room_id, &self.elements, &self.unreadable).await
    }

    /// Clear the dirty flag if nothing changed since the capture.
    pub(crate) fn ack(&self, room: &mut RoomState) -> bool {
        if room.revision == self.revision {
            room.dirty = false;
        }
        !room.dirty
    }
}

/// Spawn the background persistence task. Returns a handle for shutdown.
pub fn spawn_persistence_task(state: AppState) -> JoinHandle<()> {
    let flush_interval_ms = state.config.flush_interval_ms;
    info!(flush_interval_ms, "room persistence flush configured");
    tokio::spawn(async move {
        loop {
            flush_all_dirty(&state).await;
            tokio::time::sleep(Duration::from_millis(flush_interval_ms)).await;
        }
    })
}

/// Write every dirty room once.
pub(crate) async fn flush_all_dirty(state: &AppState) {
    // PHASE: SNAPSHOT DIRTY ROOMS
    let pending = {
        let rooms = state.rooms.read().await;
        rooms
            .iter()
            .filter(|(_, room)| room.dirty)
            .map(|(room_id, room)| DirtySnapshot::capture(room_id, room))
            .collect::<Vec<_>>()
    };

    // PHASE: WRITE + ACK PER ROOM
    for snapshot in pending {
        match snapshot.write(state).await {
            Ok(()) => {
                let mut rooms = state.rooms.write().await;
                if let Some(room) = rooms.get_mut(&snapshot.room_id) {
                    let clean = snapshot.ack(room);
                    debug!(room_id = %snapshot.room_id, revision = snapshot.revision, clean, "flushed room");
                }
            }
            Err(e) => {
                error!(
                    error = %e,
                    room_id = %snapshot.room_id,
                    count = snapshot.elements.len(),
                    "persistence flush failed"
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
