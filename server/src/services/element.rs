//! Element service: authoritative mutations on a live room.
//!
//! DESIGN
//! ======
//! Every mutation updates the room's `ElementStore` immediately and marks
//! the room dirty for the persistence task. Ordering is arrival order under
//! the room lock: the last write for an id wins. Fan-out is left to the
//! websocket dispatcher.

use frames::{Element, ElementPatch};
use uuid::Uuid;

use crate::services::room::RoomError;
use crate::state::{AppState, RoomState};

async fn mutate<T>(state: &AppState, room_id: &str, f: impl FnOnce(&mut RoomState) -> T) -> Result<T, RoomError> {
    let mut rooms = state.rooms.write().await;
    let room = rooms.get_mut(room_id).ok_or_else(|| RoomError::NotFound(room_id.to_owned()))?;
    Ok(f(room))
}

// =============================================================================
// SINGLE ELEMENT
// =============================================================================

/// Insert or replace by id. Returns `true` when the element was new.
///
/// # Errors
///
/// Returns `NotFound` if the room isn't live.
pub async fn upsert_element(state: &AppState, room_id: &str, element: Element) -> Result<bool, RoomError> {
    mutate(state, room_id, |room| {
        let inserted = room.elements.upsert(element);
        room.touch();
        inserted
    })
    .await
}

/// Merge a patch. Unknown ids are ignored and return `false`.
///
/// # Errors
///
/// Returns `NotFound` if the room isn't live.
pub async fn patch_element(state: &AppState, room_id: &str, id: Uuid, patch: &ElementPatch) -> Result<bool, RoomError> {
    mutate(state, room_id, |room| {
        let applied = room.elements.patch(&id, patch);
        if applied {
            room.touch();
        }
        applied
    })
    .await
}

/// Remove by id. Returns `false` when the id was already gone.
///
/// # Errors
///
/// Returns `NotFound` if the room isn't live.
pub async fn delete_element(state: &AppState, room_id: &str, id: Uuid) -> Result<bool, RoomError> {
    mutate(state, room_id, |room| {
        let removed = room.elements.remove(&id).is_some();
        if removed {
            room.touch();
        }
        removed
    })
    .await
}

// =============================================================================
// WHOLE ROOM
// =============================================================================

/// Replace the full collection (history resync).
///
/// # Errors
///
/// Returns `NotFound` if the room isn't live.
pub async fn replace_elements(state: &AppState, room_id: &str, elements: Vec<Element>) -> Result<(), RoomError> {
    mutate(state, room_id, |room| {
        room.elements.replace_all(elements);
        room.touch();
    })
    .await
}

/// Remove every element, including persisted entries that never decoded.
///
/// # Errors
///
/// Returns `NotFound` if the room isn't live.
pub async fn clear_elements(state: &AppState, room_id: &str) -> Result<(), RoomError> {
    mutate(state, room_id, |room| {
        room.elements.clear();
        room.unreadable.clear();
        room.touch();
    })
    .await
}

#[cfg(test)]
#[path = "element_test.rs"]
mod tests;
