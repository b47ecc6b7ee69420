//! Permission service: allow-list grants and revocations.
//!
//! The allow-list is written through to the directory first; the live room
//! is updated only after the write succeeds. The affected participant's
//! connections then receive a targeted `permission:changed`.

use frames::Event;
use tracing::info;

use crate::services::room::{self, RoomError};
use crate::state::AppState;

/// Grant or revoke edit rights for `user_id`. Returns how many of the
/// user's connections were notified.
///
/// # Errors
///
/// Returns `NotFound` if the room isn't live, or the directory error if
/// the allow-list could not be persisted.
pub async fn set_permission(state: &AppState, room_id: &str, user_id: &str, allowed: bool) -> Result<usize, RoomError> {
    if !state.rooms.read().await.contains_key(room_id) {
        return Err(RoomError::NotFound(room_id.to_owned()));
    }

    state.directory.set_allowed(room_id, user_id, allowed).await?;

    {
        let mut rooms = state.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return Err(RoomError::NotFound(room_id.to_owned()));
        };
        if allowed {
            room.allow_list.insert(user_id.to_owned());
        } else {
            room.allow_list.remove(user_id);
        }
    }

    let frame = Event::PermissionChanged { allowed }.to_frame().with_room_id(room_id);
    let delivered = room::send_to_user(state, room_id, user_id, &frame).await;
    info!(%room_id, %user_id, allowed, delivered, "edit permission changed");
    Ok(delivered)
}

#[cfg(test)]
#[path = "permission_test.rs"]
mod tests;
