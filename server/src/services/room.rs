//! Room service: join/part, hydration, roster, and fan-out.
//!
//! DESIGN
//! ======
//! A room is hydrated from the directory on first join and kept in memory
//! while any client is connected. The in-memory `RoomState` is the
//! authority: element operations mutate it and the persistence task writes
//! it back.
//!
//! ERROR HANDLING
//! ==============
//! On last-client part, a dirty room is flushed before eviction. If that
//! flush fails, the room stays in memory with its dirty flag intact so the
//! persistence task can retry instead of losing edits.

use frames::{ErrorCode, Event, Frame, PresenceEntry, Role};
use frames::event::RoomSnapshot;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::services::directory::DirectoryError;
use crate::services::persistence;
use crate::state::{AppState, ConnectedClient, RoomState};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room not found: {0}")]
    NotFound(String),
    #[error("join a room first")]
    NotJoined,
    #[error("room_id required")]
    MissingRoomId,
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("{0} cannot be sent by clients")]
    Unsupported(&'static str),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl ErrorCode for RoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_ROOM_NOT_FOUND",
            Self::NotJoined => "E_NOT_JOINED",
            Self::MissingRoomId => "E_MALFORMED",
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::Unsupported(_) => "E_UNSUPPORTED",
            Self::Directory(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Directory(e) => e.retryable(),
            _ => false,
        }
    }
}

// =============================================================================
// RIGHTS
// =============================================================================

/// The room's recorded owner, or any owner-role user when none is recorded.
#[must_use]
pub fn is_owner(room: &RoomState, user_id: &str, role: Role) -> bool {
    match &room.owner_id {
        Some(owner_id) => owner_id == user_id,
        None => role == Role::Owner,
    }
}

#[must_use]
pub fn can_edit(room: &RoomState, user_id: &str, role: Role) -> bool {
    is_owner(room, user_id, role) || room.allow_list.contains(user_id)
}

// =============================================================================
// JOIN / PART
// =============================================================================

/// Join a room. Hydrates from the directory if it is not live, then
/// rebroadcasts the roster to everyone including the joiner.
/// Returns the snapshot for the joining client.
///
/// # Errors
///
/// [`RoomError::NotFound`] when the directory has no such room, or a
/// directory error if hydration fails.
pub async fn join_room(
    state: &AppState,
    room_id: &str,
    presence: PresenceEntry,
    tx: mpsc::Sender<Frame>,
) -> Result<RoomSnapshot, RoomError> {
    let user_id = presence.user_id.clone();
    let role = presence.role;
    let connection_id = presence.connection_id;
    let mut hydration = None;

    let (snapshot, first_visit) = loop {
        // Load outside the lock; used only if the room is still not live.
        let is_live = state.rooms.read().await.contains_key(room_id);
        if !is_live && hydration.is_none() {
            let record = state
                .directory
                .load_room(room_id)
                .await?
                .ok_or_else(|| RoomError::NotFound(room_id.to_owned()))?;
            hydration = Some(record);
        }

        let mut rooms = state.rooms.write().await;
        if !rooms.contains_key(room_id) {
            // EDGE: evicted between the probe and the lock; load again.
            let Some(record) = hydration.take() else {
                continue;
            };
            info!(%room_id, count = record.elements.len(), unreadable = record.unreadable.len(), "hydrated room from directory");
            rooms.insert(room_id.to_owned(), RoomState::from_record(record));
        }
        let Some(room) = rooms.get_mut(room_id) else {
            continue;
        };

        room.clients.insert(connection_id, ConnectedClient { tx: tx.clone(), presence: presence.clone() });
        let first_visit = room.participants.insert(user_id.clone());
        info!(%room_id, conn_id = %connection_id, %user_id, clients = room.clients.len(), "client joined room");
        break (snapshot(room), first_visit);
    };

    if first_visit {
        if let Err(e) = state.directory.add_participant(room_id, &user_id, role.as_str()).await {
            warn!(%room_id, %user_id, error = %e, "failed to record participant");
        }
    }

    broadcast_roster(state, room_id).await;
    Ok(snapshot)
}

/// Leave a room and rebroadcast the roster. If last client, flush the
/// room's elements and evict it from memory.
pub async fn part_room(state: &AppState, room_id: &str, connection_id: Uuid) {
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(room_id) else {
        return;
    };

    room.clients.remove(&connection_id);
    info!(%room_id, conn_id = %connection_id, remaining = room.clients.len(), "client left room");

    if !room.clients.is_empty() {
        drop(rooms);
        broadcast_roster(state, room_id).await;
        return;
    }

    // PHASE: CLEAN EVICTION FAST PATH
    if !room.dirty {
        rooms.remove(room_id);
        info!(%room_id, "evicted room from memory");
        return;
    }

    // PHASE: FINAL FLUSH OUTSIDE THE LOCK
    let pending = persistence::DirtySnapshot::capture(room_id, room);
    drop(rooms);
    let result = pending.write(state).await;

    // PHASE: ACK OR RETAIN
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(room_id) else {
        return;
    };
    if !room.clients.is_empty() {
        return;
    }
    match result {
        Ok(()) => {
            pending.ack(room);
            if room.dirty {
                warn!(%room_id, revision = room.revision, "retaining room after final flush because newer edits exist");
            } else {
                rooms.remove(room_id);
                info!(%room_id, "evicted room from memory");
            }
        }
        Err(e) => {
            error!(%room_id, error = %e, "final flush failed; room retained for retry");
        }
    }
}

/// Drop a live room whose backing record was deleted and tell its clients.
/// Returns the number of connections notified.
pub async fn close_room(state: &AppState, room_id: &str) -> usize {
    let Some(room) = state.rooms.write().await.remove(room_id) else {
        return 0;
    };
    let frame = Event::RoomDeleted {}.to_frame().with_room_id(room_id);
    for client in room.clients.values() {
        if client.tx.try_send(frame.clone()).is_err() {
            warn!(%room_id, conn_id = %client.presence.connection_id, "room:deleted not delivered");
        }
    }
    info!(%room_id, clients = room.clients.len(), "closed deleted room");
    room.clients.len()
}

// =============================================================================
// QUERIES
// =============================================================================

#[must_use]
pub fn snapshot(room: &RoomState) -> RoomSnapshot {
    let mut allow_list: Vec<String> = room.allow_list.iter().cloned().collect();
    allow_list.sort();
    RoomSnapshot {
        elements: room.elements.to_vec(),
        allow_list,
        name: room.name.clone(),
        owner_id: room.owner_id.clone(),
    }
}

/// Live presence list, ordered by username then connection.
pub async fn roster(state: &AppState, room_id: &str) -> Vec<PresenceEntry> {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(room_id) else {
        return Vec::new();
    };
    let mut users: Vec<PresenceEntry> = room.clients.values().map(|c| c.presence.clone()).collect();
    users.sort_by(|a, b| a.username.cmp(&b.username).then(a.connection_id.cmp(&b.connection_id)));
    users
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Send the current roster to every client in the room.
pub async fn broadcast_roster(state: &AppState, room_id: &str) {
    let users = roster(state, room_id).await;
    let frame = Event::Roster { users }.to_frame().with_room_id(room_id);
    broadcast(state, room_id, &frame, None).await;
}

/// Broadcast a frame to all clients in a room, optionally excluding one.
pub async fn broadcast(state: &AppState, room_id: &str, frame: &Frame, exclude: Option<Uuid>) {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(room_id) else {
        return;
    };

    for (connection_id, client) in &room.clients {
        if exclude == Some(*connection_id) {
            continue;
        }
        // Best-effort: a client whose queue is full misses this frame.
        if client.tx.try_send(frame.clone()).is_err() {
            warn!(%room_id, conn_id = %connection_id, syscall = %frame.syscall, "dropped frame for slow client");
        }
    }
}

/// Send a frame to every connection of one user. Returns how many got it.
pub async fn send_to_user(state: &AppState, room_id: &str, user_id: &str, frame: &Frame) -> usize {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(room_id) else {
        return 0;
    };
    room.clients
        .values()
        .filter(|client| client.presence.user_id == user_id)
        .filter(|client| client.tx.try_send(frame.clone()).is_ok())
        .count()
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
