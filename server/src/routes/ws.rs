//! WebSocket handler: the room authority's only realtime entry point.
//!
//! DESIGN
//! ======
//! On upgrade, resolves the `token` query parameter into an identity,
//! generates a connection id, and enters a `select!` loop:
//! - Incoming client frames → decode + dispatch by typed event
//! - Frames fanned out by room peers → forward to client
//!
//! Handler functions validate, mutate room state, and return an `Outcome`.
//! The dispatch layer owns all outbound concerns: reply to sender and
//! fan-out to peers. Rejections go to the sender only.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with the connection id
//! 2. `room:join` → snapshot reply, roster broadcast
//! 3. Canvas events → gate → mutate → fan out
//! 4. Close → part room (roster broadcast, flush + evict when empty)
//!
//! ENCODING
//! ========
//! Binary messages carry protobuf frames; text messages carry JSON frames.
//! Each connection answers in the encoding it last received.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use frames::{ErrorCode, Event, FRAME_CODE, FRAME_MESSAGE, Frame, PresenceEntry, Status};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services::identity::{Identity, IdentityError};
use crate::services::room::{self, RoomError};
use crate::services::{element, permission};
use crate::state::AppState;

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what; handlers never send frames directly.
#[derive(Debug)]
enum Outcome {
    /// Relay to every room client EXCEPT the sender.
    BroadcastExcludeSender(Event),
    /// Relay to every room client INCLUDING the sender.
    Broadcast(Event),
    /// Send done+data to sender only.
    Reply(Value),
    /// Nothing further to send; the service already delivered.
    Done,
}

// =============================================================================
// CONNECTION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Protobuf,
    Json,
}

/// Per-socket session state.
struct Connection {
    id: Uuid,
    identity: Identity,
    room: Option<String>,
    tx: mpsc::Sender<Frame>,
    encoding: Encoding,
}

impl Connection {
    fn new(identity: Identity, tx: mpsc::Sender<Frame>) -> Self {
        Self { id: Uuid::new_v4(), identity, room: None, tx, encoding: Encoding::Protobuf }
    }

    fn presence(&self) -> PresenceEntry {
        PresenceEntry {
            user_id: self.identity.user_id.clone(),
            username: self.identity.username.clone(),
            role: self.identity.role,
            connection_id: self.id,
        }
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let token = params.get("token").map(String::as_str).unwrap_or_default();

    let identity = match state.identity.resolve(token).await {
        Ok(identity) => identity,
        Err(e @ (IdentityError::Missing | IdentityError::Invalid)) => {
            return (StatusCode::UNAUTHORIZED, e.to_string()).into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "ws identity resolution failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "identity resolution error").into_response();
        }
    };

    ws.on_upgrade(move |socket| run_ws(socket, state, identity))
}

async fn run_ws(mut socket: WebSocket, state: AppState, identity: Identity) {
    // Per-connection channel for frames fanned out by room peers.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.config.client_channel_capacity);
    let mut conn = Connection::new(identity, client_tx);

    let welcome = Event::Connected {
        connection_id: conn.id,
        user_id: conn.identity.user_id.clone(),
        role: conn.identity.role,
    }
    .to_frame();
    if send_frame(&mut socket, conn.encoding, &welcome).await.is_err() {
        return;
    }

    info!(conn_id = %conn.id, user_id = %conn.identity.user_id, role = conn.identity.role.as_str(), "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                let inbound = match msg {
                    Message::Binary(bytes) => decode_inbound(&mut conn, Inbound::Binary(&bytes)),
                    Message::Text(text) => decode_inbound(&mut conn, Inbound::Text(text.as_str())),
                    Message::Close(_) => break,
                    _ => continue,
                };
                let replies = match inbound {
                    Ok(req) => process_inbound(&state, &mut conn, req).await,
                    Err(err_frame) => vec![err_frame],
                };
                if !send_all(&mut socket, conn.encoding, &replies).await {
                    break;
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, conn.encoding, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Some(room_id) = conn.room.take() {
        room::part_room(&state, &room_id, conn.id).await;
    }
    info!(conn_id = %conn.id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

enum Inbound<'a> {
    Binary(&'a [u8]),
    Text(&'a str),
}

/// Decode one socket message. Undecodable input yields an error frame.
fn decode_inbound(conn: &mut Connection, inbound: Inbound<'_>) -> Result<Frame, Frame> {
    let decoded = match inbound {
        Inbound::Binary(bytes) => {
            conn.encoding = Encoding::Protobuf;
            frames::decode_frame(bytes)
        }
        Inbound::Text(text) => {
            conn.encoding = Encoding::Json;
            frames::decode_json_frame(text)
        }
    };
    decoded.map_err(|e| {
        warn!(conn_id = %conn.id, error = %e, "ws: invalid inbound frame");
        Frame::request("gateway:error", Value::Object(Map::new()))
            .error(format!("invalid frame: {e}"))
            .with_data(FRAME_CODE, "E_MALFORMED")
    })
}

/// Process one inbound frame and return frames for the sender.
///
/// This keeps the websocket transport separate from frame handling, so
/// tests can drive dispatch with fake client channels.
async fn process_inbound(state: &AppState, conn: &mut Connection, mut req: Frame) -> Vec<Frame> {
    // Stamp the authenticated user as `from`.
    req.from = Some(conn.identity.user_id.clone());

    let event = match Event::from_frame(&req) {
        Ok(event) => event,
        Err(e) => {
            warn!(conn_id = %conn.id, syscall = %req.syscall, error = %e, "ws: rejected frame");
            return vec![req.error_from(&e)];
        }
    };

    if is_high_frequency(&req.syscall) {
        debug!(conn_id = %conn.id, id = %req.id, syscall = %req.syscall, "ws: recv frame");
    } else {
        info!(conn_id = %conn.id, id = %req.id, syscall = %req.syscall, "ws: recv frame");
    }

    let result = match event {
        Event::Join { .. } => handle_join(state, conn, &req).await,
        other => handle_room_event(state, conn, other).await,
    };

    // Apply outcome; the dispatch layer owns all outbound logic.
    match result {
        Ok(Outcome::BroadcastExcludeSender(event)) => {
            if let Some(room_id) = &conn.room {
                let frame = relay_frame(&event, room_id, &conn.identity.user_id);
                room::broadcast(state, room_id, &frame, Some(conn.id)).await;
            }
            vec![]
        }
        Ok(Outcome::Broadcast(event)) => {
            if let Some(room_id) = &conn.room {
                let frame = relay_frame(&event, room_id, &conn.identity.user_id);
                room::broadcast(state, room_id, &frame, None).await;
            }
            vec![]
        }
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Ok(Outcome::Done) => vec![],
        Err(e) => {
            warn!(
                conn_id = %conn.id,
                user_id = %conn.identity.user_id,
                syscall = %req.syscall,
                code = e.error_code(),
                error = %e,
                "ws: request rejected"
            );
            vec![req.error_from(&e)]
        }
    }
}

fn relay_frame(event: &Event, room_id: &str, from: &str) -> Frame {
    event.to_frame().with_room_id(room_id).with_from(from)
}

// =============================================================================
// ROOM HANDLERS
// =============================================================================

async fn handle_join(state: &AppState, conn: &mut Connection, req: &Frame) -> Result<Outcome, RoomError> {
    let Some(room_id) = req.room_id.clone().filter(|id| !id.is_empty()) else {
        return Err(RoomError::MissingRoomId);
    };

    // Part the current room first; a re-join of the same room re-registers.
    if let Some(old_room) = conn.room.take() {
        room::part_room(state, &old_room, conn.id).await;
    }

    let snapshot = room::join_room(state, &room_id, conn.presence(), conn.tx.clone()).await?;
    conn.room = Some(room_id);
    Ok(Outcome::Reply(Event::Snapshot(snapshot).payload()))
}

async fn handle_room_event(state: &AppState, conn: &Connection, event: Event) -> Result<Outcome, RoomError> {
    if matches!(
        event,
        Event::Snapshot(_)
            | Event::Roster { .. }
            | Event::RoomDeleted {}
            | Event::Connected { .. }
            | Event::PermissionChanged { .. }
    ) {
        return Err(RoomError::Unsupported(event.syscall()));
    }
    let Some(room_id) = conn.room.as_deref() else {
        return Err(RoomError::NotJoined);
    };
    authorize(state, room_id, &conn.identity, &event).await?;

    let user_id = conn.identity.user_id.clone();
    match event {
        Event::DrawElement { element } => {
            element::upsert_element(state, room_id, element.clone()).await?;
            Ok(Outcome::BroadcastExcludeSender(Event::DrawElement { element }))
        }
        Event::DrawingStroke { stroke, .. } => Ok(Outcome::BroadcastExcludeSender(Event::DrawingStroke { user_id, stroke })),
        Event::DeleteElement { id } => {
            element::delete_element(state, room_id, id).await?;
            Ok(Outcome::BroadcastExcludeSender(Event::DeleteElement { id }))
        }
        Event::UpdateElement { id, patch } => {
            element::patch_element(state, room_id, id, &patch).await?;
            Ok(Outcome::BroadcastExcludeSender(Event::UpdateElement { id, patch }))
        }
        Event::SyncState { elements } => {
            element::replace_elements(state, room_id, elements.clone()).await?;
            Ok(Outcome::BroadcastExcludeSender(Event::SyncState { elements }))
        }
        Event::ClearCanvas {} => {
            element::clear_elements(state, room_id).await?;
            Ok(Outcome::Broadcast(Event::ClearCanvas {}))
        }
        Event::CursorMove { x, y, color, label, .. } => {
            Ok(Outcome::BroadcastExcludeSender(Event::CursorMove { user_id, x, y, color, label }))
        }
        event @ (Event::ViewportChange { .. } | Event::ThemeChanged { .. }) => Ok(Outcome::BroadcastExcludeSender(event)),
        Event::GrantPermission { user_id: target } => {
            permission::set_permission(state, room_id, &target, true).await?;
            Ok(Outcome::Done)
        }
        Event::RevokePermission { user_id: target } => {
            permission::set_permission(state, room_id, &target, false).await?;
            Ok(Outcome::Done)
        }
        other => Err(RoomError::Unsupported(other.syscall())),
    }
}

/// Owner-only events require ownership; canvas mutations require edit
/// rights when the server enforces them.
async fn authorize(state: &AppState, room_id: &str, identity: &Identity, event: &Event) -> Result<(), RoomError> {
    let rooms = state.rooms.read().await;
    let Some(live) = rooms.get(room_id) else {
        return Err(RoomError::NotFound(room_id.to_owned()));
    };
    if event.is_owner_only() && !room::is_owner(live, &identity.user_id, identity.role) {
        return Err(RoomError::Forbidden("only the room owner may do that"));
    }
    if event.is_mutating()
        && state.config.enforce_edit_rights
        && !room::can_edit(live, &identity.user_id, identity.role)
    {
        return Err(RoomError::Forbidden("editing is not permitted"));
    }
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

/// Frames sent many times per second while a user draws or moves; these log
/// at debug so info stays readable.
fn is_high_frequency(syscall: &str) -> bool {
    syscall.starts_with("cursor:") || matches!(syscall, "element:stroke" | "element:draw")
}

async fn send_all(socket: &mut WebSocket, encoding: Encoding, frames: &[Frame]) -> bool {
    for frame in frames {
        if send_frame(socket, encoding, frame).await.is_err() {
            return false;
        }
    }
    true
}

async fn send_frame(socket: &mut WebSocket, encoding: Encoding, frame: &Frame) -> Result<(), ()> {
    if frame.status == Status::Error {
        let code = frame.data_str(FRAME_CODE).unwrap_or("-");
        let message = frame.data_str(FRAME_MESSAGE).unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
    } else if is_high_frequency(&frame.syscall) {
        debug!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    } else {
        info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    }
    let message = match encoding {
        Encoding::Protobuf => Message::Binary(frames::encode_frame(frame).into()),
        Encoding::Json => Message::Text(frames::encode_json_frame(frame).into()),
    };
    socket.send(message).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
