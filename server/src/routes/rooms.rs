//! Room existence probe and deletion notification routes.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::Json;
use serde::Serialize;
use tracing::{error, info};

use crate::services::room;
use crate::state::AppState;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomStatusResponse {
    pub room_id: String,
    /// Whether the room is currently held in memory.
    pub live: bool,
    pub clients: usize,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RoomDeletedResponse {
    pub notified: usize,
}

/// `GET /api/rooms/{id}`: 200 when the room exists, 404 otherwise.
pub async fn room_exists(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomStatusResponse>, StatusCode> {
    let clients = state.rooms.read().await.get(&room_id).map(|live| live.clients.len());
    if let Some(clients) = clients {
        return Ok(Json(RoomStatusResponse { room_id, live: true, clients }));
    }

    match state.directory.exists(&room_id).await {
        Ok(true) => Ok(Json(RoomStatusResponse { room_id, live: false, clients: 0 })),
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!(%room_id, error = %e, "room existence probe failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// `POST /internal/rooms/{id}/deleted`: drop the live room and broadcast
/// `room:deleted` to its clients.
pub async fn room_deleted(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<RoomDeletedResponse>, StatusCode> {
    if let Some(expected) = &state.config.internal_token {
        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented != Some(expected.as_str()) {
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    let notified = room::close_room(&state, &room_id).await;
    info!(%room_id, notified, "room deletion notification handled");
    Ok(Json(RoomDeletedResponse { notified }))
}

#[cfg(test)]
#[path = "rooms_test.rs"]
mod tests;
