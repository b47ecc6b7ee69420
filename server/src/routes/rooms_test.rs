use super::*;
use crate::config::Config;
use crate::state::test_helpers::{self, OWNER};
use axum::http::HeaderValue;
use frames::Role;

#[tokio::test]
async fn probe_reports_persisted_room() {
    let (state, directory) = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&directory, Vec::new()).await;

    let Json(status) = room_exists(State(state), Path(room_id.clone())).await.unwrap();
    assert_eq!(status, RoomStatusResponse { room_id, live: false, clients: 0 });
}

#[tokio::test]
async fn probe_reports_live_room() {
    let (state, directory) = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&directory, Vec::new()).await;
    let (_conn, _rx) = test_helpers::join_client(&state, &room_id, OWNER, Role::Owner).await;

    let Json(status) = room_exists(State(state), Path(room_id)).await.unwrap();
    assert!(status.live);
    assert_eq!(status.clients, 1);
}

#[tokio::test]
async fn probe_of_missing_room_is_404() {
    let (state, _directory) = test_helpers::test_app_state();
    let err = room_exists(State(state), Path("gone".into())).await.unwrap_err();
    assert_eq!(err, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deletion_notice_closes_live_room() {
    let (state, directory) = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&directory, Vec::new()).await;
    let (_conn, mut rx) = test_helpers::join_client(&state, &room_id, OWNER, Role::Owner).await;
    test_helpers::drain(&mut rx);

    let Json(body) = room_deleted(State(state.clone()), Path(room_id.clone()), HeaderMap::new()).await.unwrap();

    assert_eq!(body.notified, 1);
    assert_eq!(test_helpers::recv_frame(&mut rx).await.syscall, "room:deleted");
    assert!(state.rooms.read().await.is_empty());
}

#[tokio::test]
async fn deletion_notice_requires_token_when_configured() {
    let config = Config { internal_token: Some("s3cret".into()), ..Config::default() };
    let (state, directory) = test_helpers::test_app_state_with(config);
    let room_id = test_helpers::seed_room(&directory, Vec::new()).await;

    let err = room_deleted(State(state.clone()), Path(room_id.clone()), HeaderMap::new()).await.unwrap_err();
    assert_eq!(err, StatusCode::UNAUTHORIZED);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
    let Json(body) = room_deleted(State(state), Path(room_id), headers).await.unwrap();
    assert_eq!(body.notified, 0);
}
