use super::*;
use crate::state::test_helpers::{self, OWNER};
use frames::Role;

async fn live_room() -> (AppState, String) {
    let (state, directory) = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&directory, Vec::new()).await;
    let (_conn, _rx) = test_helpers::join_client(&state, &room_id, OWNER, Role::Owner).await;
    (state, room_id)
}

async fn revision(state: &AppState, room_id: &str) -> u64 {
    state.rooms.read().await.get(room_id).map_or(0, |room| room.revision)
}

#[tokio::test]
async fn upsert_inserts_then_replaces_by_id() {
    let (state, room_id) = live_room().await;
    let mut element = test_helpers::rect(1);

    assert!(upsert_element(&state, &room_id, element.clone()).await.unwrap());
    element.timestamp = 9;
    assert!(!upsert_element(&state, &room_id, element.clone()).await.unwrap());

    let rooms = state.rooms.read().await;
    let room = rooms.get(&room_id).unwrap();
    assert_eq!(room.elements.len(), 1);
    assert_eq!(room.elements.get(&element.id).unwrap().timestamp, 9);
    assert!(room.dirty);
    assert_eq!(room.revision, 2);
}

#[tokio::test]
async fn patch_merges_fields_and_ignores_unknown_ids() {
    let (state, room_id) = live_room().await;
    let element = test_helpers::rect(1);
    upsert_element(&state, &room_id, element.clone()).await.unwrap();

    let patch = ElementPatch { x: Some(99.0), color: Some("#00ff00".into()), ..ElementPatch::default() };
    assert!(patch_element(&state, &room_id, element.id, &patch).await.unwrap());
    let before = revision(&state, &room_id).await;
    assert!(!patch_element(&state, &room_id, Uuid::new_v4(), &patch).await.unwrap());
    assert_eq!(revision(&state, &room_id).await, before);

    let rooms = state.rooms.read().await;
    let shape = rooms.get(&room_id).unwrap().elements.get(&element.id).unwrap().body.as_shape().unwrap().clone();
    assert!((shape.x - 99.0).abs() < f64::EPSILON);
    assert_eq!(shape.color, "#00ff00");
    assert!((shape.width - 50.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let (state, room_id) = live_room().await;
    let element = test_helpers::pen(1);
    upsert_element(&state, &room_id, element.clone()).await.unwrap();

    assert!(delete_element(&state, &room_id, element.id).await.unwrap());
    assert!(!delete_element(&state, &room_id, element.id).await.unwrap());
    assert!(state.rooms.read().await.get(&room_id).unwrap().elements.is_empty());
}

#[tokio::test]
async fn replace_dedupes_and_keeps_order() {
    let (state, room_id) = live_room().await;
    upsert_element(&state, &room_id, test_helpers::pen(1)).await.unwrap();

    let a = test_helpers::rect(5);
    let b = test_helpers::rect(4);
    let mut a_later = a.clone();
    a_later.timestamp = 7;
    replace_elements(&state, &room_id, vec![a.clone(), b.clone(), a_later.clone()]).await.unwrap();

    let rooms = state.rooms.read().await;
    assert_eq!(rooms.get(&room_id).unwrap().elements.to_vec(), vec![a_later, b]);
}

#[tokio::test]
async fn clear_empties_and_marks_dirty() {
    let (state, room_id) = live_room().await;
    for t in 0..12 {
        upsert_element(&state, &room_id, test_helpers::rect(t)).await.unwrap();
    }
    clear_elements(&state, &room_id).await.unwrap();

    let rooms = state.rooms.read().await;
    let room = rooms.get(&room_id).unwrap();
    assert!(room.elements.is_empty());
    assert!(room.dirty);
    assert_eq!(room.revision, 13);
}

#[tokio::test]
async fn replace_keeps_undecoded_entries_and_clear_drops_them() {
    let (state, room_id) = live_room().await;
    state.rooms.write().await.get_mut(&room_id).unwrap().unreadable = vec![serde_json::json!({"type": "arrow"})];

    replace_elements(&state, &room_id, vec![test_helpers::rect(1)]).await.unwrap();
    assert_eq!(state.rooms.read().await.get(&room_id).unwrap().unreadable.len(), 1);

    clear_elements(&state, &room_id).await.unwrap();
    assert!(state.rooms.read().await.get(&room_id).unwrap().unreadable.is_empty());
}

#[tokio::test]
async fn mutations_on_rooms_that_are_not_live_fail() {
    let (state, _directory) = test_helpers::test_app_state();
    let err = upsert_element(&state, "cold", test_helpers::rect(1)).await.unwrap_err();
    assert!(matches!(err, RoomError::NotFound(_)));
}
