use super::*;
use crate::services::directory::RoomDirectory;
use crate::services::element;
use crate::state::test_helpers::{self, OWNER};
use frames::Role;

#[tokio::test]
async fn flush_writes_dirty_rooms_and_clears_flag() {
    let (state, directory) = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&directory, Vec::new()).await;
    let (_conn, _rx) = test_helpers::join_client(&state, &room_id, OWNER, Role::Owner).await;

    let drawn = test_helpers::pen(1);
    element::upsert_element(&state, &room_id, drawn.clone()).await.unwrap();
    flush_all_dirty(&state).await;

    assert_eq!(directory.get(&room_id).await.unwrap().elements, vec![drawn]);
    assert!(!state.rooms.read().await.get(&room_id).unwrap().dirty);
}

#[tokio::test]
async fn flush_skips_clean_rooms() {
    let (state, directory) = test_helpers::test_app_state();
    let original = vec![test_helpers::rect(1)];
    let room_id = test_helpers::seed_room(&directory, original.clone()).await;
    let (_conn, _rx) = test_helpers::join_client(&state, &room_id, OWNER, Role::Owner).await;

    // Change the directory behind the room's back; a clean room must not overwrite it.
    directory.save_elements(&room_id, &[], &[]).await.unwrap();
    flush_all_dirty(&state).await;

    assert!(directory.get(&room_id).await.unwrap().elements.is_empty());
}

#[tokio::test]
async fn ack_keeps_dirty_when_revision_moved_on() {
    let (state, directory) = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&directory, Vec::new()).await;
    let (_conn, _rx) = test_helpers::join_client(&state, &room_id, OWNER, Role::Owner).await;
    element::upsert_element(&state, &room_id, test_helpers::rect(1)).await.unwrap();

    let captured = {
        let rooms = state.rooms.read().await;
        DirtySnapshot::capture(&room_id, rooms.get(&room_id).unwrap())
    };
    captured.write(&state).await.unwrap();

    // An edit lands while the write is in flight.
    element::upsert_element(&state, &room_id, test_helpers::rect(2)).await.unwrap();

    let mut rooms = state.rooms.write().await;
    let room = rooms.get_mut(&room_id).unwrap();
    assert!(!captured.ack(room));
    assert!(room.dirty);
    drop(rooms);

    flush_all_dirty(&state).await;
    assert_eq!(directory.get(&room_id).await.unwrap().elements.len(), 2);
    assert!(!state.rooms.read().await.get(&room_id).unwrap().dirty);
}

#[tokio::test]
async fn persistence_task_flushes_on_interval() {
    let config = crate::config::Config { flush_interval_ms: 10, ..crate::config::Config::default() };
    let (state, directory) = test_helpers::test_app_state_with(config);
    let room_id = test_helpers::seed_room(&directory, Vec::new()).await;
    let (_conn, _rx) = test_helpers::join_client(&state, &room_id, OWNER, Role::Owner).await;

    let handle = spawn_persistence_task(state.clone());
    element::upsert_element(&state, &room_id, test_helpers::rect(1)).await.unwrap();

    let mut flushed = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if directory.get(&room_id).await.unwrap().elements.len() == 1 {
            flushed = true;
            break;
        }
    }
    handle.abort();
    assert!(flushed, "persistence task never flushed the room");
}
