use super::*;
use crate::state::test_helpers;
use serde_json::json;

#[tokio::test]
async fn strict_memory_directory_does_not_invent_rooms() {
    let directory = MemoryDirectory::new();
    assert!(directory.load_room("nope").await.unwrap().is_none());
    assert!(!directory.exists("nope").await.unwrap());
}

#[tokio::test]
async fn open_memory_directory_creates_untitled_room() {
    let directory = MemoryDirectory::open();
    let record = directory.load_room("r1").await.unwrap().unwrap();
    assert_eq!(record.name, "Untitled Board");
    assert!(record.owner_id.is_none());
    assert!(directory.exists("r1").await.unwrap());
}

#[tokio::test]
async fn save_elements_overwrites_snapshot() {
    let directory = MemoryDirectory::new();
    let room_id = test_helpers::seed_room(&directory, vec![test_helpers::rect(1)]).await;

    let replacement = vec![test_helpers::pen(5), test_helpers::rect(6)];
    directory.save_elements(&room_id, &replacement, &[]).await.unwrap();

    let record = directory.get(&room_id).await.unwrap();
    assert_eq!(record.elements, replacement);
}

#[tokio::test]
async fn save_elements_for_missing_room_is_not_found() {
    let directory = MemoryDirectory::new();
    let err = directory.save_elements("gone", &[], &[]).await.unwrap_err();
    assert_eq!(err.error_code(), "E_ROOM_NOT_FOUND");
    assert!(!err.retryable());
}

#[tokio::test]
async fn set_allowed_is_idempotent() {
    let directory = MemoryDirectory::new();
    let room_id = test_helpers::seed_room(&directory, Vec::new()).await;

    directory.set_allowed(&room_id, "u-student", true).await.unwrap();
    directory.set_allowed(&room_id, "u-student", true).await.unwrap();
    assert_eq!(directory.get(&room_id).await.unwrap().allow_list, vec!["u-student".to_owned()]);

    directory.set_allowed(&room_id, "u-student", false).await.unwrap();
    directory.set_allowed(&room_id, "u-student", false).await.unwrap();
    assert!(directory.get(&room_id).await.unwrap().allow_list.is_empty());
}

#[tokio::test]
async fn add_participant_records_each_user_once() {
    let directory = MemoryDirectory::new();
    let room_id = test_helpers::seed_room(&directory, Vec::new()).await;

    directory.add_participant(&room_id, "u-student", "participant").await.unwrap();
    directory.add_participant(&room_id, "u-student", "participant").await.unwrap();
    assert_eq!(directory.get(&room_id).await.unwrap().participants, vec!["u-student".to_owned()]);
}

#[test]
fn decode_elements_defaults_legacy_fields_and_keeps_the_rest_verbatim() {
    let id = uuid::Uuid::new_v4();
    let raw = json!([
        { "id": id, "type": "rect", "x": null, "y": 2.0, "width": 3.0, "height": 4.0, "size": 7.0 },
        { "id": "legacy-7", "type": "pen", "points": [{ "x": 1, "y": 2 }] },
        { "type": "pen" },
        { "id": "a1", "type": "arrow" },
    ]);

    let (elements, unreadable) = decode_elements("r1", raw);
    assert_eq!(elements.len(), 2);
    assert_eq!(elements[0].id, id);
    assert_eq!(elements[0].timestamp, 0);
    let shape = elements[0].body.as_shape().unwrap();
    assert!(shape.x.abs() < f64::EPSILON);
    assert!((shape.stroke_width - 7.0).abs() < f64::EPSILON);
    assert_eq!(elements[1].id, frames::element::legacy_id("legacy-7"));
    assert_eq!(unreadable, vec![json!({ "type": "pen" }), json!({ "id": "a1", "type": "arrow" })]);
}

#[test]
fn decode_elements_of_null_is_empty() {
    let (elements, unreadable) = decode_elements("r1", Value::Null);
    assert!(elements.is_empty());
    assert!(unreadable.is_empty());
}

#[test]
fn encode_elements_appends_undecoded_entries() {
    let rect = test_helpers::rect(1);
    let kept = json!({ "id": "a1", "type": "arrow" });
    let encoded = encode_elements(std::slice::from_ref(&rect), std::slice::from_ref(&kept)).unwrap();

    let (elements, unreadable) = decode_elements("r1", encoded);
    assert_eq!(elements, vec![rect]);
    assert_eq!(unreadable, vec![kept]);
}

#[tokio::test]
async fn undecoded_entries_survive_a_flush() {
    let (state, directory) = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&directory, Vec::new()).await;
    let kept = json!({ "id": "a1", "type": "arrow" });
    let mut record = directory.get(&room_id).await.unwrap();
    record.unreadable = vec![kept.clone()];
    directory.insert(record).await;

    let (_conn, _rx) = test_helpers::join_client(&state, &room_id, test_helpers::OWNER, frames::Role::Owner).await;
    crate::services::element::upsert_element(&state, &room_id, test_helpers::pen(3)).await.unwrap();
    crate::services::persistence::flush_all_dirty(&state).await;

    let record = directory.get(&room_id).await.unwrap();
    assert_eq!(record.elements.len(), 1);
    assert_eq!(record.unreadable, vec![kept]);
}

#[test]
fn encode_failures_are_reported_not_written() {
    let err = DirectoryError::from(serde_json::from_str::<Value>("{").unwrap_err());
    assert_eq!(err.error_code(), "E_ENCODE");
    assert!(!err.retryable());
}

#[test]
fn decode_allow_list_keeps_strings_only() {
    assert_eq!(decode_allow_list(json!(["a", 3, "b", null])), vec!["a".to_owned(), "b".to_owned()]);
    assert!(decode_allow_list(json!({"a": 1})).is_empty());
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
async fn pg_directory_round_trip() {
    use sqlx::postgres::PgPoolOptions;

    let Ok(url) = std::env::var("DATABASE_URL") else {
        return;
    };
    let pool = PgPoolOptions::new().max_connections(1).connect(&url).await.unwrap();
    sqlx::migrate!("src/db/migrations").run(&pool).await.unwrap();

    let room_id = format!("live-{}", uuid::Uuid::new_v4().simple());
    sqlx::query("INSERT INTO rooms (room_id, name, owner_id) VALUES ($1, 'Live', 'u-owner')")
        .bind(&room_id)
        .execute(&pool)
        .await
        .unwrap();

    let directory = PgDirectory::new(pool);
    assert!(directory.exists(&room_id).await.unwrap());

    let elements = vec![test_helpers::rect(1)];
    directory.save_elements(&room_id, &elements, &[json!({ "type": "arrow" })]).await.unwrap();
    directory.set_allowed(&room_id, "u-student", true).await.unwrap();
    directory.add_participant(&room_id, "u-student", "participant").await.unwrap();

    let record = directory.load_room(&room_id).await.unwrap().unwrap();
    assert_eq!(record.elements, elements);
    assert_eq!(record.unreadable, vec![json!({ "type": "arrow" })]);
    assert_eq!(record.allow_list, vec!["u-student".to_owned()]);
    assert_eq!(record.participants, vec!["u-student".to_owned()]);
}
