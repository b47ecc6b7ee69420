use super::*;

fn sample_frame() -> Frame {
    Frame {
        id: "id-1".to_owned(),
        parent_id: Some("parent-1".to_owned()),
        ts: 42,
        room_id: Some("room-1".to_owned()),
        from: Some("user-1".to_owned()),
        syscall: "element:update".to_owned(),
        status: Status::Done,
        data: serde_json::json!({
            "x": 1.25,
            "ok": true,
            "tags": ["a", "b"],
            "nested": {"k": "v"},
            "nil": null
        }),
    }
}

fn wire_with(status: i32, data: Option<prost_types::Value>) -> Vec<u8> {
    let wire = WireFrame {
        id: "id-1".to_owned(),
        parent_id: None,
        ts: 1,
        room_id: None,
        from: None,
        syscall: "element:clear".to_owned(),
        status,
        data,
    };
    let mut bytes = Vec::new();
    wire.encode(&mut bytes).expect("encode");
    bytes
}

// =============================================================
// Status
// =============================================================

#[test]
fn status_numeric_mapping_matches_wire_enum() {
    assert_eq!(Status::Request.as_i32(), 0);
    assert_eq!(Status::Done.as_i32(), 1);
    assert_eq!(Status::Error.as_i32(), 2);
    assert_eq!(Status::Cancel.as_i32(), 3);
    assert_eq!(Status::Item.as_i32(), 4);
    assert_eq!(Status::Bulk.as_i32(), 5);
}

#[test]
fn status_from_wire_rejects_out_of_range_value() {
    let err = Status::from_i32(99).expect_err("status should be invalid");
    assert!(matches!(err, CodecError::InvalidStatus(99)));
}

#[test]
fn terminal_statuses() {
    assert!(Status::Done.is_terminal());
    assert!(Status::Error.is_terminal());
    assert!(Status::Cancel.is_terminal());
    assert!(!Status::Request.is_terminal());
    assert!(!Status::Item.is_terminal());
}

#[test]
fn status_serializes_as_lowercase_json() {
    assert_eq!(serde_json::to_string(&Status::Request).expect("serialize"), "\"request\"");
    assert_eq!(serde_json::to_string(&Status::Done).expect("serialize"), "\"done\"");
}

// =============================================================
// Codec
// =============================================================

#[test]
fn encode_decode_preserves_frame() {
    let frame = sample_frame();
    let decoded = decode_frame(&encode_frame(&frame)).expect("decode should succeed");
    assert_eq!(decoded, frame);
}

#[test]
fn decode_frame_rejects_malformed_bytes() {
    let err = decode_frame(&[0xff, 0x00, 0x01]).expect_err("bytes should fail");
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn decode_frame_rejects_invalid_wire_status() {
    let bytes = wire_with(77, Some(json_to_proto_value(&serde_json::json!({}))));
    let err = decode_frame(&bytes).expect_err("status should fail");
    assert!(matches!(err, CodecError::InvalidStatus(77)));
}

#[test]
fn decode_frame_defaults_missing_data_to_empty_object() {
    let bytes = wire_with(Status::Request.as_i32(), None);
    let frame = decode_frame(&bytes).expect("decode");
    assert_eq!(frame.data, serde_json::json!({}));
}

#[test]
fn decode_frame_converts_nan_number_to_json_null() {
    let bytes = wire_with(
        Status::Request.as_i32(),
        Some(prost_types::Value {
            kind: Some(prost_types::value::Kind::NumberValue(f64::NAN)),
        }),
    );
    let frame = decode_frame(&bytes).expect("decode");
    assert_eq!(frame.data, Value::Null);
}

#[test]
fn integral_numbers_come_back_as_integers() {
    let frame = Frame::request("element:draw", serde_json::json!({"timestamp": 1_700_000_000_123_i64}));
    let decoded = decode_frame(&encode_frame(&frame)).expect("decode");
    assert_eq!(
        decoded.data.get("timestamp").and_then(Value::as_i64),
        Some(1_700_000_000_123)
    );
}

#[test]
fn fractional_numbers_stay_floats() {
    let frame = Frame::request("cursor:move", serde_json::json!({"x": 10.5}));
    let decoded = decode_frame(&encode_frame(&frame)).expect("decode");
    assert_eq!(decoded.data.get("x").and_then(Value::as_f64), Some(10.5));
}

#[test]
fn json_text_frame_round_trips() {
    let frame = sample_frame();
    let text = encode_json_frame(&frame);
    let decoded = decode_json_frame(&text).expect("decode");
    assert_eq!(decoded, frame);
}

#[test]
fn json_text_frame_rejects_garbage() {
    let err = decode_json_frame("not json").expect_err("should fail");
    assert!(matches!(err, CodecError::Json(_)));
}

// =============================================================
// Constructors
// =============================================================

#[test]
fn request_sets_fields() {
    let frame = Frame::request("room:join", serde_json::json!({}));
    assert_eq!(frame.syscall, "room:join");
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(frame.room_id.is_none());
    assert!(frame.ts > 0);
}

#[test]
fn reply_inherits_context() {
    let req = Frame::request("room:join", serde_json::json!({})).with_room_id("r1");
    let done = req.done_with(serde_json::json!({"elements": []}));

    assert_eq!(done.parent_id.as_deref(), Some(req.id.as_str()));
    assert_eq!(done.room_id.as_deref(), Some("r1"));
    assert_eq!(done.syscall, "room:join");
    assert_eq!(done.status, Status::Done);
}

#[test]
fn prefix_extraction() {
    let frame = Frame::request("element:draw", serde_json::json!({}));
    assert_eq!(frame.prefix(), "element");

    let frame = Frame::request("noseparator", serde_json::json!({}));
    assert_eq!(frame.prefix(), "noseparator");
}

#[test]
fn with_data_inserts_into_object_payload() {
    let frame = Frame::request("cursor:move", Value::Null).with_data("x", 3);
    assert_eq!(frame.data.get("x").and_then(Value::as_i64), Some(3));
    assert_eq!(frame.data_str("missing"), None);
}

#[test]
fn error_from_typed() {
    #[derive(Debug, thiserror::Error)]
    #[error("room not found")]
    struct NotFound;

    impl ErrorCode for NotFound {
        fn error_code(&self) -> &'static str {
            "E_ROOM_NOT_FOUND"
        }
    }

    let req = Frame::request("room:join", serde_json::json!({}));
    let err = req.error_from(&NotFound);

    assert_eq!(err.status, Status::Error);
    assert_eq!(err.data_str("code"), Some("E_ROOM_NOT_FOUND"));
    assert_eq!(err.data_str("message"), Some("room not found"));
    assert_eq!(err.data.get("retryable").and_then(Value::as_bool), Some(false));
}

#[test]
fn error_plain_message() {
    let req = Frame::request("element:draw", serde_json::json!({}));
    let err = req.error("bad");
    assert_eq!(err.status, Status::Error);
    assert_eq!(err.data_str("message"), Some("bad"));
}
