#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;
use crate::element::{ElementBody, Point, Stroke};
use crate::{decode_frame, encode_frame};

fn pen_stroke(points: usize) -> Element {
    Element::new(
        Uuid::new_v4(),
        1_700_000_000_000,
        ElementBody::Pen(Stroke {
            color: "#ffffff".into(),
            stroke_width: 5.0,
            points: (0..points).map(|i| Point::new(i as f64, (i * 2) as f64)).collect(),
        }),
    )
}

fn through_wire(event: &Event) -> Event {
    let frame = decode_frame(&encode_frame(&event.to_frame())).expect("decode");
    Event::from_frame(&frame).expect("event")
}

#[test]
fn draw_element_survives_binary_wire() {
    let element = pen_stroke(5);
    let event = Event::DrawElement { element: element.clone() };
    let Event::DrawElement { element: received } = through_wire(&event) else {
        panic!("expected draw");
    };
    assert_eq!(received, element);
    assert_eq!(received.body.as_stroke().map(|s| s.points.len()), Some(5));
}

#[test]
fn snapshot_travels_as_join_done() {
    let event = Event::Snapshot(RoomSnapshot {
        elements: vec![pen_stroke(2)],
        allow_list: vec!["s1".into()],
        name: "Physics".into(),
        owner_id: Some("t1".into()),
    });
    let frame = event.to_frame();
    assert_eq!(frame.syscall, "room:join");
    assert_eq!(frame.status, Status::Done);
    assert_eq!(through_wire(&event), event);
}

#[test]
fn join_request_parses_as_join() {
    let frame = Frame::request("room:join", json!({"username": "ada"}));
    assert_eq!(Event::from_frame(&frame).expect("event"), Event::Join { username: "ada".into() });
}

#[test]
fn empty_payload_variants_accept_empty_or_null_data() {
    let frame = Frame::request("element:clear", json!({}));
    assert_eq!(Event::from_frame(&frame).expect("clear"), Event::ClearCanvas {});
    let frame = Frame::request("room:deleted", Value::Null);
    assert_eq!(Event::from_frame(&frame).expect("deleted"), Event::RoomDeleted {});
}

#[test]
fn payload_fields_are_camel_case() {
    let event = Event::ViewportChange { scale: 2.0, pan_x: -10.0, pan_y: 4.5 };
    let payload = event.payload();
    assert_eq!(payload["panX"], -10.0);
    assert_eq!(payload["panY"], 4.5);

    let event = Event::UpdateElement {
        id: Uuid::nil(),
        patch: ElementPatch { width: Some(300.0), ..ElementPatch::default() },
    };
    assert_eq!(event.payload()["patch"], json!({"width": 300.0}));
}

#[test]
fn roles_accept_legacy_names() {
    let entry: PresenceEntry = serde_json::from_value(json!({
        "userId": "u1",
        "username": "Ms. T",
        "role": "teacher",
        "connectionId": Uuid::nil()
    }))
    .expect("presence");
    assert_eq!(entry.role, Role::Owner);
    let role: Role = serde_json::from_value(json!("student")).expect("role");
    assert_eq!(role, Role::Participant);
}

#[test]
fn unknown_syscall_is_reported() {
    let frame = Frame::request("board:list", json!({}));
    let err = Event::from_frame(&frame).expect_err("unknown");
    assert!(matches!(err, EventError::UnknownSyscall(ref s) if s == "board:list"));
    assert_eq!(err.error_code(), "E_UNKNOWN_SYSCALL");
}

#[test]
fn malformed_payload_is_reported() {
    let frame = Frame::request("element:delete", json!({"id": "not-a-uuid"}));
    let err = Event::from_frame(&frame).expect_err("malformed");
    assert!(matches!(err, EventError::Malformed { .. }));
}

#[test]
fn error_reply_becomes_rejected() {
    let req = Frame::request("element:draw", json!({}));
    let reply = req.error_from(&EventError::UnknownSyscall("x".into()));
    let err = Event::from_frame(&reply).expect_err("rejected");
    assert!(matches!(err, EventError::Rejected { ref code, .. } if code == "E_UNKNOWN_SYSCALL"));
}

#[test]
fn classification() {
    assert!(Event::ClearCanvas {}.is_mutating());
    assert!(Event::ClearCanvas {}.is_owner_only());
    assert!(Event::DeleteElement { id: Uuid::nil() }.is_mutating());
    assert!(!Event::DeleteElement { id: Uuid::nil() }.is_owner_only());
    assert!(Event::ThemeChanged { is_dark: true }.is_owner_only());
    assert!(!Event::ThemeChanged { is_dark: true }.is_mutating());
    assert!(!Event::CursorMove { user_id: String::new(), x: 0.0, y: 0.0, color: String::new(), label: String::new() }
        .is_mutating());
}

#[test]
fn empty_transient_stroke_is_a_cancel_not_a_mutation() {
    let drawing = Event::DrawingStroke { user_id: "u1".into(), stroke: pen_stroke(3) };
    let cancel = Event::DrawingStroke { user_id: "u1".into(), stroke: pen_stroke(0) };
    assert!(drawing.is_mutating());
    assert!(!cancel.is_mutating());
    assert!(is_stroke_cancel(&pen_stroke(0)));
    assert!(!is_stroke_cancel(&pen_stroke(1)));
}
