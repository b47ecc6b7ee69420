use frames::element::{ElementBody, Point, Stroke};
use uuid::Uuid;

use super::*;

fn pen(ts: i64, points: usize) -> Element {
    Element::new(
        Uuid::new_v4(),
        ts,
        ElementBody::Pen(Stroke {
            color: "#000".into(),
            stroke_width: 2.0,
            points: (0..points).map(|i| Point::new(i as f64, 0.0)).collect(),
        }),
    )
}

fn timestamps(list: &[&Element]) -> Vec<i64> {
    list.iter().map(|e| e.timestamp).collect()
}

#[test]
fn render_list_merges_remote_strokes_by_timestamp() {
    let mut doc = DocStore::new();
    doc.upsert(pen(10, 2));
    doc.upsert(pen(30, 2));
    doc.set_remote_stroke("u2", pen(20, 4));

    assert_eq!(timestamps(&doc.render_list(None)), vec![10, 20, 30]);
}

#[test]
fn render_list_includes_local_in_progress() {
    let mut doc = DocStore::new();
    doc.upsert(pen(10, 2));
    let local = pen(5, 3);
    assert_eq!(timestamps(&doc.render_list(Some(&local))), vec![5, 10]);
}

#[test]
fn empty_remote_strokes_are_not_drawn() {
    let mut doc = DocStore::new();
    doc.set_remote_stroke("u2", pen(1, 0));
    assert!(doc.render_list(None).is_empty());
    assert_eq!(doc.remote_stroke_count(), 1);
}

#[test]
fn committing_a_stroke_drops_its_transient_copy() {
    let mut doc = DocStore::new();
    let stroke = pen(3, 5);
    doc.set_remote_stroke("u2", stroke.clone());
    doc.upsert(stroke);
    assert_eq!(doc.remote_stroke_count(), 0);
    assert_eq!(doc.render_list(None).len(), 1);
}

#[test]
fn late_transient_for_committed_stroke_is_ignored() {
    let mut doc = DocStore::new();
    let stroke = pen(3, 5);
    doc.upsert(stroke.clone());
    doc.set_remote_stroke("u2", stroke);
    assert_eq!(doc.remote_stroke_count(), 0);
}

#[test]
fn snapshot_and_clear_reset_transients() {
    let mut doc = DocStore::new();
    doc.set_remote_stroke("u2", pen(1, 3));
    doc.load_snapshot(vec![pen(1, 2), pen(2, 2)]);
    assert_eq!(doc.len(), 2);
    assert_eq!(doc.remote_stroke_count(), 0);

    doc.set_remote_stroke("u3", pen(4, 3));
    doc.clear();
    assert!(doc.is_empty());
    assert_eq!(doc.remote_stroke_count(), 0);
}

#[test]
fn retain_remote_strokes_drops_departed_users() {
    let mut doc = DocStore::new();
    doc.set_remote_stroke("u2", pen(1, 3));
    doc.set_remote_stroke("u3", pen(2, 3));

    let dropped = doc.retain_remote_strokes(|user_id| user_id == "u3");
    assert_eq!(dropped, 1);
    assert_eq!(doc.remote_stroke_count(), 1);
    assert_eq!(timestamps(&doc.render_list(None)), vec![2]);
}
