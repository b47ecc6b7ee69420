use super::*;
use crate::element::{ElementBody, Point, Stroke};

fn pen(ts: i64) -> Element {
    pen_with_id(Uuid::new_v4(), ts)
}

fn pen_with_id(id: Uuid, ts: i64) -> Element {
    Element::new(
        id,
        ts,
        ElementBody::Pen(Stroke {
            color: "#000".into(),
            stroke_width: 2.0,
            points: vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)],
        }),
    )
}

#[test]
fn upsert_twice_keeps_one_element() {
    let mut store = ElementStore::new();
    let el = pen(1);
    assert!(store.upsert(el.clone()));
    assert!(!store.upsert(el.clone()));
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(&el.id), Some(&el));
}

#[test]
fn upsert_existing_keeps_position() {
    let mut store = ElementStore::new();
    let a = pen(1);
    let b = pen(2);
    store.upsert(a.clone());
    store.upsert(b.clone());

    let mut moved = a.clone();
    moved.move_to(Point::new(50.0, 50.0));
    store.upsert(moved);

    let ids: Vec<Uuid> = store.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);
}

#[test]
fn sorted_is_ascending_by_timestamp_regardless_of_arrival() {
    let mut store = ElementStore::new();
    for ts in [5, 1, 4, 2, 3] {
        store.upsert(pen(ts));
    }
    let order: Vec<i64> = store.sorted().iter().map(|e| e.timestamp).collect();
    assert_eq!(order, vec![1, 2, 3, 4, 5]);
}

#[test]
fn sorted_breaks_ties_by_id() {
    let low = Uuid::from_u128(1);
    let high = Uuid::from_u128(2);
    let mut store = ElementStore::new();
    store.upsert(pen_with_id(high, 7));
    store.upsert(pen_with_id(low, 7));
    let ids: Vec<Uuid> = store.sorted().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![low, high]);
}

#[test]
fn remove_drops_element_and_order_slot() {
    let mut store = ElementStore::new();
    let a = pen(1);
    store.upsert(a.clone());
    assert!(store.remove(&a.id).is_some());
    assert!(store.is_empty());
    assert!(store.remove(&a.id).is_none());
    assert_eq!(store.iter().count(), 0);
}

#[test]
fn patch_unknown_id_is_noop() {
    let mut store = ElementStore::new();
    assert!(!store.patch(&Uuid::new_v4(), &ElementPatch::default()));
}

#[test]
fn replace_all_dedupes_latest_wins_first_position() {
    let a = pen(1);
    let b = pen(2);
    let mut a2 = a.clone();
    a2.timestamp = 9;

    let store = ElementStore::from_elements(vec![a.clone(), b.clone(), a2]);
    assert_eq!(store.len(), 2);
    let ids: Vec<Uuid> = store.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);
    assert_eq!(store.get(&a.id).map(|e| e.timestamp), Some(9));
}

#[test]
fn clear_empties_store() {
    let mut store = ElementStore::from_elements(vec![pen(1), pen(2)]);
    store.clear();
    assert!(store.is_empty());
    assert!(store.to_vec().is_empty());
}
