//! Hit testing in world space.
//!
//! Only box-shaped elements (rectangles, polygons, stars, sticky notes, text
//! blocks, images) are directly pickable; freehand strokes, circles, and
//! lines are not. Handles are sized in screen pixels and converted with the
//! current scale so they stay the same size at every zoom level.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use frames::{Element, ElementKind};
use uuid::Uuid;

use crate::camera::{Camera, Point};
use crate::consts::{HANDLE_HIT_PX, HIT_MIN_EXTENT, HIT_SLOP};
use crate::doc::DocStore;

/// Which part of an element was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    ResizeHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub element_id: Uuid,
    pub part: HitPart,
}

/// Whether `kind` can be picked by clicking inside its box.
#[must_use]
pub fn is_pickable(kind: ElementKind) -> bool {
    matches!(
        kind,
        ElementKind::Rect
            | ElementKind::Triangle
            | ElementKind::Pentagon
            | ElementKind::Hexagon
            | ElementKind::Octagon
            | ElementKind::Star
            | ElementKind::Sticky
            | ElementKind::Text
            | ElementKind::Image
    )
}

/// Images and sticky notes are grabbed regardless of the active tool.
#[must_use]
pub fn is_priority(kind: ElementKind) -> bool {
    matches!(kind, ElementKind::Image | ElementKind::Sticky)
}

/// Box containment with slop and a minimum extent.
#[must_use]
pub fn is_within(element: &Element, p: Point) -> bool {
    if !is_pickable(element.kind()) {
        return false;
    }
    let origin = element.origin();
    let (w, h) = element.size().unwrap_or((0.0, 0.0));
    let w = w.max(HIT_MIN_EXTENT);
    let h = h.max(HIT_MIN_EXTENT);
    p.x >= origin.x - HIT_SLOP
        && p.x <= origin.x + w + HIT_SLOP
        && p.y >= origin.y - HIT_SLOP
        && p.y <= origin.y + h + HIT_SLOP
}

/// Bottom-right corner used for the resize handle.
#[must_use]
pub fn handle_corner(element: &Element) -> Option<Point> {
    let (w, h) = element.size()?;
    let origin = element.origin();
    Some(Point::new(origin.x + w, origin.y + h))
}

#[must_use]
pub fn hits_resize_handle(element: &Element, p: Point, camera: &Camera) -> bool {
    let Some(corner) = handle_corner(element) else {
        return false;
    };
    let half = camera.screen_dist_to_world(HANDLE_HIT_PX);
    (p.x - corner.x).abs() <= half && (p.y - corner.y).abs() <= half
}

/// Topmost element under `p` (reverse render order) that passes `filter`.
#[must_use]
pub fn topmost<F>(doc: &DocStore, p: Point, filter: F) -> Option<Uuid>
where
    F: Fn(&Element) -> bool,
{
    doc.elements()
        .sorted()
        .into_iter()
        .rev()
        .find(|el| filter(el) && is_within(el, p))
        .map(|el| el.id)
}

/// Test what is under `p`: the selected element's handle first, then bodies.
#[must_use]
pub fn hit_test(p: Point, doc: &DocStore, camera: &Camera, selected_id: Option<Uuid>) -> Option<Hit> {
    if let Some(selected) = selected_id.and_then(|id| doc.get(&id)) {
        if hits_resize_handle(selected, p, camera) {
            return Some(Hit { element_id: selected.id, part: HitPart::ResizeHandle });
        }
    }
    topmost(doc, p, |_| true).map(|element_id| Hit { element_id, part: HitPart::Body })
}
