//! Local document: the reconciled element store plus transient strokes.
//!
//! `DocStore` owns the client's copy of the room's elements and the
//! in-progress strokes other participants are currently drawing. The renderer
//! reads from `DocStore` via [`DocStore::render_list`], which merges committed
//! and transient elements into a single z-ordered list.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashMap;

use frames::store::z_order;
use frames::{Element, ElementPatch, ElementStore};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct DocStore {
    elements: ElementStore,
    /// Remote in-progress strokes keyed by the drawing user's id.
    remote_strokes: HashMap<String, Element>,
}

impl DocStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn elements(&self) -> &ElementStore {
        &self.elements
    }

    #[must_use]
    pub fn get(&self, id: &Uuid) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Upsert a committed element. A committed stroke supersedes any transient
    /// copy with the same id.
    pub fn upsert(&mut self, element: Element) -> bool {
        let id = element.id;
        self.remote_strokes.retain(|_, stroke| stroke.id != id);
        self.elements.upsert(element)
    }

    pub fn patch(&mut self, id: &Uuid, patch: &ElementPatch) -> bool {
        self.elements.patch(id, patch)
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<Element> {
        self.elements.remove(id)
    }

    /// Full resync from an authoritative array.
    pub fn load_snapshot(&mut self, elements: Vec<Element>) {
        self.elements.replace_all(elements);
        self.remote_strokes.clear();
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.remote_strokes.clear();
    }

    /// Record the latest in-progress stroke from `user_id`.
    pub fn set_remote_stroke(&mut self, user_id: impl Into<String>, stroke: Element) {
        if self.elements.contains(&stroke.id) {
            return;
        }
        self.remote_strokes.insert(user_id.into(), stroke);
    }

    pub fn clear_remote_stroke(&mut self, user_id: &str) {
        self.remote_strokes.remove(user_id);
    }

    /// Keep only the strokes of users for which `present` holds. Returns how
    /// many were dropped.
    pub fn retain_remote_strokes(&mut self, present: impl Fn(&str) -> bool) -> usize {
        let before = self.remote_strokes.len();
        self.remote_strokes.retain(|user_id, _| present(user_id.as_str()));
        before - self.remote_strokes.len()
    }

    #[must_use]
    pub fn remote_stroke_count(&self) -> usize {
        self.remote_strokes.len()
    }

    /// Everything to draw, ascending z-order. `local` is the caller's own
    /// uncommitted stroke or shape, if any.
    #[must_use]
    pub fn render_list<'a>(&'a self, local: Option<&'a Element>) -> Vec<&'a Element> {
        let mut out = self.elements.sorted();
        out.extend(
            self.remote_strokes
                .values()
                .filter(|s| s.body.as_stroke().is_some_and(|st| !st.points.is_empty())),
        );
        out.extend(local);
        out.sort_by(|a, b| z_order(a, b));
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
