//! Id-keyed ordered element storage.
//!
//! Both the server's per-room authority and each client's reconciled copy use
//! [`ElementStore`]. Elements are addressed by id only; arrival order is kept
//! separately so full snapshots preserve the sender's array order, while
//! render order comes from [`ElementStore::sorted`].

use std::collections::HashMap;

use uuid::Uuid;

use crate::element::{Element, ElementPatch};

#[derive(Debug, Clone, Default)]
pub struct ElementStore {
    elements: HashMap<Uuid, Element>,
    order: Vec<Uuid>,
}

impl ElementStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a persisted or received array.
    #[must_use]
    pub fn from_elements(elements: Vec<Element>) -> Self {
        let mut store = Self::new();
        store.replace_all(elements);
        store
    }

    /// Replace if the id exists (keeping its position), else append.
    /// Returns `true` when the element was new.
    pub fn upsert(&mut self, element: Element) -> bool {
        let id = element.id;
        let inserted = self.elements.insert(id, element).is_none();
        if inserted {
            self.order.push(id);
        }
        inserted
    }

    /// Merge `patch` into the stored element. Returns `false` for unknown ids.
    pub fn patch(&mut self, id: &Uuid, patch: &ElementPatch) -> bool {
        let Some(element) = self.elements.get_mut(id) else {
            return false;
        };
        element.apply_patch(patch);
        true
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<Element> {
        let removed = self.elements.remove(id)?;
        self.order.retain(|existing| existing != id);
        Some(removed)
    }

    /// Full resync. Duplicate ids collapse to the last occurrence, placed at
    /// the first occurrence's position.
    pub fn replace_all(&mut self, elements: Vec<Element>) {
        self.elements.clear();
        self.order.clear();
        for element in elements {
            self.upsert(element);
        }
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.order.clear();
    }

    #[must_use]
    pub fn get(&self, id: &Uuid) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    #[must_use]
    pub fn contains(&self, id: &Uuid) -> bool {
        self.elements.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.order.iter().filter_map(|id| self.elements.get(id))
    }

    /// Owned copy in arrival order, the shape sent in snapshots and syncs.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Element> {
        self.iter().cloned().collect()
    }

    /// Render order: ascending `timestamp`, ties broken by id.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Element> {
        let mut out: Vec<&Element> = self.elements.values().collect();
        out.sort_by(|a, b| z_order(a, b));
        out
    }
}

/// Total z-order over elements: `(timestamp, id)`.
#[must_use]
pub fn z_order(a: &Element, b: &Element) -> std::cmp::Ordering {
    a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
