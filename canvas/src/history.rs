//! Undo/redo log for the room owner.
//!
//! Two independent stacks of reversible actions layered over the element
//! store. Committing a new action always clears the redo stack. Undo emits
//! an incremental event; redo emits the whole ordered collection so every
//! client converges on the same order.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use frames::{Element, Event};
use uuid::Uuid;

use crate::doc::DocStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Add,
    Update,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub kind: EntryKind,
    pub element_id: Uuid,
    pub new_snapshot: Element,
    /// Present for updates only.
    pub old_snapshot: Option<Element>,
}

#[derive(Debug, Default)]
pub struct History {
    undo: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(&mut self, entry: HistoryEntry) {
        self.undo.push(entry);
        self.redo.clear();
    }

    pub fn record_add(&mut self, element: Element) {
        self.commit(HistoryEntry {
            kind: EntryKind::Add,
            element_id: element.id,
            new_snapshot: element,
            old_snapshot: None,
        });
    }

    pub fn record_update(&mut self, before: Element, after: Element) {
        self.commit(HistoryEntry {
            kind: EntryKind::Update,
            element_id: after.id,
            new_snapshot: after,
            old_snapshot: Some(before),
        });
    }

    /// Revert the last action in `doc`. Returns the event to broadcast, if any.
    pub fn undo(&mut self, doc: &mut DocStore) -> Option<Event> {
        let entry = self.undo.pop()?;
        let event = match entry.kind {
            EntryKind::Add => {
                doc.remove(&entry.element_id);
                Some(Event::DeleteElement { id: entry.element_id })
            }
            EntryKind::Update => match &entry.old_snapshot {
                Some(old) if doc.get(&entry.element_id).is_some() => {
                    doc.upsert(old.clone());
                    Some(Event::DrawElement { element: old.clone() })
                }
                _ => None,
            },
        };
        self.redo.push(entry);
        event
    }

    /// Re-apply the last undone action. Returns a full `SyncState`.
    pub fn redo(&mut self, doc: &mut DocStore) -> Option<Event> {
        let entry = self.redo.pop()?;
        match entry.kind {
            EntryKind::Add => {
                doc.upsert(entry.new_snapshot.clone());
            }
            EntryKind::Update => {
                if doc.get(&entry.element_id).is_some() {
                    doc.upsert(entry.new_snapshot.clone());
                }
            }
        }
        self.undo.push(entry);
        Some(Event::SyncState { elements: doc.elements().to_vec() })
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    #[must_use]
    pub fn undo_entries(&self) -> &[HistoryEntry] {
        &self.undo
    }

    /// Redo stack, bottom first.
    #[must_use]
    pub fn redo_entries(&self) -> &[HistoryEntry] {
        &self.redo
    }
}
