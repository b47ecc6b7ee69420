//! Local participant session: identity, role, edit rights, and roster.
//!
//! The edit flag is computed from the allow-list at join time and afterwards
//! flipped only by targeted `permission:changed` frames. The owner always
//! holds edit rights.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use frames::event::RoomSnapshot;
use frames::{PresenceEntry, Role};

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    pub room_id: String,
    pub room_name: String,
    allowed: bool,
    pub roster: Vec<PresenceEntry>,
    pub is_dark: bool,
    /// Set once a join snapshot has been applied.
    pub joined: bool,
}

impl Session {
    #[must_use]
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, role: Role, room_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            role,
            room_id: room_id.into(),
            room_name: String::new(),
            allowed: false,
            roster: Vec::new(),
            is_dark: false,
            joined: false,
        }
    }

    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }

    /// Whether the local participant may mutate the canvas.
    #[must_use]
    pub fn can_edit(&self) -> bool {
        self.is_owner() || self.allowed
    }

    /// Compute edit rights from a join snapshot.
    pub fn apply_snapshot(&mut self, snapshot: &RoomSnapshot) {
        self.allowed = snapshot.allow_list.iter().any(|id| id == &self.user_id);
        self.room_name.clone_from(&snapshot.name);
        self.joined = true;
    }

    pub fn set_allowed(&mut self, allowed: bool) {
        self.allowed = allowed;
    }

    pub fn set_roster(&mut self, users: Vec<PresenceEntry>) {
        self.roster = users;
    }

    /// Forget everything learned from the room.
    pub fn reset(&mut self) {
        self.allowed = false;
        self.roster.clear();
        self.room_name.clear();
        self.joined = false;
    }
}
