//! Typed event catalogue carried inside [`Frame`]s.
//!
//! Every realtime interaction maps to exactly one [`Event`] variant and one
//! syscall name. The frame keeps the raw JSON payload; [`Event::from_frame`]
//! is the single place where payloads are parsed into typed values.
//!
//! FAN-OUT
//! =======
//! Fan-out and persistence rules live with the server dispatcher; this module
//! only classifies events ([`Event::is_mutating`], [`Event::is_owner_only`]).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::element::{Element, ElementPatch};
use crate::{ErrorCode, FRAME_CODE, FRAME_MESSAGE, Frame, Status};

pub const SYSCALL_JOIN: &str = "room:join";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Unrestricted edit rights and the only history keeper.
    #[serde(alias = "teacher")]
    Owner,
    /// Edits only while on the room's allow-list.
    #[serde(alias = "student")]
    Participant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Participant => "participant",
        }
    }
}

/// One live connection in a room roster. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    pub connection_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    #[serde(default)]
    pub elements: Vec<Element>,
    #[serde(default)]
    pub allow_list: Vec<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<String>,
}

/// Every message exchanged over a room channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "syscall", content = "data", rename_all_fields = "camelCase")]
pub enum Event {
    #[serde(rename = "room:join")]
    Join {
        #[serde(default)]
        username: String,
    },
    /// Reply to [`Event::Join`]; travels as `room:join` with status `done`.
    #[serde(rename = "room:snapshot")]
    Snapshot(RoomSnapshot),
    #[serde(rename = "room:users")]
    Roster { users: Vec<PresenceEntry> },
    #[serde(rename = "room:deleted")]
    RoomDeleted {},
    #[serde(rename = "session:connected")]
    Connected {
        connection_id: Uuid,
        user_id: String,
        role: Role,
    },
    #[serde(rename = "element:draw")]
    DrawElement { element: Element },
    /// In-progress stroke, relayed but never stored.
    #[serde(rename = "element:stroke")]
    DrawingStroke {
        #[serde(default)]
        user_id: String,
        stroke: Element,
    },
    #[serde(rename = "element:delete")]
    DeleteElement { id: Uuid },
    #[serde(rename = "element:update")]
    UpdateElement { id: Uuid, patch: ElementPatch },
    #[serde(rename = "element:sync")]
    SyncState { elements: Vec<Element> },
    #[serde(rename = "element:clear")]
    ClearCanvas {},
    #[serde(rename = "cursor:move")]
    CursorMove {
        #[serde(default)]
        user_id: String,
        x: f64,
        y: f64,
        #[serde(default)]
        color: String,
        #[serde(default)]
        label: String,
    },
    #[serde(rename = "view:viewport")]
    ViewportChange { scale: f64, pan_x: f64, pan_y: f64 },
    #[serde(rename = "view:theme")]
    ThemeChanged { is_dark: bool },
    #[serde(rename = "permission:grant")]
    GrantPermission { user_id: String },
    #[serde(rename = "permission:revoke")]
    RevokePermission { user_id: String },
    /// Targeted at the affected participant's connections only.
    #[serde(rename = "permission:changed")]
    PermissionChanged { allowed: bool },
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("unknown syscall: {0}")]
    UnknownSyscall(String),
    #[error("malformed {syscall} payload: {source}")]
    Malformed {
        syscall: String,
        #[source]
        source: serde_json::Error,
    },
    /// The frame was an error reply from the other side.
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },
}

impl ErrorCode for EventError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownSyscall(_) => "E_UNKNOWN_SYSCALL",
            Self::Malformed { .. } => "E_MALFORMED",
            Self::Rejected { .. } => "E_REJECTED",
        }
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

impl Event {
    /// Wire syscall name.
    #[must_use]
    pub fn syscall(&self) -> &'static str {
        match self {
            Self::Join { .. } | Self::Snapshot(_) => SYSCALL_JOIN,
            Self::Roster { .. } => "room:users",
            Self::RoomDeleted {} => "room:deleted",
            Self::Connected { .. } => "session:connected",
            Self::DrawElement { .. } => "element:draw",
            Self::DrawingStroke { .. } => "element:stroke",
            Self::DeleteElement { .. } => "element:delete",
            Self::UpdateElement { .. } => "element:update",
            Self::SyncState { .. } => "element:sync",
            Self::ClearCanvas {} => "element:clear",
            Self::CursorMove { .. } => "cursor:move",
            Self::ViewportChange { .. } => "view:viewport",
            Self::ThemeChanged { .. } => "view:theme",
            Self::GrantPermission { .. } => "permission:grant",
            Self::RevokePermission { .. } => "permission:revoke",
            Self::PermissionChanged { .. } => "permission:changed",
        }
    }

    /// Events that change (or visibly draw onto) the shared canvas. A
    /// `DrawingStroke` without points only withdraws the sender's transient
    /// stroke.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        match self {
            Self::DrawingStroke { stroke, .. } => !is_stroke_cancel(stroke),
            Self::DrawElement { .. }
            | Self::DeleteElement { .. }
            | Self::UpdateElement { .. }
            | Self::SyncState { .. }
            | Self::ClearCanvas {} => true,
            _ => false,
        }
    }

    /// Events only the room owner may originate.
    #[must_use]
    pub fn is_owner_only(&self) -> bool {
        matches!(
            self,
            Self::SyncState { .. }
                | Self::ClearCanvas {}
                | Self::ViewportChange { .. }
                | Self::ThemeChanged { .. }
                | Self::GrantPermission { .. }
                | Self::RevokePermission { .. }
        )
    }
}

/// True when a transient stroke carries no points, which tells peers to drop
/// whatever in-progress stroke they hold for the sender.
#[must_use]
pub fn is_stroke_cancel(stroke: &Element) -> bool {
    stroke.body.as_stroke().is_none_or(|s| s.points.is_empty())
}

// =============================================================================
// FRAME CONVERSION
// =============================================================================

impl Event {
    /// JSON payload for the frame's `data` field.
    #[must_use]
    pub fn payload(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut tagged)) => tagged.remove("data").unwrap_or_else(|| Value::Object(Map::new())),
            _ => Value::Object(Map::new()),
        }
    }

    /// Wrap as a fresh frame. Snapshots carry status `done`.
    #[must_use]
    pub fn to_frame(&self) -> Frame {
        let mut frame = Frame::request(self.syscall(), self.payload());
        if matches!(self, Self::Snapshot(_)) {
            frame.status = Status::Done;
        }
        frame
    }

    /// Parse a frame into a typed event.
    ///
    /// # Errors
    ///
    /// [`EventError::Rejected`] for error replies, [`EventError::UnknownSyscall`]
    /// for names outside the catalogue, [`EventError::Malformed`] when the
    /// payload does not match the variant.
    pub fn from_frame(frame: &Frame) -> Result<Self, EventError> {
        if frame.status == Status::Error {
            return Err(EventError::Rejected {
                code: frame.data_str(FRAME_CODE).unwrap_or("E_UNKNOWN").to_owned(),
                message: frame.data_str(FRAME_MESSAGE).unwrap_or_default().to_owned(),
            });
        }

        let tag = if frame.syscall == SYSCALL_JOIN && frame.status == Status::Done {
            "room:snapshot"
        } else {
            frame.syscall.as_str()
        };
        if !KNOWN_SYSCALLS.contains(&tag) {
            return Err(EventError::UnknownSyscall(frame.syscall.clone()));
        }

        let data = match &frame.data {
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };
        let mut tagged = Map::new();
        tagged.insert("syscall".into(), Value::String(tag.to_owned()));
        tagged.insert("data".into(), data);

        serde_json::from_value(Value::Object(tagged)).map_err(|source| EventError::Malformed {
            syscall: frame.syscall.clone(),
            source,
        })
    }
}

const KNOWN_SYSCALLS: &[&str] = &[
    "room:join",
    "room:snapshot",
    "room:users",
    "room:deleted",
    "session:connected",
    "element:draw",
    "element:stroke",
    "element:delete",
    "element:update",
    "element:sync",
    "element:clear",
    "cursor:move",
    "view:viewport",
    "view:theme",
    "permission:grant",
    "permission:revoke",
    "permission:changed",
];

#[cfg(test)]
#[path = "event_test.rs"]
mod tests;
