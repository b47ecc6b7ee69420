//! Input model: tools, modifier keys, mouse buttons, and the gesture state machine.
//!
//! `Tool` and `Modifiers` capture the user's intent at the time of a pointer
//! event. `InputState` is the active gesture tracked between pointer-down and
//! pointer-up, carrying what is needed to commit or record it on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use frames::{Element, ElementKind};
use uuid::Uuid;

use crate::camera::Point;

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Select,
    Pen,
    Eraser,
    Highlighter,
    Rect,
    Circle,
    Line,
    Triangle,
    Pentagon,
    Hexagon,
    Octagon,
    Star,
    Sticky,
    Text,
}

impl Tool {
    /// Element kind produced by a drag with this tool, if it draws.
    #[must_use]
    pub fn draws(self) -> Option<ElementKind> {
        match self {
            Self::Pen => Some(ElementKind::Pen),
            Self::Eraser => Some(ElementKind::Eraser),
            Self::Highlighter => Some(ElementKind::Highlighter),
            Self::Rect => Some(ElementKind::Rect),
            Self::Circle => Some(ElementKind::Circle),
            Self::Line => Some(ElementKind::Line),
            Self::Triangle => Some(ElementKind::Triangle),
            Self::Pentagon => Some(ElementKind::Pentagon),
            Self::Hexagon => Some(ElementKind::Hexagon),
            Self::Octagon => Some(ElementKind::Octagon),
            Self::Star => Some(ElementKind::Star),
            Self::Select | Self::Sticky | Self::Text => None,
        }
    }

    /// Parse a toolbar name (`"pen"`, `"sticky"`, ...).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "select" => Self::Select,
            "pen" => Self::Pen,
            "eraser" => Self::Eraser,
            "highlighter" => Self::Highlighter,
            "rect" => Self::Rect,
            "circle" => Self::Circle,
            "line" => Self::Line,
            "triangle" => Self::Triangle,
            "pentagon" => Self::Pentagon,
            "hexagon" => Self::Hexagon,
            "octagon" => Self::Octagon,
            "star" => Self::Star,
            "sticky" => Self::Sticky,
            "text" => Self::Text,
            _ => return None,
        })
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Pen => "pen",
            Self::Eraser => "eraser",
            Self::Highlighter => "highlighter",
            Self::Rect => "rect",
            Self::Circle => "circle",
            Self::Line => "line",
            Self::Triangle => "triangle",
            Self::Pentagon => "pentagon",
            Self::Hexagon => "hexagon",
            Self::Octagon => "octagon",
            Self::Star => "star",
            Self::Sticky => "sticky",
            Self::Text => "text",
        }
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Meta / Command key.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Command on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Middle,
    Secondary,
}

/// A keyboard key as reported by the browser (e.g. `"z"`, `"Escape"`, `" "`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

/// Wheel / trackpad scroll delta in screen pixels.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    pub dx: f64,
    /// Positive = down.
    pub dy: f64,
}

/// Drawing style applied to new elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Brush {
    pub color: String,
    /// Nominal width in screen pixels.
    pub size: f64,
}

impl Default for Brush {
    fn default() -> Self {
        Self { color: frames::element::DEFAULT_COLOR.to_owned(), size: frames::element::DEFAULT_STROKE_WIDTH }
    }
}

/// Persistent UI state visible to the renderer.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub tool: Tool,
    pub brush: Brush,
    pub selected_id: Option<Uuid>,
    /// Space bar held: primary drags pan.
    pub space_held: bool,
    /// Element currently open in the text editor overlay.
    pub editing_id: Option<Uuid>,
}

/// Active gesture between pointer-down and pointer-up.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    #[default]
    Idle,
    /// Accumulating a new stroke or shape.
    Drawing {
        /// Uncommitted element, drawn in place but not yet in the store.
        element: Element,
        /// World-space pointer-down position.
        anchor: Point,
        /// Time of the last in-progress stroke emission.
        last_emit_ms: f64,
    },
    Moving {
        id: Uuid,
        /// Pointer position minus element origin at pointer-down.
        grab: Point,
        before: Element,
    },
    Resizing {
        id: Uuid,
        before: Element,
    },
    Panning {
        start_screen: Point,
        initial_pan: Point,
    },
}

impl InputState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// The uncommitted element being drawn, if any.
    #[must_use]
    pub fn in_progress(&self) -> Option<&Element> {
        match self {
            Self::Drawing { element, .. } => Some(element),
            _ => None,
        }
    }
}
