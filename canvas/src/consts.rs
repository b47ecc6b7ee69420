//! Shared numeric constants for the canvas crate.

// ── View ────────────────────────────────────────────────────────

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 5.0;

/// Multiplicative zoom step per wheel notch.
pub const ZOOM_STEP: f64 = 1.1;

/// Base grid cell in world units; doubled until it spans `GRID_MIN_PX` on screen.
pub const GRID_BASE: f64 = 40.0;
pub const GRID_MIN_PX: f64 = 20.0;

// ── Hit-testing ─────────────────────────────────────────────────

/// Drawn size of the resize handle, in screen pixels.
pub const HANDLE_DRAW_PX: f64 = 12.0;

/// Resize handle hit box, in screen pixels.
pub const HANDLE_HIT_PX: f64 = 20.0;

/// Selection border width, in screen pixels.
pub const SELECTION_BORDER_PX: f64 = 2.0;

/// World-space slop around box elements when hit-testing.
pub const HIT_SLOP: f64 = 10.0;

/// Boxes narrower than this still hit-test as this wide.
pub const HIT_MIN_EXTENT: f64 = 20.0;

// ── Placement ───────────────────────────────────────────────────

/// New sticky note size in screen pixels; divided by scale at placement.
pub const STICKY_SIZE_PX: f64 = 200.0;

/// Longer side of a freshly placed image in screen pixels.
pub const IMAGE_SIZE_PX: f64 = 300.0;

/// Initial width of a new text block in screen pixels.
pub const TEXT_WIDTH_PX: f64 = 200.0;

pub const TEXT_MIN_WIDTH: f64 = 20.0;

pub const STICKY_FILL: &str = "#fef08a";
pub const STICKY_INK: &str = "#000000";
pub const STICKY_PLACEHOLDER: &str = "Double click to edit...";

// ── Strokes ─────────────────────────────────────────────────────

pub const HIGHLIGHTER_ALPHA: f64 = 0.4;
pub const HIGHLIGHTER_WIDTH_FACTOR: f64 = 3.0;

/// Minimum spacing of in-progress stroke emissions.
pub const STROKE_EMIT_INTERVAL_MS: f64 = 16.0;

/// In-progress strokes are emitted on every Nth accumulated point.
pub const STROKE_EMIT_EVERY: usize = 3;

// ── Shapes ──────────────────────────────────────────────────────

pub const STAR_SPIKES: usize = 5;

/// Inner-to-outer radius ratio for the star.
pub const STAR_INNER_RATIO: f64 = 0.5;

// ── Sticky layout (fractions of the note box) ──────────────────

pub const STICKY_FONT_RATIO: f64 = 0.10;
pub const STICKY_PAD_X_RATIO: f64 = 0.05;
pub const STICKY_PAD_Y_RATIO: f64 = 0.15;
pub const LINE_HEIGHT_RATIO: f64 = 1.2;
