//! Element model: one tagged variant per drawable kind.
//!
//! Elements serialize as flat camelCase JSON objects with a `"type"` tag, the
//! shape persisted rooms already hold. Deserialization is lenient about older
//! records: missing or `null` fields default, `size` is accepted for
//! `strokeWidth`, `isFixedWidth` for `fixedWidth`, and ids that are not
//! UUIDs map to a stable UUID through [`legacy_id`].

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const DEFAULT_COLOR: &str = "#000000";
pub const DEFAULT_STROKE_WIDTH: f64 = 5.0;

/// Font scale for text elements: font size is `strokeWidth * TEXT_FONT_FACTOR`.
pub const TEXT_FONT_FACTOR: f64 = 5.0;

// =============================================================================
// TYPES
// =============================================================================

/// A point in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    #[serde(default, deserialize_with = "null_default")]
    pub x: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Discriminant of [`ElementBody`], also used by tools to name what they draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
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
    Image,
}

impl ElementKind {
    #[must_use]
    pub fn is_stroke(self) -> bool {
        matches!(self, Self::Pen | Self::Eraser | Self::Highlighter)
    }

    #[must_use]
    pub fn is_shape(self) -> bool {
        matches!(
            self,
            Self::Rect | Self::Circle | Self::Triangle | Self::Pentagon | Self::Hexagon | Self::Octagon | Self::Star
        )
    }

    /// Side count for regular polygon kinds.
    #[must_use]
    pub fn polygon_sides(self) -> Option<usize> {
        match self {
            Self::Triangle => Some(3),
            Self::Pentagon => Some(5),
            Self::Hexagon => Some(6),
            Self::Octagon => Some(8),
            _ => None,
        }
    }
}

/// Freehand point sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    #[serde(default = "default_color", deserialize_with = "null_color")]
    pub color: String,
    #[serde(default = "default_stroke_width", alias = "size", deserialize_with = "null_stroke_width")]
    pub stroke_width: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub points: Vec<Point>,
}

/// Box-anchored outline shape. `width`/`height` may be negative mid-drag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    #[serde(default, deserialize_with = "null_default")]
    pub x: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub y: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub width: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub height: f64,
    #[serde(default = "default_color", deserialize_with = "null_color")]
    pub color: String,
    #[serde(default = "default_stroke_width", alias = "size", deserialize_with = "null_stroke_width")]
    pub stroke_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSegment {
    #[serde(default, deserialize_with = "null_default")]
    pub x: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub y: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub end_x: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub end_y: f64,
    #[serde(default = "default_color", deserialize_with = "null_color")]
    pub color: String,
    #[serde(default = "default_stroke_width", alias = "size", deserialize_with = "null_stroke_width")]
    pub stroke_width: f64,
}

/// Sticky note or free text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBox {
    #[serde(default, deserialize_with = "null_default")]
    pub x: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub y: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub width: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub height: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub text: String,
    #[serde(default, alias = "isFixedWidth", deserialize_with = "null_default")]
    pub fixed_width: bool,
    #[serde(default = "default_color", deserialize_with = "null_color")]
    pub color: String,
    #[serde(default = "default_stroke_width", alias = "size", deserialize_with = "null_stroke_width")]
    pub stroke_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageElement {
    #[serde(default, deserialize_with = "null_default")]
    pub x: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub y: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub width: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub height: f64,
    /// Data URL while uploading, durable URL afterwards.
    #[serde(default, rename = "dataURL", deserialize_with = "null_default")]
    pub src: String,
    #[serde(default = "default_aspect_ratio", deserialize_with = "null_aspect_ratio")]
    pub aspect_ratio: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub uploading: bool,
}

/// Kind-specific fields. The `type` tag fully determines the field set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementBody {
    Pen(Stroke),
    Eraser(Stroke),
    Highlighter(Stroke),
    Rect(Shape),
    Circle(Shape),
    Triangle(Shape),
    Pentagon(Shape),
    Hexagon(Shape),
    Octagon(Shape),
    Star(Shape),
    Line(LineSegment),
    Sticky(TextBox),
    Text(TextBox),
    Image(ImageElement),
}

/// One persisted visual object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(deserialize_with = "lenient_id")]
    pub id: Uuid,
    /// Creation instant in ms; primary z-order key. Legacy records without
    /// one render first.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: i64,
    #[serde(flatten)]
    pub body: ElementBody,
}

/// Field-merge update carried by `element:update`. Fields that do not apply
/// to the target's kind are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "size")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "isFixedWidth")]
    pub fixed_width: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "dataURL")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploading: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Normalized axis-aligned bounds in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Build from a possibly negative-extent box.
    #[must_use]
    pub fn normalized(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x: if width < 0.0 { x + width } else { x },
            y: if height < 0.0 { y + height } else { y },
            width: width.abs(),
            height: height.abs(),
        }
    }

    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

// =============================================================================
// DEFAULTS
// =============================================================================

fn default_color() -> String {
    DEFAULT_COLOR.to_owned()
}

fn default_stroke_width() -> f64 {
    DEFAULT_STROKE_WIDTH
}

fn default_aspect_ratio() -> f64 {
    1.0
}

/// Stable UUID for a persisted id that is not a UUID.
#[must_use]
pub fn legacy_id(raw: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, raw.as_bytes())
}

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_color<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_color))
}

fn null_stroke_width<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(DEFAULT_STROKE_WIDTH))
}

fn null_aspect_ratio<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_else(default_aspect_ratio))
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Uuid, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(raw) => Ok(Uuid::parse_str(&raw).unwrap_or_else(|_| legacy_id(&raw))),
        Value::Number(n) => Ok(legacy_id(&n.to_string())),
        other => Err(D::Error::custom(format!("element id must be a string, got {other}"))),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        _ => 0,
    })
}

// =============================================================================
// ACCESSORS
// =============================================================================

impl ElementBody {
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Pen(_) => ElementKind::Pen,
            Self::Eraser(_) => ElementKind::Eraser,
            Self::Highlighter(_) => ElementKind::Highlighter,
            Self::Rect(_) => ElementKind::Rect,
            Self::Circle(_) => ElementKind::Circle,
            Self::Triangle(_) => ElementKind::Triangle,
            Self::Pentagon(_) => ElementKind::Pentagon,
            Self::Hexagon(_) => ElementKind::Hexagon,
            Self::Octagon(_) => ElementKind::Octagon,
            Self::Star(_) => ElementKind::Star,
            Self::Line(_) => ElementKind::Line,
            Self::Sticky(_) => ElementKind::Sticky,
            Self::Text(_) => ElementKind::Text,
            Self::Image(_) => ElementKind::Image,
        }
    }

    /// Wrap a stroke in the variant matching `kind`. Non-stroke kinds fall back to pen.
    #[must_use]
    pub fn stroke(kind: ElementKind, stroke: Stroke) -> Self {
        match kind {
            ElementKind::Eraser => Self::Eraser(stroke),
            ElementKind::Highlighter => Self::Highlighter(stroke),
            _ => Self::Pen(stroke),
        }
    }

    /// Wrap a shape in the variant matching `kind`. Non-shape kinds fall back to rect.
    #[must_use]
    pub fn shape(kind: ElementKind, shape: Shape) -> Self {
        match kind {
            ElementKind::Circle => Self::Circle(shape),
            ElementKind::Triangle => Self::Triangle(shape),
            ElementKind::Pentagon => Self::Pentagon(shape),
            ElementKind::Hexagon => Self::Hexagon(shape),
            ElementKind::Octagon => Self::Octagon(shape),
            ElementKind::Star => Self::Star(shape),
            _ => Self::Rect(shape),
        }
    }

    #[must_use]
    pub fn as_stroke(&self) -> Option<&Stroke> {
        match self {
            Self::Pen(s) | Self::Eraser(s) | Self::Highlighter(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_stroke_mut(&mut self) -> Option<&mut Stroke> {
        match self {
            Self::Pen(s) | Self::Eraser(s) | Self::Highlighter(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_shape(&self) -> Option<&Shape> {
        match self {
            Self::Rect(s)
            | Self::Circle(s)
            | Self::Triangle(s)
            | Self::Pentagon(s)
            | Self::Hexagon(s)
            | Self::Octagon(s)
            | Self::Star(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_shape_mut(&mut self) -> Option<&mut Shape> {
        match self {
            Self::Rect(s)
            | Self::Circle(s)
            | Self::Triangle(s)
            | Self::Pentagon(s)
            | Self::Hexagon(s)
            | Self::Octagon(s)
            | Self::Star(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&TextBox> {
        match self {
            Self::Sticky(t) | Self::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextBox> {
        match self {
            Self::Sticky(t) | Self::Text(t) => Some(t),
            _ => None,
        }
    }
}

impl Element {
    #[must_use]
    pub fn new(id: Uuid, timestamp: i64, body: ElementBody) -> Self {
        Self { id, timestamp, body }
    }

    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.body.kind()
    }

    /// Top-left anchor of box-like elements, first point of strokes.
    #[must_use]
    pub fn origin(&self) -> Point {
        match &self.body {
            ElementBody::Pen(s) | ElementBody::Eraser(s) | ElementBody::Highlighter(s) => {
                s.points.first().copied().unwrap_or_default()
            }
            ElementBody::Line(l) => Point::new(l.x, l.y),
            ElementBody::Sticky(t) | ElementBody::Text(t) => Point::new(t.x, t.y),
            ElementBody::Image(i) => Point::new(i.x, i.y),
            other => other
                .as_shape()
                .map_or_else(Point::default, |s| Point::new(s.x, s.y)),
        }
    }

    /// Raw `(width, height)` for box-like elements; `None` for strokes and lines.
    #[must_use]
    pub fn size(&self) -> Option<(f64, f64)> {
        match &self.body {
            ElementBody::Sticky(t) | ElementBody::Text(t) => Some((t.width, t.height)),
            ElementBody::Image(i) => Some((i.width, i.height)),
            other => other.as_shape().map(|s| (s.width, s.height)),
        }
    }

    /// Normalized bounding box.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        match &self.body {
            ElementBody::Pen(s) | ElementBody::Eraser(s) | ElementBody::Highlighter(s) => {
                points_bounds(&s.points)
            }
            ElementBody::Line(l) => Bounds::normalized(l.x, l.y, l.end_x - l.x, l.end_y - l.y),
            ElementBody::Circle(s) => {
                let r = s.width.hypot(s.height);
                Bounds::normalized(s.x - r, s.y - r, 2.0 * r, 2.0 * r)
            }
            _ => {
                let origin = self.origin();
                let (w, h) = self.size().unwrap_or((0.0, 0.0));
                Bounds::normalized(origin.x, origin.y, w, h)
            }
        }
    }

    /// A committed element must have some extent. Texts and images are always kept.
    #[must_use]
    pub fn has_extent(&self) -> bool {
        match &self.body {
            ElementBody::Pen(s) | ElementBody::Eraser(s) | ElementBody::Highlighter(s) => !s.points.is_empty(),
            ElementBody::Line(l) => l.end_x != l.x || l.end_y != l.y,
            ElementBody::Sticky(_) | ElementBody::Text(_) | ElementBody::Image(_) => true,
            other => other.as_shape().is_some_and(|s| s.width != 0.0 || s.height != 0.0),
        }
    }

    /// Translate so the origin lands on `to`.
    pub fn move_to(&mut self, to: Point) {
        let from = self.origin();
        let (dx, dy) = (to.x - from.x, to.y - from.y);
        match &mut self.body {
            ElementBody::Pen(s) | ElementBody::Eraser(s) | ElementBody::Highlighter(s) => {
                for p in &mut s.points {
                    p.x += dx;
                    p.y += dy;
                }
            }
            ElementBody::Line(l) => {
                l.x += dx;
                l.y += dy;
                l.end_x += dx;
                l.end_y += dy;
            }
            ElementBody::Sticky(t) | ElementBody::Text(t) => {
                t.x = to.x;
                t.y = to.y;
            }
            ElementBody::Image(i) => {
                i.x = to.x;
                i.y = to.y;
            }
            other => {
                if let Some(s) = other.as_shape_mut() {
                    s.x = to.x;
                    s.y = to.y;
                }
            }
        }
    }

    /// Set raw `(width, height)` on box-like elements. Returns false for kinds without a box.
    pub fn set_size(&mut self, width: f64, height: f64) -> bool {
        match &mut self.body {
            ElementBody::Sticky(t) | ElementBody::Text(t) => {
                t.width = width;
                t.height = height;
                true
            }
            ElementBody::Image(i) => {
                i.width = width;
                i.height = height;
                true
            }
            other => other.as_shape_mut().is_some_and(|s| {
                s.width = width;
                s.height = height;
                true
            }),
        }
    }

    /// Merge the patch fields that apply to this element's kind.
    pub fn apply_patch(&mut self, patch: &ElementPatch) {
        if let Some(ts) = patch.timestamp {
            self.timestamp = ts;
        }
        match &mut self.body {
            ElementBody::Pen(s) | ElementBody::Eraser(s) | ElementBody::Highlighter(s) => {
                set(&mut s.color, patch.color.as_ref());
                set(&mut s.stroke_width, patch.stroke_width.as_ref());
                set(&mut s.points, patch.points.as_ref());
            }
            ElementBody::Line(l) => {
                set(&mut l.x, patch.x.as_ref());
                set(&mut l.y, patch.y.as_ref());
                set(&mut l.end_x, patch.end_x.as_ref());
                set(&mut l.end_y, patch.end_y.as_ref());
                set(&mut l.color, patch.color.as_ref());
                set(&mut l.stroke_width, patch.stroke_width.as_ref());
            }
            ElementBody::Sticky(t) | ElementBody::Text(t) => {
                set(&mut t.x, patch.x.as_ref());
                set(&mut t.y, patch.y.as_ref());
                set(&mut t.width, patch.width.as_ref());
                set(&mut t.height, patch.height.as_ref());
                set(&mut t.text, patch.text.as_ref());
                set(&mut t.fixed_width, patch.fixed_width.as_ref());
                set(&mut t.color, patch.color.as_ref());
                set(&mut t.stroke_width, patch.stroke_width.as_ref());
            }
            ElementBody::Image(i) => {
                set(&mut i.x, patch.x.as_ref());
                set(&mut i.y, patch.y.as_ref());
                set(&mut i.width, patch.width.as_ref());
                set(&mut i.height, patch.height.as_ref());
                set(&mut i.src, patch.src.as_ref());
                set(&mut i.aspect_ratio, patch.aspect_ratio.as_ref());
                set(&mut i.uploading, patch.uploading.as_ref());
            }
            other => {
                if let Some(s) = other.as_shape_mut() {
                    set(&mut s.x, patch.x.as_ref());
                    set(&mut s.y, patch.y.as_ref());
                    set(&mut s.width, patch.width.as_ref());
                    set(&mut s.height, patch.height.as_ref());
                    set(&mut s.color, patch.color.as_ref());
                    set(&mut s.stroke_width, patch.stroke_width.as_ref());
                }
            }
        }
    }
}

fn set<T: Clone>(slot: &mut T, value: Option<&T>) {
    if let Some(v) = value {
        slot.clone_from(v);
    }
}

fn points_bounds(points: &[Point]) -> Bounds {
    let Some(first) = points.first() else {
        return Bounds::normalized(0.0, 0.0, 0.0, 0.0);
    };
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Bounds::normalized(min_x, min_y, max_x - min_x, max_y - min_y)
}

#[cfg(test)]
#[path = "element_test.rs"]
mod tests;
