//! Rendering: draws the full canvas scene to a 2D context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! It reads engine state and produces pixels; it never mutates the document.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::engine::Engine::render`]) handles the result.

use std::f64::consts::TAU;

use frames::element::{ImageElement, LineSegment, Shape, Stroke, TextBox};
use frames::{Element, ElementBody, ElementKind};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::camera::{Camera, Point};
use crate::consts::{
    HANDLE_DRAW_PX, HIGHLIGHTER_ALPHA, HIGHLIGHTER_WIDTH_FACTOR, SELECTION_BORDER_PX, STICKY_FILL,
};
use crate::engine::{EngineCore, RemoteCursor};
use crate::hit;
use crate::images::ImageCache;
use crate::layout::{EstimateMeasure, TextMeasure, TextMetrics, text_font_px, wrap_text};
use crate::path::{self, PathCmd};

const SELECTION_COLOR: &str = "#3b82f6";
const UPLOADING_ALPHA: f64 = 0.6;
const GRID_DOT_PX: f64 = 1.5;
const CURSOR_RADIUS_PX: f64 = 4.0;
const CURSOR_FONT_PX: f64 = 12.0;

/// 2D context of `canvas`.
///
/// # Errors
///
/// Returns `Err` if the browser refuses a 2D context.
pub fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, JsValue> {
    canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(JsValue::from)
}

/// Device-pixel size of the backing store for a CSS-pixel viewport.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn backing_size(width_css: f64, height_css: f64, dpr: f64) -> (u32, u32) {
    let w = (width_css * dpr).round().max(0.0);
    let h = (height_css * dpr).round().max(0.0);
    (w as u32, h as u32)
}

/// Text measurement backed by the canvas context.
pub struct CanvasMeasure {
    ctx: CanvasRenderingContext2d,
}

impl CanvasMeasure {
    #[must_use]
    pub fn new(ctx: CanvasRenderingContext2d) -> Self {
        Self { ctx }
    }

    #[must_use]
    pub fn for_canvas(canvas: &HtmlCanvasElement) -> Option<Self> {
        match context_2d(canvas) {
            Ok(ctx) => Some(Self::new(ctx)),
            Err(err) => {
                log::warn!("text measurement falls back to estimates: {err:?}");
                None
            }
        }
    }
}

impl TextMeasure for CanvasMeasure {
    fn width(&self, text: &str, font_px: f64) -> f64 {
        self.ctx.set_font(&font(font_px));
        match self.ctx.measure_text(text) {
            Ok(metrics) => metrics.width(),
            Err(_) => EstimateMeasure::default().width(text, font_px),
        }
    }
}

fn font(px: f64) -> String {
    format!("{px}px sans-serif")
}

/// Draw the full scene: grid, elements, selection, and remote cursors.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn draw(ctx: &CanvasRenderingContext2d, core: &EngineCore, images: &mut ImageCache) -> Result<(), JsValue> {
    let camera = core.camera();
    let measure = CanvasMeasure::new(ctx.clone());

    // Layer 1: clear in device space.
    ctx.set_transform(core.dpr, 0.0, 0.0, core.dpr, 0.0, 0.0)?;
    ctx.clear_rect(0.0, 0.0, core.viewport_width, core.viewport_height);

    // Layer 2: world transform (scale, then translate by pan).
    ctx.scale(camera.scale, camera.scale)?;
    ctx.translate(camera.pan_x, camera.pan_y)?;
    draw_grid(ctx, &camera, core.viewport_width, core.viewport_height, core.session.is_dark);

    // Layer 3: elements in z-order. The one open in the editor is drawn by the overlay.
    for element in core.render_list() {
        if core.ui.editing_id == Some(element.id) {
            continue;
        }
        draw_element(ctx, element, images, &measure)?;
    }

    // Layer 4: selection UI.
    if let Some(selected) = core.selection().and_then(|id| core.element(&id)) {
        draw_selection(ctx, selected, camera.scale);
    }

    for cursor in core.cursors.values() {
        draw_cursor(ctx, cursor, camera.scale)?;
    }
    Ok(())
}

// =============================================================
// Grid
// =============================================================

fn draw_grid(ctx: &CanvasRenderingContext2d, camera: &Camera, width: f64, height: f64, is_dark: bool) {
    let spacing = camera.grid_spacing();
    let start = camera.screen_to_world(Point::new(0.0, 0.0));
    let end = camera.screen_to_world(Point::new(width, height));
    let dot = GRID_DOT_PX / camera.scale;

    ctx.save();
    ctx.set_fill_style_str(if is_dark { "rgba(255, 255, 255, 0.1)" } else { "rgba(0, 0, 0, 0.1)" });
    let mut x = (start.x / spacing).floor() * spacing;
    while x < end.x {
        let mut y = (start.y / spacing).floor() * spacing;
        while y < end.y {
            ctx.fill_rect(x, y, dot, dot);
            y += spacing;
        }
        x += spacing;
    }
    ctx.restore();
}

// =============================================================
// Element dispatch
// =============================================================

fn draw_element(
    ctx: &CanvasRenderingContext2d,
    element: &Element,
    images: &mut ImageCache,
    measure: &CanvasMeasure,
) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_line_cap("round");
    ctx.set_line_join("round");
    let result = match &element.body {
        ElementBody::Pen(s) | ElementBody::Eraser(s) | ElementBody::Highlighter(s) => {
            draw_stroke(ctx, element.kind(), s)
        }
        ElementBody::Line(line) => {
            draw_line(ctx, line);
            Ok(())
        }
        ElementBody::Sticky(note) => draw_sticky(ctx, note, measure),
        ElementBody::Text(block) => draw_text(ctx, block, measure),
        ElementBody::Image(img) => draw_image(ctx, element, img, images),
        body => match body.as_shape() {
            Some(shape) => draw_shape(ctx, element.kind(), shape),
            None => Ok(()),
        },
    };
    ctx.restore();
    result
}

fn replay(ctx: &CanvasRenderingContext2d, cmds: &[PathCmd]) {
    ctx.begin_path();
    for cmd in cmds {
        match *cmd {
            PathCmd::MoveTo(p) => ctx.move_to(p.x, p.y),
            PathCmd::LineTo(p) => ctx.line_to(p.x, p.y),
            PathCmd::QuadTo { ctrl, to } => ctx.quadratic_curve_to(ctrl.x, ctrl.y, to.x, to.y),
            PathCmd::Close => ctx.close_path(),
        }
    }
}

fn draw_stroke(ctx: &CanvasRenderingContext2d, kind: ElementKind, stroke: &Stroke) -> Result<(), JsValue> {
    if stroke.points.is_empty() {
        return Ok(());
    }
    match kind {
        ElementKind::Eraser => {
            ctx.set_global_composite_operation("destination-out")?;
            ctx.set_stroke_style_str("rgba(0,0,0,1)");
            ctx.set_line_width(stroke.stroke_width);
        }
        ElementKind::Highlighter => {
            ctx.set_global_alpha(HIGHLIGHTER_ALPHA);
            ctx.set_stroke_style_str(&stroke.color);
            ctx.set_line_width(stroke.stroke_width * HIGHLIGHTER_WIDTH_FACTOR);
        }
        _ => {
            ctx.set_stroke_style_str(&stroke.color);
            ctx.set_line_width(stroke.stroke_width);
        }
    }
    replay(ctx, &path::stroke_path(&stroke.points));
    ctx.stroke();
    Ok(())
}

fn draw_line(ctx: &CanvasRenderingContext2d, line: &LineSegment) {
    ctx.set_stroke_style_str(&line.color);
    ctx.set_line_width(line.stroke_width);
    ctx.begin_path();
    ctx.move_to(line.x, line.y);
    ctx.line_to(line.end_x, line.end_y);
    ctx.stroke();
}

fn draw_shape(ctx: &CanvasRenderingContext2d, kind: ElementKind, shape: &Shape) -> Result<(), JsValue> {
    ctx.set_stroke_style_str(&shape.color);
    ctx.set_line_width(shape.stroke_width);
    match kind {
        ElementKind::Rect => {
            ctx.stroke_rect(shape.x, shape.y, shape.width, shape.height);
        }
        ElementKind::Circle => {
            ctx.begin_path();
            ctx.arc(shape.x, shape.y, path::circle_radius(shape), 0.0, TAU)?;
            ctx.stroke();
        }
        other => {
            if let Some(cmds) = path::shape_outline(other, shape) {
                replay(ctx, &cmds);
                ctx.stroke();
            }
        }
    }
    Ok(())
}

fn draw_sticky(ctx: &CanvasRenderingContext2d, note: &TextBox, measure: &CanvasMeasure) -> Result<(), JsValue> {
    ctx.set_fill_style_str(STICKY_FILL);
    ctx.set_shadow_color("rgba(0,0,0,0.2)");
    ctx.set_shadow_blur(10.0);
    ctx.fill_rect(note.x, note.y, note.width, note.height);
    ctx.set_shadow_blur(0.0);

    let metrics = TextMetrics::sticky(note);
    let layout = wrap_text(measure, &note.text, metrics);
    ctx.set_fill_style_str(&note.color);
    fill_lines(ctx, &layout.lines, note.x + metrics.pad_x, note.y + metrics.pad_y, metrics)
}

fn draw_text(ctx: &CanvasRenderingContext2d, block: &TextBox, measure: &CanvasMeasure) -> Result<(), JsValue> {
    let metrics = TextMetrics::text(block);
    let lines = if block.fixed_width {
        wrap_text(measure, &block.text, metrics).lines
    } else {
        block.text.split('\n').map(str::to_owned).collect()
    };
    ctx.set_fill_style_str(&block.color);
    fill_lines(ctx, &lines, block.x, block.y, metrics)
}

fn fill_lines(
    ctx: &CanvasRenderingContext2d,
    lines: &[String],
    x: f64,
    top: f64,
    metrics: TextMetrics,
) -> Result<(), JsValue> {
    ctx.set_font(&font(metrics.font_px));
    ctx.set_text_baseline("top");
    let mut y = top;
    for line in lines {
        ctx.fill_text(line, x, y)?;
        y += metrics.line_height;
    }
    Ok(())
}

fn draw_image(
    ctx: &CanvasRenderingContext2d,
    element: &Element,
    img: &ImageElement,
    images: &mut ImageCache,
) -> Result<(), JsValue> {
    let Some(decoded) = images.get(element.id, &img.src) else {
        return Ok(());
    };
    if img.uploading {
        ctx.set_global_alpha(UPLOADING_ALPHA);
    }
    ctx.draw_image_with_html_image_element_and_dw_and_dh(decoded, img.x, img.y, img.width, img.height)
}

// =============================================================
// Overlays
// =============================================================

fn draw_selection(ctx: &CanvasRenderingContext2d, element: &Element, scale: f64) {
    let (Some((w, h)), Some(corner)) = (element.size(), hit::handle_corner(element)) else {
        return;
    };
    let origin = element.origin();
    let handle = HANDLE_DRAW_PX / scale;

    ctx.save();
    ctx.set_stroke_style_str(SELECTION_COLOR);
    ctx.set_line_width(SELECTION_BORDER_PX / scale);
    ctx.stroke_rect(origin.x, origin.y, w, h);
    ctx.set_fill_style_str(SELECTION_COLOR);
    ctx.fill_rect(corner.x - handle / 2.0, corner.y - handle / 2.0, handle, handle);
    ctx.restore();
}

fn draw_cursor(ctx: &CanvasRenderingContext2d, cursor: &RemoteCursor, scale: f64) -> Result<(), JsValue> {
    let Point { x, y } = cursor.position;
    let radius = CURSOR_RADIUS_PX / scale;

    ctx.save();
    ctx.set_fill_style_str(&cursor.color);
    ctx.begin_path();
    ctx.arc(x, y, radius, 0.0, TAU)?;
    ctx.fill();
    if !cursor.label.is_empty() {
        ctx.set_font(&font(CURSOR_FONT_PX / scale));
        ctx.set_text_baseline("top");
        ctx.fill_text(&cursor.label, x + radius * 2.0, y + radius)?;
    }
    ctx.restore();
    Ok(())
}
