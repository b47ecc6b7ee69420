//! Pure geometry for element outlines.
//!
//! Everything here produces world-space path commands; `render` replays them
//! onto a `CanvasRenderingContext2d`. Keeping the math out of the renderer
//! lets it be tested without a browser.

#[cfg(test)]
#[path = "path_test.rs"]
mod path_test;

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use frames::element::Shape;
use frames::{ElementKind, Point};

use crate::consts::{STAR_INNER_RATIO, STAR_SPIKES};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCmd {
    MoveTo(Point),
    LineTo(Point),
    QuadTo { ctrl: Point, to: Point },
    Close,
}

fn mid(a: Point, b: Point) -> Point {
    Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// Smoothed stroke path.
///
/// Fewer than three samples draw as straight segments. Otherwise each
/// interior sample becomes a quadratic control point ending at the midpoint
/// to its successor, and a straight tip runs to the latest sample.
#[must_use]
pub fn stroke_path(points: &[Point]) -> Vec<PathCmd> {
    let Some(&first) = points.first() else {
        return Vec::new();
    };
    let mut cmds = vec![PathCmd::MoveTo(first)];
    if points.len() < 3 {
        cmds.extend(points.iter().map(|&p| PathCmd::LineTo(p)));
        return cmds;
    }
    for pair in points[1..].windows(2) {
        cmds.push(PathCmd::QuadTo { ctrl: pair[0], to: mid(pair[0], pair[1]) });
    }
    if let Some(&last) = points.last() {
        cmds.push(PathCmd::LineTo(last));
    }
    cmds
}

/// Closed outline for polygon and star kinds. Rect and circle are drawn
/// with native primitives and return `None`.
#[must_use]
pub fn shape_outline(kind: ElementKind, shape: &Shape) -> Option<Vec<PathCmd>> {
    let center = Point::new(shape.x + shape.width / 2.0, shape.y + shape.height / 2.0);
    let radius = shape.width.abs().min(shape.height.abs()) / 2.0;
    let vertices = match kind {
        ElementKind::Star => star_vertices(center, radius),
        other => regular_polygon(center, radius, other.polygon_sides()?),
    };
    Some(closed(&vertices))
}

/// Vertex-up regular polygon.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn regular_polygon(center: Point, radius: f64, sides: usize) -> Vec<Point> {
    (0..sides)
        .map(|i| {
            let angle = -FRAC_PI_2 + i as f64 * TAU / sides as f64;
            Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
        })
        .collect()
}

/// Alternating outer/inner vertices of a five-point star, first spike up.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn star_vertices(center: Point, outer: f64) -> Vec<Point> {
    let inner = outer * STAR_INNER_RATIO;
    let step = PI / STAR_SPIKES as f64;
    (0..STAR_SPIKES * 2)
        .map(|i| {
            let r = if i % 2 == 0 { outer } else { inner };
            let angle = -FRAC_PI_2 + i as f64 * step;
            Point::new(center.x + r * angle.cos(), center.y + r * angle.sin())
        })
        .collect()
}

/// Circle kind: centered on the drag origin, radius is the drag distance.
#[must_use]
pub fn circle_radius(shape: &Shape) -> f64 {
    shape.width.hypot(shape.height)
}

fn closed(vertices: &[Point]) -> Vec<PathCmd> {
    let mut cmds = Vec::with_capacity(vertices.len() + 1);
    for (i, &v) in vertices.iter().enumerate() {
        cmds.push(if i == 0 { PathCmd::MoveTo(v) } else { PathCmd::LineTo(v) });
    }
    cmds.push(PathCmd::Close);
    cmds
}
