#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

pub use frames::Point;

use crate::consts::{GRID_BASE, GRID_MIN_PX, MAX_SCALE, MIN_SCALE};

/// View transform for the infinite canvas.
///
/// Drawing applies `scale` first, then translates by the world-space pan,
/// so `screen = (world + pan) * scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub pan_x: f64,
    pub pan_y: f64,
    pub scale: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { pan_x: 0.0, pan_y: 0.0, scale: 1.0 }
    }
}

impl Camera {
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: screen.x / self.scale - self.pan_x,
            y: screen.y / self.scale - self.pan_y,
        }
    }

    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: (world.x + self.pan_x) * self.scale,
            y: (world.y + self.pan_y) * self.scale,
        }
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.scale
    }

    /// Multiply the scale by `factor`, keeping the world point under `cursor`
    /// fixed on screen. Returns `false` when clamping left the scale unchanged.
    pub fn zoom_at(&mut self, cursor: Point, factor: f64) -> bool {
        let old = self.scale;
        let new = (old * factor).clamp(MIN_SCALE, MAX_SCALE);
        if (new - old).abs() < f64::EPSILON {
            return false;
        }
        self.pan_x += cursor.x * (1.0 / new - 1.0 / old);
        self.pan_y += cursor.y * (1.0 / new - 1.0 / old);
        self.scale = new;
        true
    }

    /// Pan by a screen-space delta.
    pub fn pan_by_screen(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx / self.scale;
        self.pan_y += dy / self.scale;
    }

    /// Level-of-detail grid spacing in world units.
    #[must_use]
    pub fn grid_spacing(&self) -> f64 {
        let mut spacing = GRID_BASE;
        while spacing * self.scale < GRID_MIN_PX {
            spacing *= 2.0;
        }
        spacing
    }
}
