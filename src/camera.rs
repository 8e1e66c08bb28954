//! Coordinate transform between screen space and board (world) space.
//!
//! Every pointer event passes through [`Viewport::screen_to_world`], so the
//! functions here are pure, `Copy`-only and allocation free.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM, PIXELS_PER_UNIT, ZOOM_STEP};

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Component-wise `self - other`.
    #[must_use]
    pub fn delta(self, other: Self) -> Self {
        Self { x: self.x - other.x, y: self.y - other.y }
    }

    /// Component-wise `self + other`.
    #[must_use]
    pub fn offset(self, by: Self) -> Self {
        Self { x: self.x + by.x, y: self.y + by.y }
    }

    /// Both coordinates are finite (no NaN, no infinity).
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Pan/zoom state of the board view.
///
/// `pan` is in screen pixels relative to the container origin.
/// `zoom` is a scale factor kept within [`MIN_ZOOM`, `MAX_ZOOM`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub zoom: f64,
    pub pan: Point,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { zoom: DEFAULT_ZOOM, pan: Point::ORIGIN }
    }
}

impl Viewport {
    /// Convert a client-space point to world coordinates.
    ///
    /// `origin` is the top-left of the board container in client space.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point, origin: Point) -> Point {
        Point {
            x: (screen.x - origin.x - self.pan.x) / self.zoom,
            y: (screen.y - origin.y - self.pan.y) / self.zoom,
        }
    }

    /// Convert a world point to client-space coordinates. Inverse of
    /// [`Viewport::screen_to_world`].
    #[must_use]
    pub fn world_to_screen(&self, world: Point, origin: Point) -> Point {
        Point {
            x: world.x * self.zoom + self.pan.x + origin.x,
            y: world.y * self.zoom + self.pan.y + origin.y,
        }
    }

    /// Convert a screen-space displacement to a world-space displacement.
    #[must_use]
    pub fn screen_delta_to_world(&self, delta: Point) -> Point {
        Point { x: delta.x / self.zoom, y: delta.y / self.zoom }
    }

    /// Same viewport with `zoom` clamped into range. A non-finite zoom keeps
    /// the current value.
    #[must_use]
    pub fn with_zoom(self, zoom: f64) -> Self {
        if !zoom.is_finite() {
            return self;
        }
        Self { zoom: clamp_zoom(zoom), ..self }
    }

    /// Same viewport with a new pan. A non-finite pan keeps the current value.
    #[must_use]
    pub fn with_pan(self, pan: Point) -> Self {
        if !pan.is_finite() {
            return self;
        }
        Self { pan, ..self }
    }

    #[must_use]
    pub fn zoomed_in(self) -> Self {
        self.with_zoom(self.zoom + ZOOM_STEP)
    }

    #[must_use]
    pub fn zoomed_out(self) -> Self {
        self.with_zoom(self.zoom - ZOOM_STEP)
    }

    /// Default zoom, no pan.
    #[must_use]
    pub fn reset() -> Self {
        Self::default()
    }

    /// Sanitize a viewport received from outside: clamp zoom, drop non-finite
    /// values in favour of `fallback`.
    #[must_use]
    pub fn sanitized(self, fallback: Self) -> Self {
        fallback.with_zoom(self.zoom).with_pan(self.pan)
    }
}

/// Clamp a zoom factor into [`MIN_ZOOM`, `MAX_ZOOM`].
#[must_use]
pub fn clamp_zoom(zoom: f64) -> f64 {
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Convert a screen-space distance to game units at the given zoom.
///
/// The result does not depend on zoom for a fixed pair of world points.
#[must_use]
pub fn distance_units(screen_distance: f64, zoom: f64) -> f64 {
    (screen_distance / zoom / PIXELS_PER_UNIT).round()
}
