//! Input model: tools, input commands, and the gesture state machine.
//!
//! `InputEvent` is the command form of raw pointer and touch input, carrying
//! client-space coordinates. `InputState` is the single active tool mode,
//! holding whatever in-progress geometry that mode needs. Exactly one variant
//! is active at a time; the engine replaces it wholesale on every transition.
//! `Pinch` tracks the separate two-finger zoom path.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::camera::{Point, distance_units};
use crate::doc::{DrawStyle, ShapeKind, TokenId};

/// Tool a user can arm from the toolbar. Grid visibility is not a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "tool", content = "shape", rename_all = "lowercase")]
pub enum Tool {
    /// No tool armed: pointer input pans the board or drags tokens.
    #[default]
    None,
    /// Single-shot distance measurement.
    Measure,
    /// Single-shot annotation of the given shape.
    Draw(ShapeKind),
}

/// Pixel size of the board container.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Local, unpersisted view settings.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Grid overlay toggle. Orthogonal to the tool mode.
    pub show_grid: bool,
    /// Top-left of the board container in client coordinates.
    pub container_origin: Point,
    /// Container size; grid lines are only produced once this is known.
    pub container_size: Size,
    /// Stroke applied to committed drawings.
    pub style: DrawStyle,
}

/// Progress of an active measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasurePhase {
    AwaitingFirst,
    /// Start recorded; `current` follows the pointer for live feedback.
    AwaitingSecond { start: Point, current: Point },
}

/// A completed measurement between two world points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    pub start: Point,
    pub end: Point,
    /// Distance in game units, rounded.
    pub units: f64,
}

impl Measurement {
    /// Measure between two world points viewed at `zoom`.
    #[must_use]
    pub fn between(start: Point, end: Point, zoom: f64) -> Self {
        let screen_distance = start.distance(end) * zoom;
        Self { start, end, units: distance_units(screen_distance, zoom) }
    }
}

/// The active tool mode.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InputState {
    /// Nothing in progress, no tool armed.
    #[default]
    Idle,
    /// Dragging the board itself.
    PanDragging {
        /// Client-space position of the previous pointer event.
        last_screen: Point,
    },
    /// Dragging a token.
    TokenDragging {
        id: TokenId,
        /// World-space position of the previous pointer event.
        last_world: Point,
    },
    /// Measurement tool armed or mid-gesture.
    Measuring(MeasurePhase),
    /// Shape tool armed (`vertices` empty) or mid-stroke.
    Drawing { shape: ShapeKind, vertices: Vec<Point> },
}

impl InputState {
    /// The toolbar tool this mode corresponds to.
    #[must_use]
    pub fn tool(&self) -> Tool {
        match self {
            Self::Measuring(_) => Tool::Measure,
            Self::Drawing { shape, .. } => Tool::Draw(*shape),
            Self::Idle | Self::PanDragging { .. } | Self::TokenDragging { .. } => Tool::None,
        }
    }

    /// A pointer drag (pan or token) is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self, Self::PanDragging { .. } | Self::TokenDragging { .. })
    }

    /// The token being dragged, if any.
    #[must_use]
    pub fn dragged_token(&self) -> Option<&str> {
        match self {
            Self::TokenDragging { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// Pointer and touch input, in client coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    PointerDown { at: Point },
    PointerMove { at: Point },
    PointerUp { at: Point },
    PointerLeave,
    TouchStart { touches: Vec<Point> },
    TouchMove { touches: Vec<Point> },
    TouchEnd { touches: Vec<Point> },
}

/// Two-finger zoom gesture, sampled at its start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pinch {
    pub initial_distance: f64,
    pub initial_zoom: f64,
}

impl Pinch {
    /// Zoom for the current finger distance, before clamping.
    #[must_use]
    pub fn zoom_for(&self, distance: f64) -> f64 {
        self.initial_zoom * distance / self.initial_distance
    }
}

/// Distance between the first two touches, if there are at least two.
#[must_use]
pub fn touch_distance(touches: &[Point]) -> Option<f64> {
    match touches {
        [a, b, ..] => Some(a.distance(*b)),
        _ => None,
    }
}
