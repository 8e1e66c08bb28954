//! Shared numeric constants for the board engine.

// ── Viewport ────────────────────────────────────────────────────

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.5;

/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 3.0;

/// Zoom factor after a view reset.
pub const DEFAULT_ZOOM: f64 = 1.0;

/// Increment applied by a single zoom-in / zoom-out action.
pub const ZOOM_STEP: f64 = 0.25;

/// Inter-finger distance below which a pinch cannot be sampled, in pixels.
pub const MIN_PINCH_DISTANCE_PX: f64 = 1.0;

// ── Measurement ─────────────────────────────────────────────────

/// Screen pixels per game unit at zoom 1.0.
pub const PIXELS_PER_UNIT: f64 = 5.0;

// ── Tokens ──────────────────────────────────────────────────────

/// Radius of a token when the caller does not choose one, in world units.
pub const DEFAULT_TOKEN_RADIUS: f64 = 20.0;

/// Colours handed out to tokens added without an image.
pub const TOKEN_PALETTE: [&str; 8] =
    ["#D94B4B", "#4B7BD9", "#4BD98A", "#D9B84B", "#9B4BD9", "#4BC9D9", "#D97B4B", "#7B8A99"];

// ── Annotations ─────────────────────────────────────────────────

/// Stroke colour of new drawings.
pub const DEFAULT_STROKE_COLOR: &str = "#FF0000";

/// Stroke width of new drawings, in world units.
pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;

// ── Grid ────────────────────────────────────────────────────────

/// Distance between grid lines in world units.
pub const GRID_SPACING: f64 = 50.0;

// ── Container ───────────────────────────────────────────────────

/// Largest accepted container width or height, in pixels. Also bounds the
/// number of grid lines a projection can produce.
pub const MAX_CONTAINER_PX: f64 = 32_768.0;

// ── Persistence ─────────────────────────────────────────────────

/// Quiet period after the last local mutation before the board is written.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// Shortest configurable quiet period.
pub const MIN_DEBOUNCE_MS: u64 = 100;
