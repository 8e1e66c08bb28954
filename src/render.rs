//! Render projection: derives screen-space primitives from board state.
//!
//! This module owns no state. It reads the board model, the local view
//! settings and the active tool mode, and produces a [`Scene`] in
//! container-local screen coordinates (client coordinates minus the container
//! origin). Hidden layers are left out of the scene entirely. Uncommitted
//! geometry (the drawing being stroked, the measurement being taken) is
//! emitted separately from committed data so a host can style it distinctly.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use serde::Serialize;

use crate::camera::{Point, Viewport};
use crate::consts::{GRID_SPACING, MAX_CONTAINER_PX};
use crate::doc::{BoardModel, DrawingId, Shape, TokenId, TokenKind, TokenVisual};
use crate::input::{InputState, MeasurePhase, Measurement, Size, UiState};

/// Everything a host needs to draw one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scene {
    pub background: Option<Background>,
    pub tokens: Vec<TokenSprite>,
    pub drawings: Vec<PathSprite>,
    /// The drawing currently being stroked.
    pub draft: Option<PathSprite>,
    pub grid: Vec<GridLine>,
    /// Live measurement between the first click and the pointer.
    pub measurement: Option<MeasurementOverlay>,
}

/// Board image placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Background {
    pub url: String,
    /// Screen position of the world origin (the image's top-left).
    pub origin: Point,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenSprite {
    pub id: TokenId,
    pub center: Point,
    /// Radius in screen pixels.
    pub radius: f64,
    pub label: String,
    pub visual: TokenVisual,
    pub kind: TokenKind,
}

/// An annotation as SVG path data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathSprite {
    /// `None` for the uncommitted draft.
    pub id: Option<DrawingId>,
    pub d: String,
    pub color: String,
    /// Stroke width in screen pixels.
    pub stroke_width: f64,
    pub committed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridLine {
    pub from: Point,
    pub to: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeasurementOverlay {
    pub start: Point,
    pub end: Point,
    pub units: f64,
}

/// Project the board into screen space.
#[must_use]
pub fn project(board: &BoardModel, ui: &UiState, input: &InputState) -> Scene {
    let viewport = board.viewport();
    let layers = board.layers();
    let to_screen = |p: Point| viewport.world_to_screen(p, Point::ORIGIN);

    let background = match board.image_reference() {
        Some(url) if layers.background => Some(Background {
            url: url.to_owned(),
            origin: to_screen(Point::ORIGIN),
            scale: viewport.zoom,
        }),
        _ => None,
    };

    let tokens = if layers.tokens {
        board
            .tokens()
            .iter()
            .map(|t| TokenSprite {
                id: t.id.clone(),
                center: to_screen(t.position),
                radius: t.radius * viewport.zoom,
                label: t.display_name.clone(),
                visual: t.visual.clone(),
                kind: t.kind,
            })
            .collect()
    } else {
        Vec::new()
    };

    let drawings = if layers.annotations {
        board
            .drawings()
            .iter()
            .map(|d| PathSprite {
                id: Some(d.id.clone()),
                d: path_data(&d.shape, &viewport),
                color: d.color.clone(),
                stroke_width: d.stroke_width * viewport.zoom,
                committed: true,
            })
            .collect()
    } else {
        Vec::new()
    };

    let draft = match input {
        InputState::Drawing { shape, vertices } => Shape::from_vertices(*shape, vertices).map(|s| PathSprite {
            id: None,
            d: path_data(&s, &viewport),
            color: ui.style.color.clone(),
            stroke_width: ui.style.stroke_width * viewport.zoom,
            committed: false,
        }),
        _ => None,
    };

    let measurement = match input {
        InputState::Measuring(MeasurePhase::AwaitingSecond { start, current }) => Some(MeasurementOverlay {
            start: to_screen(*start),
            end: to_screen(*current),
            units: Measurement::between(*start, *current, viewport.zoom).units,
        }),
        _ => None,
    };

    let grid = if ui.show_grid { grid_lines(&viewport, ui.container_size) } else { Vec::new() };

    Scene { background, tokens, drawings, draft, grid, measurement }
}

/// SVG path data for a shape, in screen coordinates.
#[must_use]
pub fn path_data(shape: &Shape, viewport: &Viewport) -> String {
    let s = |p: Point| viewport.world_to_screen(p, Point::ORIGIN);
    match shape {
        Shape::Line { points } => points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let p = s(*p);
                let cmd = if i == 0 { 'M' } else { 'L' };
                format!("{cmd} {} {}", num(p.x), num(p.y))
            })
            .collect::<Vec<_>>()
            .join(" "),
        Shape::Circle { center, rim } => {
            let c = s(*center);
            let r = center.distance(*rim) * viewport.zoom;
            let (left, right, y, r) = (num(c.x - r), num(c.x + r), num(c.y), num(r));
            format!("M {left} {y} A {r} {r} 0 1 0 {right} {y} A {r} {r} 0 1 0 {left} {y} Z")
        }
        Shape::Rect { from, to } => {
            let a = s(*from);
            let b = s(*to);
            let (ax, ay, bx, by) = (num(a.x), num(a.y), num(b.x), num(b.y));
            format!("M {ax} {ay} L {bx} {ay} L {bx} {by} L {ax} {by} Z")
        }
    }
}

fn num(v: f64) -> String {
    format!("{v:.2}")
}

/// Grid lines covering the container, aligned to world multiples of
/// [`GRID_SPACING`]. Empty for containers larger than [`MAX_CONTAINER_PX`].
#[must_use]
pub fn grid_lines(viewport: &Viewport, size: Size) -> Vec<GridLine> {
    let drawable = |v: f64| v > 0.0 && v <= MAX_CONTAINER_PX;
    if !drawable(size.width) || !drawable(size.height) {
        return Vec::new();
    }
    let step = GRID_SPACING * viewport.zoom;
    let mut lines = Vec::new();

    let mut x = viewport.pan.x.rem_euclid(step);
    while x <= size.width {
        lines.push(GridLine { from: Point::new(x, 0.0), to: Point::new(x, size.height) });
        x += step;
    }
    let mut y = viewport.pan.y.rem_euclid(step);
    while y <= size.height {
        lines.push(GridLine { from: Point::new(0.0, y), to: Point::new(size.width, y) });
        y += step;
    }
    lines
}
