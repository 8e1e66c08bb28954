//! Engine: the board model driven by the tool state machine.
//!
//! Every handler takes one input or UI command, updates the model and the
//! active [`InputState`], and returns [`Action`]s describing what changed.
//! The engine performs no I/O; [`crate::session`] owns persistence and the
//! change feed.

use serde::Serialize;
use serde_json::Value;

use crate::camera::{Point, Viewport, clamp_zoom};
use crate::consts::{MAX_CONTAINER_PX, MIN_PINCH_DISTANCE_PX};
use crate::doc::{BoardModel, DrawStyle, DrawingId, Layer, Layers, NewToken, Shape, ShapeKind, Snapshot, TokenId};
use crate::hit;
use crate::input::{InputEvent, InputState, MeasurePhase, Measurement, Pinch, Size, Tool, UiState, touch_distance};
use crate::reconcile::{Field, Pins, ReconcileReport, RemoteSnapshot, reconcile};
use crate::render::{self, Scene};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from handlers for the host to process.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    TokenAdded { id: TokenId },
    TokenMoved { id: TokenId, position: Point },
    TokenRemoved { id: TokenId },
    DrawingCommitted { id: DrawingId },
    ViewportChanged { viewport: Viewport },
    LayersChanged { layers: Layers },
    ImageChanged { image_reference: Option<String> },
    /// The background only exists in this client and will not survive a reload.
    ImageNotDurable { url: String },
    BoardReset,
    MeasurementCompleted { measurement: Measurement },
    RemoteApplied { fields: Vec<Field> },
    SetCursor { cursor: &'static str },
    RenderNeeded,
}

/// Board engine: the board model plus the tool state machine driving it.
///
/// Holds no I/O. The session feeds it input and remote snapshots and takes
/// the model's dirty flag to decide when to persist.
#[derive(Default)]
pub struct Engine {
    pub board: BoardModel,
    pub ui: UiState,
    pub input: InputState,
    pub pinch: Option<Pinch>,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine over an existing board model.
    #[must_use]
    pub fn with_board(board: BoardModel) -> Self {
        Self { board, ..Self::default() }
    }

    // --- Data inputs ---

    /// Hydrate the board from a stored snapshot.
    pub fn load_snapshot(&mut self, snapshot: Snapshot) {
        self.board.load_snapshot(snapshot);
        self.input = InputState::Idle;
        self.pinch = None;
    }

    /// Merge a raw remote payload, tolerating malformed fields.
    pub fn apply_remote(&mut self, payload: &Value) -> Vec<Action> {
        let report = self.apply_remote_snapshot(&RemoteSnapshot::from_value(payload));
        if report.is_empty() {
            return Vec::new();
        }
        vec![Action::RemoteApplied { fields: report.applied }, Action::RenderNeeded]
    }

    /// Merge a parsed remote snapshot, keeping the local gesture pinned.
    pub fn apply_remote_snapshot(&mut self, remote: &RemoteSnapshot) -> ReconcileReport {
        let pins = Pins {
            token: self.input.dragged_token(),
            pan: matches!(self.input, InputState::PanDragging { .. }) || self.pinch.is_some(),
            zoom: self.pinch.is_some(),
        };
        let report = reconcile(&mut self.board, remote, pins);

        // EDGE: the dragged token may have been removed remotely.
        let lost = self
            .input
            .dragged_token()
            .is_some_and(|id| self.board.token(id).is_none());
        if lost {
            self.input = InputState::Idle;
        }
        report
    }

    // --- Tools and view settings ---

    /// Arm a tool. The new mode replaces whatever was active; selecting the
    /// tool that is already armed turns it off. In-progress geometry of the
    /// replaced mode is discarded.
    pub fn select_tool(&mut self, tool: Tool) -> Vec<Action> {
        let current = self.input.tool();
        self.input = match tool {
            _ if tool == current => InputState::Idle,
            Tool::None => InputState::Idle,
            Tool::Measure => InputState::Measuring(MeasurePhase::AwaitingFirst),
            Tool::Draw(shape) => InputState::Drawing { shape, vertices: Vec::new() },
        };
        vec![self.cursor(), Action::RenderNeeded]
    }

    /// Drop any tool and in-progress gesture.
    pub fn cancel(&mut self) -> Vec<Action> {
        self.input = InputState::Idle;
        self.pinch = None;
        vec![self.cursor(), Action::RenderNeeded]
    }

    pub fn toggle_grid(&mut self) -> Vec<Action> {
        self.ui.show_grid = !self.ui.show_grid;
        vec![Action::RenderNeeded]
    }

    /// Record where the board container sits in client space. Non-finite
    /// values and sizes beyond [`MAX_CONTAINER_PX`] keep the previous layout.
    pub fn set_container(&mut self, origin: Point, size: Size) -> Vec<Action> {
        let fits = |v: f64| v.is_finite() && (0.0..=MAX_CONTAINER_PX).contains(&v);
        if !origin.is_finite() || !fits(size.width) || !fits(size.height) {
            return Vec::new();
        }
        self.ui.container_origin = origin;
        self.ui.container_size = size;
        vec![Action::RenderNeeded]
    }

    pub fn set_style(&mut self, style: DrawStyle) {
        self.ui.style = style;
    }

    pub fn zoom_in(&mut self) -> Vec<Action> {
        let next = self.board.viewport().zoomed_in();
        self.set_viewport(next)
    }

    pub fn zoom_out(&mut self) -> Vec<Action> {
        let next = self.board.viewport().zoomed_out();
        self.set_viewport(next)
    }

    pub fn reset_view(&mut self) -> Vec<Action> {
        self.set_viewport(Viewport::reset())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Vec<Action> {
        let before = self.board.viewport();
        self.board.set_viewport(viewport);
        let after = self.board.viewport();
        if after == before {
            return Vec::new();
        }
        vec![Action::ViewportChanged { viewport: after }, Action::RenderNeeded]
    }

    // --- Board operations ---

    pub fn add_token(&mut self, new: NewToken) -> Vec<Action> {
        let (id, _) = self.board.add_token(new);
        vec![Action::TokenAdded { id }, Action::RenderNeeded]
    }

    pub fn remove_token(&mut self, id: &str) -> Vec<Action> {
        if self.board.token(id).is_none() {
            return Vec::new();
        }
        self.board.remove_token(id);
        if self.input.dragged_token() == Some(id) {
            self.input = InputState::Idle;
        }
        vec![Action::TokenRemoved { id: id.to_owned() }, Action::RenderNeeded]
    }

    pub fn toggle_layer(&mut self, layer: Layer) -> Vec<Action> {
        let snapshot = self.board.toggle_layer(layer);
        vec![Action::LayersChanged { layers: snapshot.layers }, Action::RenderNeeded]
    }

    pub fn set_image(&mut self, image_reference: Option<String>) -> Vec<Action> {
        if self.board.image_reference() == image_reference.as_deref() {
            return Vec::new();
        }
        self.board.set_image(image_reference.clone());
        vec![Action::ImageChanged { image_reference }, Action::RenderNeeded]
    }

    /// Clear the board and abandon any gesture.
    pub fn reset_board(&mut self) -> Vec<Action> {
        self.board.reset();
        self.input = InputState::Idle;
        self.pinch = None;
        vec![Action::BoardReset, self.cursor(), Action::RenderNeeded]
    }

    // --- Input events ---

    /// Dispatch one input command.
    pub fn handle(&mut self, event: InputEvent) -> Vec<Action> {
        match event {
            InputEvent::PointerDown { at } => self.on_pointer_down(at),
            InputEvent::PointerMove { at } => self.on_pointer_move(at),
            InputEvent::PointerUp { at } => self.on_pointer_up(at),
            InputEvent::PointerLeave => self.on_pointer_leave(),
            InputEvent::TouchStart { touches } => self.on_touch_start(&touches),
            InputEvent::TouchMove { touches } => self.on_touch_move(&touches),
            InputEvent::TouchEnd { touches } => self.on_touch_end(&touches),
        }
    }

    pub fn on_pointer_down(&mut self, screen: Point) -> Vec<Action> {
        if self.pinch.is_some() || !screen.is_finite() {
            return Vec::new();
        }
        let world = self.to_world(screen);
        if !world.is_finite() {
            return Vec::new();
        }

        match std::mem::take(&mut self.input) {
            InputState::Idle => self.begin_drag(screen, world),
            InputState::Measuring(MeasurePhase::AwaitingFirst) => {
                self.input = InputState::Measuring(MeasurePhase::AwaitingSecond { start: world, current: world });
                vec![Action::RenderNeeded]
            }
            InputState::Measuring(MeasurePhase::AwaitingSecond { start, .. }) => {
                let measurement = Measurement::between(start, world, self.board.viewport().zoom);
                self.input = InputState::Idle;
                vec![Action::MeasurementCompleted { measurement }, self.cursor(), Action::RenderNeeded]
            }
            InputState::Drawing { shape, vertices } if vertices.is_empty() => {
                self.input = InputState::Drawing { shape, vertices: vec![world] };
                vec![Action::RenderNeeded]
            }
            other => {
                self.input = other;
                Vec::new()
            }
        }
    }

    fn begin_drag(&mut self, screen: Point, world: Point) -> Vec<Action> {
        let grabbed = if self.board.layers().tokens {
            hit::token_at(world, self.board.tokens()).map(|t| t.id.clone())
        } else {
            None
        };

        if let Some(id) = grabbed {
            self.input = InputState::TokenDragging { id, last_world: world };
        } else if self.board.image_reference().is_some() {
            self.input = InputState::PanDragging { last_screen: screen };
        } else {
            return Vec::new();
        }
        vec![self.cursor()]
    }

    pub fn on_pointer_move(&mut self, screen: Point) -> Vec<Action> {
        if self.pinch.is_some() || !screen.is_finite() {
            return Vec::new();
        }
        let world = self.to_world(screen);
        if !world.is_finite() {
            return Vec::new();
        }

        match &mut self.input {
            InputState::PanDragging { last_screen } => {
                let delta = screen.delta(*last_screen);
                *last_screen = screen;
                let viewport = self.board.viewport();
                let next = viewport.with_pan(viewport.pan.offset(delta));
                self.board.set_viewport(next);
                vec![Action::ViewportChanged { viewport: self.board.viewport() }, Action::RenderNeeded]
            }
            InputState::TokenDragging { id, last_world } => {
                let delta = world.delta(*last_world);
                *last_world = world;
                let Some(position) = self.board.token(id).map(|t| t.position.offset(delta)) else {
                    return Vec::new();
                };
                if !position.is_finite() {
                    return Vec::new();
                }
                self.board.move_token(id, position);
                vec![Action::TokenMoved { id: id.clone(), position }, Action::RenderNeeded]
            }
            InputState::Measuring(MeasurePhase::AwaitingSecond { current, .. }) => {
                *current = world;
                vec![Action::RenderNeeded]
            }
            InputState::Drawing { shape, vertices } if !vertices.is_empty() => {
                match shape {
                    ShapeKind::Line => vertices.push(world),
                    ShapeKind::Circle | ShapeKind::Rect => {
                        vertices.truncate(1);
                        vertices.push(world);
                    }
                }
                vec![Action::RenderNeeded]
            }
            _ => Vec::new(),
        }
    }

    pub fn on_pointer_up(&mut self, _screen: Point) -> Vec<Action> {
        if self.pinch.is_some() {
            return Vec::new();
        }

        match std::mem::take(&mut self.input) {
            InputState::Drawing { shape, vertices } if !vertices.is_empty() => {
                let mut actions = Vec::new();
                let committed = Shape::from_vertices(shape, &vertices)
                    .and_then(|geometry| self.board.commit_drawing(geometry, &self.ui.style));
                if let Some((id, _)) = committed {
                    actions.push(Action::DrawingCommitted { id });
                }
                actions.push(self.cursor());
                actions.push(Action::RenderNeeded);
                actions
            }
            InputState::PanDragging { .. } | InputState::TokenDragging { .. } => vec![self.cursor()],
            other => {
                self.input = other;
                Vec::new()
            }
        }
    }

    pub fn on_pointer_leave(&mut self) -> Vec<Action> {
        if !self.input.is_dragging() {
            return Vec::new();
        }
        self.input = InputState::Idle;
        vec![self.cursor()]
    }

    /// Two or more touches start a pinch and end any pointer drag.
    pub fn on_touch_start(&mut self, touches: &[Point]) -> Vec<Action> {
        let Some(distance) = touch_distance(touches) else {
            return Vec::new();
        };
        if !distance.is_finite() || distance < MIN_PINCH_DISTANCE_PX {
            return Vec::new();
        }

        if self.input.is_dragging() {
            self.input = InputState::Idle;
        }
        if let InputState::Drawing { vertices, .. } = &mut self.input {
            vertices.clear();
        }
        self.pinch = Some(Pinch { initial_distance: distance, initial_zoom: self.board.viewport().zoom });
        vec![self.cursor()]
    }

    pub fn on_touch_move(&mut self, touches: &[Point]) -> Vec<Action> {
        let Some(pinch) = self.pinch else {
            return Vec::new();
        };
        let Some(distance) = touch_distance(touches) else {
            return Vec::new();
        };
        let zoom = clamp_zoom(pinch.zoom_for(distance));
        let next = self.board.viewport().with_zoom(zoom);
        self.set_viewport(next)
    }

    pub fn on_touch_end(&mut self, touches: &[Point]) -> Vec<Action> {
        if touches.len() >= 2 || self.pinch.is_none() {
            return Vec::new();
        }
        self.pinch = None;
        vec![self.cursor()]
    }

    // --- Queries ---

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.input.tool()
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.board.viewport()
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.board.snapshot()
    }

    /// Screen-space primitives for the current state.
    #[must_use]
    pub fn project(&self) -> Scene {
        render::project(&self.board, &self.ui, &self.input)
    }

    fn to_world(&self, screen: Point) -> Point {
        self.board.viewport().screen_to_world(screen, self.ui.container_origin)
    }

    fn cursor(&self) -> Action {
        let cursor = match self.input {
            InputState::PanDragging { .. } | InputState::TokenDragging { .. } => "grabbing",
            InputState::Measuring(_) | InputState::Drawing { .. } => "crosshair",
            InputState::Idle if self.board.image_reference().is_some() => "grab",
            InputState::Idle => "default",
        };
        Action::SetCursor { cursor }
    }
}
