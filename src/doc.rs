//! Board model: tokens, drawings, layers, and the in-memory board store.
//!
//! This module defines what is on the board (`Token`, `Drawing`, `Shape`), the
//! persisted unit (`Snapshot`), and the runtime owner of that state
//! (`BoardModel`). Local mutations go through the `BoardModel` methods, which
//! bump the revision and mark the model dirty so the session can hand the new
//! snapshot to the persistence debouncer. Remote state enters through the
//! `apply_remote_*` setters used by [`crate::reconcile`], which never mark the
//! model dirty: remote state must not be written back as if it were a local
//! edit.
//!
//! Concurrent edits from different participants resolve last-write-wins per
//! field. `Snapshot::revision` is carried on the wire so a stronger merge
//! policy can be layered on later without changing the snapshot shape.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::{Point, Viewport};
use crate::consts::{DEFAULT_STROKE_COLOR, DEFAULT_STROKE_WIDTH, DEFAULT_TOKEN_RADIUS, TOKEN_PALETTE};

/// Identifier of a token, unique within a board.
pub type TokenId = String;

/// Identifier of a committed drawing.
pub type DrawingId = String;

// =============================================================
// Id generation
// =============================================================

/// Source of fresh object ids. Owned by the board so independent boards never
/// share a counter.
pub trait IdSource: Send {
    /// Produce a new id starting with `prefix`.
    fn next_id(&mut self, prefix: &str) -> String;
}

/// Random v4 UUID ids. Safe across participants adding objects concurrently.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&mut self, prefix: &str) -> String {
        format!("{prefix}-{}", Uuid::new_v4())
    }
}

/// Counter-based ids (`token-1`, `token-2`, ...). Deterministic; intended for
/// tests and single-participant tooling.
#[derive(Debug, Default, Clone)]
pub struct SequentialIds {
    next: u64,
}

impl IdSource for SequentialIds {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next += 1;
        format!("{prefix}-{}", self.next)
    }
}

// =============================================================
// Tokens
// =============================================================

/// What a token stands for on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Character,
    Creature,
    #[default]
    Generic,
}

/// How a token is drawn: an image or a flat colour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TokenVisual {
    Image(String),
    Color(String),
}

/// A token placed on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: TokenId,
    /// Centre in world coordinates.
    pub position: Point,
    pub display_name: String,
    pub visual: TokenVisual,
    /// Hit and draw radius in world units.
    pub radius: f64,
    pub kind: TokenKind,
    /// Roster entity (character or creature) this token represents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_entity_id: Option<String>,
}

/// Request to place a token. Missing visual and radius get defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewToken {
    pub position: Point,
    pub display_name: String,
    #[serde(default)]
    pub visual: Option<TokenVisual>,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub kind: TokenKind,
    #[serde(default)]
    pub linked_entity_id: Option<String>,
}

impl NewToken {
    /// An unlinked generic token with a random palette colour.
    #[must_use]
    pub fn generic(position: Point, display_name: impl Into<String>) -> Self {
        Self {
            position,
            display_name: display_name.into(),
            visual: None,
            radius: None,
            kind: TokenKind::Generic,
            linked_entity_id: None,
        }
    }
}

// =============================================================
// Drawings
// =============================================================

/// Shape tool selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Line,
    Circle,
    Rect,
}

/// Geometry of an annotation, in world coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    /// Freehand polyline through every sampled point.
    Line { points: Vec<Point> },
    /// Circle through `rim` around `center`.
    Circle { center: Point, rim: Point },
    /// Axis-aligned rectangle spanned by two opposite corners.
    Rect { from: Point, to: Point },
}

impl Shape {
    /// Build a shape from gesture vertices. Line keeps every vertex; circle and
    /// rect use only the first and the latest. `None` when there are no
    /// vertices.
    #[must_use]
    pub fn from_vertices(kind: ShapeKind, vertices: &[Point]) -> Option<Self> {
        let first = *vertices.first()?;
        let last = *vertices.last()?;
        Some(match kind {
            ShapeKind::Line => Self::Line { points: vertices.to_vec() },
            ShapeKind::Circle => Self::Circle { center: first, rim: last },
            ShapeKind::Rect => Self::Rect { from: first, to: last },
        })
    }

    /// Whether every control point is a finite coordinate.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Line { points } => points.iter().all(|p| p.is_finite()),
            Self::Circle { center, rim } => center.is_finite() && rim.is_finite(),
            Self::Rect { from, to } => from.is_finite() && to.is_finite(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Line { .. } => ShapeKind::Line,
            Self::Circle { .. } => ShapeKind::Circle,
            Self::Rect { .. } => ShapeKind::Rect,
        }
    }
}

/// Stroke settings applied to newly committed drawings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawStyle {
    pub color: String,
    pub stroke_width: f64,
}

impl Default for DrawStyle {
    fn default() -> Self {
        Self { color: DEFAULT_STROKE_COLOR.to_owned(), stroke_width: DEFAULT_STROKE_WIDTH }
    }
}

/// A committed annotation. Never mutated after commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drawing {
    pub id: DrawingId,
    pub shape: Shape,
    pub color: String,
    pub stroke_width: f64,
}

impl Drawing {
    /// Drawings always live on the annotations layer.
    #[must_use]
    pub fn layer(&self) -> Layer {
        Layer::Annotations
    }
}

// =============================================================
// Layers
// =============================================================

/// One of the board's independently hideable layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Background,
    Tokens,
    Annotations,
}

/// Per-layer visibility. Affects projection only; hidden data is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layers {
    pub background: bool,
    pub tokens: bool,
    pub annotations: bool,
}

impl Default for Layers {
    fn default() -> Self {
        Self { background: true, tokens: true, annotations: true }
    }
}

impl Layers {
    #[must_use]
    pub fn is_visible(&self, layer: Layer) -> bool {
        match layer {
            Layer::Background => self.background,
            Layer::Tokens => self.tokens,
            Layer::Annotations => self.annotations,
        }
    }

    pub fn set(&mut self, layer: Layer, visible: bool) {
        match layer {
            Layer::Background => self.background = visible,
            Layer::Tokens => self.tokens = visible,
            Layer::Annotations => self.annotations = visible,
        }
    }
}

// =============================================================
// Snapshot
// =============================================================

/// The complete persisted state of one session's board. Written and read as a
/// single document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub image_reference: Option<String>,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub drawings: Vec<Drawing>,
    #[serde(default)]
    pub layers: Layers,
    /// Local edit counter. Not part of field equality during reconciliation.
    #[serde(default)]
    pub revision: u64,
}

// =============================================================
// BoardModel
// =============================================================

/// Single source of truth for the board's persisted fields.
pub struct BoardModel {
    image_reference: Option<String>,
    viewport: Viewport,
    tokens: Vec<Token>,
    drawings: Vec<Drawing>,
    layers: Layers,
    revision: u64,
    dirty: bool,
    ids: Box<dyn IdSource>,
}

impl Default for BoardModel {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardModel {
    /// Empty board with UUID ids.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ids(Box::new(UuidIds))
    }

    /// Empty board drawing ids from `ids`.
    #[must_use]
    pub fn with_ids(ids: Box<dyn IdSource>) -> Self {
        Self {
            image_reference: None,
            viewport: Viewport::default(),
            tokens: Vec::new(),
            drawings: Vec::new(),
            layers: Layers::default(),
            revision: 0,
            dirty: false,
            ids,
        }
    }

    /// Replace all state with a stored snapshot. Does not mark dirty.
    pub fn load_snapshot(&mut self, snapshot: Snapshot) {
        self.image_reference = snapshot.image_reference;
        self.viewport = snapshot.viewport.sanitized(Viewport::default());
        self.tokens = snapshot.tokens;
        self.drawings = snapshot.drawings;
        self.layers = snapshot.layers;
        self.revision = snapshot.revision;
        self.dirty = false;
    }

    // --- Queries ---

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            image_reference: self.image_reference.clone(),
            viewport: self.viewport,
            tokens: self.tokens.clone(),
            drawings: self.drawings.clone(),
            layers: self.layers,
            revision: self.revision,
        }
    }

    #[must_use]
    pub fn image_reference(&self) -> Option<&str> {
        self.image_reference.as_deref()
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    #[must_use]
    pub fn token(&self, id: &str) -> Option<&Token> {
        self.tokens.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn drawings(&self) -> &[Drawing] {
        &self.drawings
    }

    #[must_use]
    pub fn layers(&self) -> Layers {
        self.layers
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether a local mutation happened since the last [`BoardModel::take_dirty`].
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Read and clear the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    // --- Local mutations ---

    fn touch(&mut self) -> Snapshot {
        self.revision += 1;
        self.dirty = true;
        self.snapshot()
    }

    /// Place a token and return its id with the new snapshot.
    ///
    /// A token linked to a roster entity that is already on the board is not
    /// duplicated: the existing token moves to the requested position and its
    /// id is returned.
    pub fn add_token(&mut self, new: NewToken) -> (TokenId, Snapshot) {
        let position = if new.position.is_finite() { new.position } else { Point::ORIGIN };

        if let Some(entity) = new.linked_entity_id.as_deref() {
            let existing = self
                .tokens
                .iter_mut()
                .find(|t| t.linked_entity_id.as_deref() == Some(entity));
            if let Some(token) = existing {
                token.position = position;
                let id = token.id.clone();
                return (id, self.touch());
            }
        }

        let radius = match new.radius {
            Some(r) if r.is_finite() && r > 0.0 => r,
            _ => DEFAULT_TOKEN_RADIUS,
        };
        let visual = new.visual.unwrap_or_else(random_color);
        let id = self.ids.next_id("token");
        self.tokens.push(Token {
            id: id.clone(),
            position,
            display_name: new.display_name,
            visual,
            radius,
            kind: new.kind,
            linked_entity_id: new.linked_entity_id,
        });
        (id, self.touch())
    }

    /// Move a token to a world position. Unknown ids and non-finite
    /// positions are ignored.
    pub fn move_token(&mut self, id: &str, position: Point) -> Snapshot {
        if !position.is_finite() {
            return self.snapshot();
        }
        let Some(token) = self.tokens.iter_mut().find(|t| t.id == id) else {
            return self.snapshot();
        };
        if token.position == position {
            return self.snapshot();
        }
        token.position = position;
        self.touch()
    }

    /// Remove a token. Removing an unknown id is a no-op.
    pub fn remove_token(&mut self, id: &str) -> Snapshot {
        let before = self.tokens.len();
        self.tokens.retain(|t| t.id != id);
        if self.tokens.len() == before {
            return self.snapshot();
        }
        self.touch()
    }

    /// Append a finished drawing to the committed list.
    ///
    /// Geometry or stroke width that is not finite is refused and the board
    /// is left untouched.
    pub fn commit_drawing(&mut self, shape: Shape, style: &DrawStyle) -> Option<(DrawingId, Snapshot)> {
        if !shape.is_finite() || !style.stroke_width.is_finite() {
            return None;
        }
        let id = self.ids.next_id("drawing");
        self.drawings.push(Drawing {
            id: id.clone(),
            shape,
            color: style.color.clone(),
            stroke_width: style.stroke_width,
        });
        Some((id, self.touch()))
    }

    /// Replace the viewport. Zoom is clamped; non-finite values keep the
    /// current ones.
    pub fn set_viewport(&mut self, viewport: Viewport) -> Snapshot {
        let next = viewport.sanitized(self.viewport);
        if next == self.viewport {
            return self.snapshot();
        }
        self.viewport = next;
        self.touch()
    }

    /// Flip a layer's visibility.
    pub fn toggle_layer(&mut self, layer: Layer) -> Snapshot {
        let visible = self.layers.is_visible(layer);
        self.layers.set(layer, !visible);
        self.touch()
    }

    /// Set or clear the background image reference.
    pub fn set_image(&mut self, image_reference: Option<String>) -> Snapshot {
        if self.image_reference == image_reference {
            return self.snapshot();
        }
        self.image_reference = image_reference;
        self.touch()
    }

    /// Remove every committed drawing.
    pub fn clear_drawings(&mut self) -> Snapshot {
        if self.drawings.is_empty() {
            return self.snapshot();
        }
        self.drawings.clear();
        self.touch()
    }

    /// Return the board to an empty state: no image, tokens or drawings,
    /// default viewport and layers. The revision keeps counting.
    pub fn reset(&mut self) -> Snapshot {
        self.image_reference = None;
        self.viewport = Viewport::default();
        self.tokens.clear();
        self.drawings.clear();
        self.layers = Layers::default();
        self.touch()
    }

    // --- Remote application (never marks dirty) ---

    pub(crate) fn apply_remote_image(&mut self, image_reference: Option<String>) {
        self.image_reference = image_reference;
    }

    pub(crate) fn apply_remote_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport.sanitized(self.viewport);
    }

    pub(crate) fn apply_remote_tokens(&mut self, tokens: Vec<Token>) {
        self.tokens = tokens;
    }

    pub(crate) fn apply_remote_drawings(&mut self, drawings: Vec<Drawing>) {
        self.drawings = drawings;
    }

    pub(crate) fn apply_remote_layers(&mut self, layers: Layers) {
        self.layers = layers;
    }

    pub(crate) fn observe_revision(&mut self, revision: u64) {
        self.revision = self.revision.max(revision);
    }
}

fn random_color() -> TokenVisual {
    let color = TOKEN_PALETTE
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(TOKEN_PALETTE[0]);
    TokenVisual::Color(color.to_owned())
}
