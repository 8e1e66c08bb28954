//! Remote reconciler: merges inbound board snapshots into the local model.
//!
//! DESIGN
//! ======
//! Every participant writes full snapshots through the same channel it reads
//! from, so most inbound messages are echoes of a local write. Applying them
//! blindly would mark the board dirty, schedule another write, and loop.
//! Instead each field is compared structurally with the local value and only
//! applied when it differs, and remote application never marks the model
//! dirty. Gesture pins keep a token or pan being dragged under the local
//! pointer even if a stale echo disagrees.
//!
//! ERROR HANDLING
//! ==============
//! Payloads are parsed field by field. A missing or ill-typed field is left
//! out of the merge and logged at debug level; the remaining fields still
//! apply. Nothing here returns an error or panics.

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod reconcile_test;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::camera::Point;
use crate::doc::{BoardModel, Drawing, Snapshot, Token};

/// An inbound snapshot with every field optional.
///
/// `image_reference` is doubly optional: `Some(None)` clears the image,
/// `None` leaves it alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteSnapshot {
    pub image_reference: Option<Option<String>>,
    pub zoom: Option<f64>,
    pub pan: Option<Point>,
    pub tokens: Option<Vec<Token>>,
    pub drawings: Option<Vec<Drawing>>,
    pub background_visible: Option<bool>,
    pub tokens_visible: Option<bool>,
    pub annotations_visible: Option<bool>,
    pub revision: Option<u64>,
}

impl RemoteSnapshot {
    /// Parse whatever is well-formed out of a raw JSON payload.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            debug!("remote snapshot is not an object; ignoring");
            return Self::default();
        };

        let image_reference = match obj.get("imageReference") {
            Some(Value::Null) => Some(None),
            Some(Value::String(url)) => Some(Some(url.clone())),
            Some(_) => {
                debug!(field = "imageReference", "ill-typed remote field skipped");
                None
            }
            None => None,
        };

        let viewport = obj.get("viewport").and_then(Value::as_object);
        let zoom = viewport
            .and_then(|v| v.get("zoom"))
            .and_then(Value::as_f64)
            .filter(|z| z.is_finite());
        let pan = viewport
            .and_then(|v| field::<Point>(v, "pan"))
            .filter(|p| p.is_finite());

        let layers = obj.get("layers").and_then(Value::as_object);
        let flag = |key: &str| layers.and_then(|l| l.get(key)).and_then(Value::as_bool);

        Self {
            image_reference,
            zoom,
            pan,
            tokens: field(obj, "tokens"),
            drawings: field(obj, "drawings"),
            background_visible: flag("background"),
            tokens_visible: flag("tokens"),
            annotations_visible: flag("annotations"),
            revision: obj.get("revision").and_then(Value::as_u64),
        }
    }

    /// A remote view of a complete, well-formed snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            image_reference: Some(snapshot.image_reference.clone()),
            zoom: Some(snapshot.viewport.zoom),
            pan: Some(snapshot.viewport.pan),
            tokens: Some(snapshot.tokens.clone()),
            drawings: Some(snapshot.drawings.clone()),
            background_visible: Some(snapshot.layers.background),
            tokens_visible: Some(snapshot.layers.tokens),
            annotations_visible: Some(snapshot.layers.annotations),
            revision: Some(snapshot.revision),
        }
    }
}

fn field<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Option<T> {
    let raw = obj.get(key)?;
    match T::deserialize(raw) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!(field = key, error = %e, "ill-typed remote field skipped");
            None
        }
    }
}

/// Board fields the reconciler may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Image,
    Zoom,
    Pan,
    Tokens,
    Drawings,
    Layers,
}

/// Which fields an inbound snapshot actually changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub applied: Vec<Field>,
}

impl ReconcileReport {
    /// Nothing was applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }

    #[must_use]
    pub fn changed(&self, field: Field) -> bool {
        self.applied.contains(&field)
    }
}

/// Local gesture state that inbound snapshots must not override.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pins<'a> {
    /// Token under the pointer; keeps its local position.
    pub token: Option<&'a str>,
    /// A pan drag or pinch is in progress; the local pan is kept.
    pub pan: bool,
    /// A pinch is in progress; the local zoom is kept.
    pub zoom: bool,
}

/// Merge `remote` into `board`, field by field, applying only differences.
pub fn reconcile(board: &mut BoardModel, remote: &RemoteSnapshot, pins: Pins<'_>) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    if let Some(image) = &remote.image_reference {
        if board.image_reference() != image.as_deref() {
            board.apply_remote_image(image.clone());
            report.applied.push(Field::Image);
        }
    }

    if let Some(zoom) = remote.zoom.filter(|_| !pins.zoom) {
        let current = board.viewport();
        let next = current.with_zoom(zoom);
        if next != current {
            board.apply_remote_viewport(next);
            report.applied.push(Field::Zoom);
        }
    }

    if let Some(pan) = remote.pan.filter(|_| !pins.pan) {
        let current = board.viewport();
        let next = current.with_pan(pan);
        if next != current {
            board.apply_remote_viewport(next);
            report.applied.push(Field::Pan);
        }
    }

    if let Some(tokens) = &remote.tokens {
        let mut incoming = tokens.clone();
        if let Some(pinned) = pins.token {
            if let Some(local) = board.token(pinned).map(|t| t.position) {
                if let Some(t) = incoming.iter_mut().find(|t| t.id == pinned) {
                    t.position = local;
                }
            }
        }
        if incoming.as_slice() != board.tokens() {
            board.apply_remote_tokens(incoming);
            report.applied.push(Field::Tokens);
        }
    }

    if let Some(drawings) = &remote.drawings {
        if drawings.as_slice() != board.drawings() {
            board.apply_remote_drawings(drawings.clone());
            report.applied.push(Field::Drawings);
        }
    }

    let current = board.layers();
    let mut layers = current;
    if let Some(v) = remote.background_visible {
        layers.background = v;
    }
    if let Some(v) = remote.tokens_visible {
        layers.tokens = v;
    }
    if let Some(v) = remote.annotations_visible {
        layers.annotations = v;
    }
    if layers != current {
        board.apply_remote_layers(layers);
        report.applied.push(Field::Layers);
    }

    if let Some(revision) = remote.revision {
        board.observe_revision(revision);
    }

    report
}
