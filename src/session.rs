//! Board session: one participant's view of a shared board.
//!
//! DESIGN
//! ======
//! A session owns the [`Engine`] and wires it to the outside world: the
//! snapshot store it was loaded from, the persistence debouncer that writes
//! local edits back, the roster used to place bound tokens, and the upload
//! sink for background images. [`BoardSession::run`] is the event loop. It
//! handles one event at a time (a local command, a remote snapshot, or a
//! finished upload) so handlers never overlap; the debouncer worker and
//! upload tasks are the only concurrent work and never block the loop.
//!
//! CONSISTENCY
//! ===========
//! Every participant holds a full copy of the board and edits it locally
//! first. Remote snapshots are merged field by field in arrival order, so
//! concurrent edits to the same field resolve last-write-wins. There is no
//! locking and no authoritative owner. `Snapshot::revision` travels with
//! every write so a stricter merge policy can be added without changing the
//! snapshot format.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::camera::Point;
use crate::doc::{DrawStyle, Layer, NewToken, TokenId};
use crate::engine::{Action, Engine};
use crate::input::{InputEvent, Size, Tool};
use crate::persistence::{Debouncer, PersistenceConfig, SaveStatus, spawn_debouncer};
use crate::render::Scene;
use crate::roster::{self, RosterEntry, RosterProvider};
use crate::store::{SessionId, SnapshotStore, StoreError};
use crate::upload::{EphemeralImages, ImagePayload, ImageRef, UploadSink, upload_or_fallback};

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The stored snapshot could not be loaded.
    #[error("session load failed: {0}")]
    Load(#[from] StoreError),
}

// =============================================================================
// TYPES
// =============================================================================

/// External collaborators of a session.
#[derive(Clone)]
pub struct SessionDeps {
    pub store: Arc<dyn SnapshotStore>,
    pub roster: Arc<dyn RosterProvider>,
    pub uploads: Arc<dyn UploadSink>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Campaign whose roster is loaded on open.
    pub campaign_id: Option<String>,
    pub persistence: PersistenceConfig,
}

/// A local user command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SessionCommand {
    Input { event: InputEvent },
    SelectTool { tool: Tool },
    Cancel,
    ToggleGrid,
    ZoomIn,
    ZoomOut,
    ResetView,
    SetStyle { style: DrawStyle },
    SetContainer { origin: Point, size: Size },
    AddToken { token: NewToken },
    /// Place the roster entity `entity_id` as a bound token.
    AddRosterToken { entity_id: String, position: Point },
    RemoveToken { id: TokenId },
    ToggleLayer { layer: Layer },
    /// Upload an image and make it the board background once done.
    SetBackground { bytes: Vec<u8>, content_type: String },
    ClearBackground,
    ResetBoard,
}

/// Output of the session loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Actions { actions: Vec<Action> },
    SaveStatus { status: SaveStatus },
}

/// A finished background upload, tagged with the request it answers.
#[derive(Debug)]
struct UploadDone {
    request: u64,
    image: ImageRef,
}

enum Event {
    Command(SessionCommand),
    Remote(Value),
    Upload(UploadDone),
    Status(SaveStatus),
    Shutdown,
}

// =============================================================================
// SESSION
// =============================================================================

pub struct BoardSession {
    id: SessionId,
    engine: Engine,
    roster: Vec<RosterEntry>,
    uploads: Arc<dyn UploadSink>,
    images: EphemeralImages,
    debouncer: Debouncer,
    upload_tx: mpsc::UnboundedSender<UploadDone>,
    upload_rx: mpsc::UnboundedReceiver<UploadDone>,
    /// Latest upload request; completions of older requests are discarded.
    upload_request: u64,
}

impl BoardSession {
    /// Load the board for `id` and start persisting local edits.
    ///
    /// A session that was never written opens as an empty board. A roster
    /// that fails to load is logged and treated as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored snapshot cannot be read or decoded.
    pub async fn open(id: SessionId, deps: SessionDeps, config: SessionConfig) -> Result<Self, SessionError> {
        let mut engine = Engine::new();
        match deps.store.read(id).await? {
            Some(snapshot) => {
                info!(session = %id, revision = snapshot.revision, tokens = snapshot.tokens.len(), "session loaded");
                engine.load_snapshot(snapshot);
            }
            None => info!(session = %id, "new session; starting with an empty board"),
        }

        let roster = match config.campaign_id.as_deref() {
            Some(campaign) => match deps.roster.roster(campaign).await {
                Ok(entries) => {
                    debug!(session = %id, campaign, entries = entries.len(), "roster loaded");
                    entries
                }
                Err(e) => {
                    warn!(session = %id, campaign, error = %e, "roster unavailable; continuing without it");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let debouncer = spawn_debouncer(Arc::clone(&deps.store), id, config.persistence);
        let (upload_tx, upload_rx) = mpsc::unbounded_channel();

        Ok(Self {
            id,
            engine,
            roster,
            uploads: deps.uploads,
            images: EphemeralImages::default(),
            debouncer,
            upload_tx,
            upload_rx,
            upload_request: 0,
        })
    }

    // --- Queries ---

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    #[must_use]
    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    #[must_use]
    pub fn save_status(&self) -> SaveStatus {
        self.debouncer.status()
    }

    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.debouncer.subscribe_status()
    }

    /// Bytes of a background that only exists locally.
    #[must_use]
    pub fn ephemeral_image(&self, url: &str) -> Option<&ImagePayload> {
        self.images.get(url)
    }

    #[must_use]
    pub fn project(&self) -> Scene {
        self.engine.project()
    }

    // --- Event handlers ---

    /// Apply a local command and schedule persistence of any change.
    pub fn handle(&mut self, command: SessionCommand) -> Vec<Action> {
        let actions = match command {
            SessionCommand::Input { event } => self.engine.handle(event),
            SessionCommand::SelectTool { tool } => self.engine.select_tool(tool),
            SessionCommand::Cancel => self.engine.cancel(),
            SessionCommand::ToggleGrid => self.engine.toggle_grid(),
            SessionCommand::ZoomIn => self.engine.zoom_in(),
            SessionCommand::ZoomOut => self.engine.zoom_out(),
            SessionCommand::ResetView => self.engine.reset_view(),
            SessionCommand::SetStyle { style } => {
                self.engine.set_style(style);
                Vec::new()
            }
            SessionCommand::SetContainer { origin, size } => self.engine.set_container(origin, size),
            SessionCommand::AddToken { token } => self.engine.add_token(token),
            SessionCommand::AddRosterToken { entity_id, position } => self.add_roster_token(&entity_id, position),
            SessionCommand::RemoveToken { id } => self.engine.remove_token(&id),
            SessionCommand::ToggleLayer { layer } => self.engine.toggle_layer(layer),
            SessionCommand::SetBackground { bytes, content_type } => {
                self.start_upload(bytes, content_type);
                Vec::new()
            }
            SessionCommand::ClearBackground => {
                self.upload_request += 1;
                let actions = self.engine.set_image(None);
                self.images.retain_only(None);
                actions
            }
            SessionCommand::ResetBoard => {
                self.upload_request += 1;
                let actions = self.engine.reset_board();
                self.images.retain_only(None);
                actions
            }
        };
        self.persist_if_dirty();
        actions
    }

    /// Merge a snapshot received from the change feed.
    ///
    /// The merge itself is never written back. A local write that is already
    /// pending is refreshed so it carries the merged board.
    pub fn apply_remote(&mut self, payload: &Value) -> Vec<Action> {
        let actions = self.engine.apply_remote(payload);
        self.images.retain_only(self.engine.board.image_reference());
        if !actions.is_empty() && self.save_status() == SaveStatus::Pending {
            self.debouncer.refresh(self.engine.snapshot());
        }
        actions
    }

    /// Wait for the next background upload to finish and apply it.
    pub async fn await_upload(&mut self) -> Vec<Action> {
        match self.upload_rx.recv().await {
            Some(done) => self.finish_upload(done),
            None => Vec::new(),
        }
    }

    fn add_roster_token(&mut self, entity_id: &str, position: Point) -> Vec<Action> {
        let Some(entry) = roster::find(&self.roster, entity_id) else {
            warn!(session = %self.id, entity_id, "unknown roster entity; token not added");
            return Vec::new();
        };
        let token = entry.to_new_token(position);
        self.engine.add_token(token)
    }

    fn start_upload(&mut self, bytes: Vec<u8>, content_type: String) {
        self.upload_request += 1;
        let request = self.upload_request;
        let sink = Arc::clone(&self.uploads);
        let tx = self.upload_tx.clone();

        tokio::spawn(async move {
            let image = upload_or_fallback(sink.as_ref(), bytes, &content_type).await;
            if tx.send(UploadDone { request, image }).is_err() {
                debug!(request, "session closed before upload finished");
            }
        });
    }

    fn finish_upload(&mut self, done: UploadDone) -> Vec<Action> {
        if done.request != self.upload_request {
            debug!(session = %self.id, request = done.request, "superseded upload discarded");
            return Vec::new();
        }

        let (url, durable) = match done.image {
            ImageRef::Durable(url) => (url, true),
            ImageRef::Ephemeral { url, payload } => {
                self.images.insert(url.clone(), payload);
                (url, false)
            }
        };
        let mut actions = self.engine.set_image(Some(url.clone()));
        self.images.retain_only(self.engine.board.image_reference());
        self.persist_if_dirty();
        if !durable {
            actions.push(Action::ImageNotDurable { url });
        }
        actions
    }

    fn persist_if_dirty(&mut self) {
        if self.engine.board.take_dirty() {
            self.debouncer.schedule(self.engine.snapshot());
        }
    }

    // --- Event loop ---

    /// Run until `commands` closes, then flush pending edits.
    ///
    /// `remote` carries change feed payloads; it may close earlier, after
    /// which only local commands are processed. Results go to `out`; the
    /// loop also stops if `out` is dropped.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        mut remote: mpsc::Receiver<Value>,
        out: mpsc::Sender<SessionEvent>,
    ) {
        let mut status = self.debouncer.subscribe_status();
        let mut remote_open = true;
        info!(session = %self.id, "session loop started");

        loop {
            let event = tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => Event::Command(command),
                    None => Event::Shutdown,
                },
                payload = remote.recv(), if remote_open => match payload {
                    Some(payload) => Event::Remote(payload),
                    None => {
                        warn!(session = %self.id, "change feed closed; remote updates stop");
                        remote_open = false;
                        continue;
                    }
                },
                Some(done) = self.upload_rx.recv() => Event::Upload(done),
                Ok(()) = status.changed() => Event::Status(*status.borrow_and_update()),
            };

            let output = match event {
                Event::Command(command) => SessionEvent::Actions { actions: self.handle(command) },
                Event::Remote(payload) => SessionEvent::Actions { actions: self.apply_remote(&payload) },
                Event::Upload(done) => SessionEvent::Actions { actions: self.finish_upload(done) },
                Event::Status(status) => SessionEvent::SaveStatus { status },
                Event::Shutdown => break,
            };

            if matches!(&output, SessionEvent::Actions { actions } if actions.is_empty()) {
                continue;
            }
            if out.send(output).await.is_err() {
                debug!(session = %self.id, "output closed");
                break;
            }
        }

        info!(session = %self.id, "session loop stopping");
        self.debouncer.close().await;
    }
}
