//! Persistence debouncer: coalesces board snapshots into delayed writes.
//!
//! DESIGN
//! ======
//! Local edits arrive in bursts (a token drag emits a snapshot per pointer
//! move). The session hands every new snapshot to [`Debouncer::schedule`],
//! which never blocks. A background worker keeps only the latest snapshot
//! and restarts a quiet-period timer on each arrival; when the timer fires,
//! exactly one write of that snapshot happens. Writes are therefore never
//! more frequent than the debounce window.
//!
//! Remote snapshots merged while a write is pending change the board too.
//! [`Debouncer::refresh`] swaps the pending snapshot for the merged one
//! without restarting the timer, so the write carries the current board and
//! never reverts a peer's edit with pre-merge state.
//!
//! ERROR HANDLING
//! ==============
//! A failed write is logged and reported as [`SaveStatus::Failed`]. It is
//! not retried on its own: the next local edit starts a new cycle that
//! writes the then-current snapshot. On [`Debouncer::close`] a pending
//! snapshot is flushed immediately. If the process dies before the timer
//! fires, edits from at most one debounce window are lost.

#[cfg(test)]
#[path = "persistence_test.rs"]
mod persistence_test;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::consts::DEFAULT_DEBOUNCE_MS;
use crate::doc::Snapshot;
use crate::store::{SessionId, SnapshotStore};

/// Tuning for the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceConfig {
    /// Quiet period after the last change before a write.
    pub debounce: Duration,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self { debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS) }
    }
}

/// Save state shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    /// Everything scheduled has been written.
    Saved,
    /// A snapshot is waiting for the quiet period to end.
    Pending,
    /// The last write failed; there are unsaved changes.
    Failed,
}

enum Message {
    /// A local change: replace the pending snapshot and restart the timer.
    Schedule(Snapshot),
    /// Newer board state for an already pending write; the timer keeps running.
    Refresh(Snapshot),
}

/// Handle to a running debounce worker for one session.
pub struct Debouncer {
    tx: mpsc::UnboundedSender<Message>,
    status: Arc<watch::Sender<SaveStatus>>,
    worker: JoinHandle<()>,
}

/// Spawn the debounce worker writing to `store` under `session`.
#[must_use]
pub fn spawn_debouncer(store: Arc<dyn SnapshotStore>, session: SessionId, config: PersistenceConfig) -> Debouncer {
    let (tx, rx) = mpsc::unbounded_channel();
    let status = Arc::new(watch::Sender::new(SaveStatus::Saved));

    info!(%session, debounce = ?config.debounce, "persistence debouncer started");
    let worker = tokio::spawn(run_worker(store, session, config.debounce, rx, Arc::clone(&status)));

    Debouncer { tx, status, worker }
}

impl Debouncer {
    /// Replace the pending snapshot and restart the quiet period.
    pub fn schedule(&self, snapshot: Snapshot) {
        if self.tx.send(Message::Schedule(snapshot)).is_err() {
            warn!("persistence worker gone; snapshot dropped");
            return;
        }
        self.status.send_replace(SaveStatus::Pending);
    }

    /// Replace the pending snapshot, if any, keeping the current deadline.
    /// Does nothing when no write is waiting.
    pub fn refresh(&self, snapshot: Snapshot) {
        if self.tx.send(Message::Refresh(snapshot)).is_err() {
            warn!("persistence worker gone; refresh dropped");
        }
    }

    #[must_use]
    pub fn status(&self) -> SaveStatus {
        *self.status.borrow()
    }

    /// Receiver notified on every save status change.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.status.subscribe()
    }

    /// Flush any pending snapshot and stop the worker.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            error!(error = %e, "persistence worker failed");
        }
    }
}

async fn run_worker(
    store: Arc<dyn SnapshotStore>,
    session: SessionId,
    debounce: Duration,
    mut rx: mpsc::UnboundedReceiver<Message>,
    status: Arc<watch::Sender<SaveStatus>>,
) {
    let mut pending: Option<Snapshot> = None;
    let timer = tokio::time::sleep(debounce);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(Message::Schedule(snapshot)) => {
                    pending = Some(snapshot);
                    status.send_replace(SaveStatus::Pending);
                    timer.as_mut().reset(Instant::now() + debounce);
                }
                Some(Message::Refresh(snapshot)) => {
                    if pending.is_some() {
                        pending = Some(snapshot);
                    }
                }
                None => {
                    if let Some(snapshot) = pending.take() {
                        debug!(%session, "flushing pending snapshot on close");
                        write_snapshot(store.as_ref(), session, &snapshot, &status).await;
                    }
                    break;
                }
            },
            () = &mut timer, if pending.is_some() => {
                if let Some(snapshot) = pending.take() {
                    write_snapshot(store.as_ref(), session, &snapshot, &status).await;
                }
            }
        }
    }
}

async fn write_snapshot(
    store: &dyn SnapshotStore,
    session: SessionId,
    snapshot: &Snapshot,
    status: &watch::Sender<SaveStatus>,
) {
    match store.write(session, snapshot).await {
        Ok(()) => {
            debug!(%session, revision = snapshot.revision, "snapshot persisted");
            status.send_replace(SaveStatus::Saved);
        }
        Err(e) => {
            error!(%session, revision = snapshot.revision, error = %e, "snapshot write failed; changes unsaved");
            status.send_replace(SaveStatus::Failed);
        }
    }
}
