//! Snapshot storage and change feed.
//!
//! DESIGN
//! ======
//! The board is persisted as one JSON snapshot per session. Writers replace
//! the whole document; there is no server-side merge. Every write is also
//! published on the change feed so other participants (and the writer
//! itself) receive it. Readers treat feed payloads as untrusted JSON and hand
//! them to the reconciler as-is.
//!
//! Two backends: [`MemoryStore`] for tests and offline runs, [`PgStore`] for
//! a shared Postgres database.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::doc::Snapshot;

/// Identifier of a shared board session.
pub type SessionId = Uuid;

/// Buffer size of a change feed subscription.
pub const FEED_BUFFER: usize = 64;

/// Errors produced by snapshot stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored document is not a valid snapshot.
    #[error("snapshot decode failed: {0}")]
    Decode(String),

    #[error("snapshot encode failed: {0}")]
    Encode(String),
}

/// Durable snapshot storage keyed by session.
#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Latest snapshot for `session`, or `None` if nothing was written yet.
    async fn read(&self, session: SessionId) -> Result<Option<Snapshot>, StoreError>;

    /// Replace the stored snapshot and publish it on the change feed.
    async fn write(&self, session: SessionId, snapshot: &Snapshot) -> Result<(), StoreError>;
}

/// Subscription to snapshot changes of a session.
#[async_trait::async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Receive every snapshot written to `session` from now on, as raw JSON.
    async fn subscribe(&self, session: SessionId) -> Result<mpsc::Receiver<Value>, StoreError>;
}

/// Decode a stored JSON document into a snapshot.
pub(crate) fn decode(raw: &Value) -> Result<Snapshot, StoreError> {
    Snapshot::deserialize(raw).map_err(|e| StoreError::Decode(e.to_string()))
}
