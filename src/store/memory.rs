//! In-process snapshot store.

#[cfg(test)]
#[path = "memory_test.rs"]
mod memory_test;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;
use tokio::sync::{RwLock, broadcast, mpsc};
use tracing::{debug, warn};

use super::{ChangeFeed, FEED_BUFFER, SessionId, SnapshotStore, StoreError, decode};
use crate::doc::Snapshot;

/// Snapshots held in a map, with a broadcast change feed.
///
/// Stores serialized JSON rather than `Snapshot` values so reads go through
/// the same decode path as the database backend.
pub struct MemoryStore {
    snapshots: RwLock<HashMap<SessionId, Value>>,
    changes: broadcast::Sender<(SessionId, Value)>,
    writes: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(FEED_BUFFER);
        Self { snapshots: RwLock::new(HashMap::new()), changes, writes: AtomicUsize::new(0) }
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Publish a raw payload as if another participant had written it.
    ///
    /// The payload is not validated and is not stored.
    pub fn inject(&self, session: SessionId, payload: Value) {
        if self.changes.send((session, payload)).is_err() {
            debug!(%session, "no change feed subscribers");
        }
    }
}

#[async_trait::async_trait]
impl SnapshotStore for MemoryStore {
    async fn read(&self, session: SessionId) -> Result<Option<Snapshot>, StoreError> {
        let snapshots = self.snapshots.read().await;
        let Some(raw) = snapshots.get(&session) else {
            return Ok(None);
        };
        decode(raw).map(Some)
    }

    async fn write(&self, session: SessionId, snapshot: &Snapshot) -> Result<(), StoreError> {
        let raw = serde_json::to_value(snapshot).map_err(|e| StoreError::Encode(e.to_string()))?;
        self.snapshots.write().await.insert(session, raw.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inject(session, raw);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChangeFeed for MemoryStore {
    async fn subscribe(&self, session: SessionId) -> Result<mpsc::Receiver<Value>, StoreError> {
        let mut changes = self.changes.subscribe();
        let (tx, rx) = mpsc::channel(FEED_BUFFER);

        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok((id, payload)) if id == session => {
                        if tx.send(payload).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(%session, skipped, "change feed lagged; snapshots dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(rx)
    }
}
