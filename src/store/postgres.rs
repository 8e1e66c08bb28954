//! Postgres snapshot store.
//!
//! DESIGN
//! ======
//! One row per session in `board_snapshots`, holding the snapshot as JSONB.
//! A write upserts the row and raises `pg_notify` on the `board_snapshots`
//! channel with the session id as payload, both in one transaction so a
//! notification is never seen before its row. Subscribers listen on the
//! channel and re-read the row for each notification that names their
//! session; the notification payload limit never constrains snapshot size.
//!
//! ERROR HANDLING
//! ==============
//! Read and write errors propagate as [`StoreError`]. Inside the feed task,
//! errors are logged and the task keeps listening; `PgListener` reconnects on
//! its own after a dropped connection.

#[cfg(test)]
#[path = "postgres_test.rs"]
mod postgres_test;

use std::time::Duration;

use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use uuid::Uuid;

use super::{ChangeFeed, FEED_BUFFER, SessionId, SnapshotStore, StoreError, decode};
use crate::doc::Snapshot;

/// Notification channel raised on every write.
pub const NOTIFY_CHANNEL: &str = "board_snapshots";

const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Whether a notification payload names `session`. Payloads that are not a
/// session id are ignored.
fn names_session(payload: &str, session: SessionId) -> bool {
    match Uuid::parse_str(payload.trim()) {
        Ok(id) => id == session,
        Err(_) => false,
    }
}

/// Snapshot store backed by a Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn read_raw(pool: &PgPool, session: SessionId) -> Result<Option<Value>, sqlx::Error> {
        sqlx::query_scalar::<_, Value>("SELECT snapshot FROM board_snapshots WHERE session_id = $1")
            .bind(session)
            .fetch_optional(pool)
            .await
    }
}

#[async_trait::async_trait]
impl SnapshotStore for PgStore {
    async fn read(&self, session: SessionId) -> Result<Option<Snapshot>, StoreError> {
        match Self::read_raw(&self.pool, session).await? {
            Some(raw) => decode(&raw).map(Some),
            None => Ok(None),
        }
    }

    async fn write(&self, session: SessionId, snapshot: &Snapshot) -> Result<(), StoreError> {
        let raw = serde_json::to_value(snapshot).map_err(|e| StoreError::Encode(e.to_string()))?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO board_snapshots (session_id, snapshot, updated_at) VALUES ($1, $2, now()) \
             ON CONFLICT (session_id) DO UPDATE SET snapshot = EXCLUDED.snapshot, updated_at = now()",
        )
        .bind(session)
        .bind(&raw)
        .execute(&mut *tx)
        .await?;
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(NOTIFY_CHANNEL)
            .bind(session.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!(%session, revision = snapshot.revision, "snapshot written");
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChangeFeed for PgStore {
    async fn subscribe(&self, session: SessionId) -> Result<mpsc::Receiver<Value>, StoreError> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(NOTIFY_CHANNEL).await?;

        let pool = self.pool.clone();
        let (tx, rx) = mpsc::channel(FEED_BUFFER);

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    () = tx.closed() => break,
                    received = listener.recv() => received,
                };
                let notification = match received {
                    Ok(n) => n,
                    Err(e) => {
                        warn!(%session, error = %e, "change feed receive failed");
                        tokio::time::sleep(RETRY_DELAY).await;
                        continue;
                    }
                };
                if !names_session(notification.payload(), session) {
                    continue;
                }

                let raw = match Self::read_raw(&pool, session).await {
                    Ok(Some(raw)) => raw,
                    Ok(None) => continue,
                    Err(e) => {
                        error!(%session, error = %e, "change feed snapshot read failed");
                        continue;
                    }
                };
                if tx.send(raw).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }
}
