use std::time::Duration;

use geojson::Feature;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use super::types::{Command, EngineError, EngineStats, Transaction};
use crate::spatial::index::Rect;

/// How long callers wait for the loop's reply before giving up. The command
/// still executes after a timeout; the caller must treat the outcome as
/// uncertain and reconcile with a later select.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Cloneable client side of the engine inbox.
#[derive(Clone, Debug)]
pub struct EngineHandle {
    name: String,
    tx: mpsc::Sender<Command>,
}

impl EngineHandle {
    pub(crate) fn new(name: String, tx: mpsc::Sender<Command>) -> Self {
        Self { name, tx }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mutations never block the caller on a full inbox.
    fn submit(&self, cmd: Command) -> Result<(), EngineError> {
        self.tx.try_send(cmd).map_err(|e| match e {
            TrySendError::Full(_) => EngineError::Busy,
            TrySendError::Closed(_) => EngineError::Unavailable,
        })
    }

    async fn wait<T>(rx: oneshot::Receiver<T>) -> Result<T, EngineError> {
        match timeout(REPLY_TIMEOUT, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(EngineError::Unavailable),
            Err(_) => Err(EngineError::Timeout),
        }
    }

    /// Inserts a feature and returns its server-assigned id.
    pub async fn insert(&self, feature: Feature) -> Result<u64, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Insert { feature, reply })?;
        Self::wait(rx).await?
    }

    /// Replaces the feature whose id the payload carries. Returns the log
    /// sequence number of the replacement.
    pub async fn replace(&self, feature: Feature) -> Result<u64, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Replace { feature, reply })?;
        Self::wait(rx).await?
    }

    pub async fn delete(&self, id: u64) -> Result<(), EngineError> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Delete { id, reply })?;
        Self::wait(rx).await?
    }

    /// Returns every feature whose bounding box intersects `rect`. Queries
    /// block on a full inbox rather than failing.
    pub async fn select(&self, rect: Rect) -> Result<Vec<Feature>, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Select { rect, reply })
            .await
            .map_err(|_| EngineError::Unavailable)?;
        Self::wait(rx).await
    }

    /// Resolves once the snapshot is on disk and the log truncated. No reply
    /// timeout: a large snapshot may legitimately take longer than a
    /// mutation.
    pub async fn checkpoint(&self) -> Result<(), EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Checkpoint { reply })
            .await
            .map_err(|_| EngineError::Unavailable)?;
        rx.await.map_err(|_| EngineError::Unavailable)?
    }

    /// Feeds a foreign-origin transaction to the loop. Returns whether the
    /// record was fresh. Blocks on a full inbox so stream readers apply
    /// backpressure instead of dropping records.
    pub async fn replicate(&self, record: Transaction) -> Result<bool, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Replicate { record, reply })
            .await
            .map_err(|_| EngineError::Unavailable)?;
        rx.await.map_err(|_| EngineError::Unavailable)
    }

    pub async fn stats(&self) -> Result<EngineStats, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Stats { reply })
            .await
            .map_err(|_| EngineError::Unavailable)?;
        Self::wait(rx).await
    }

    /// Asks the loop to drain, sync the log, and stop; resolves when it has.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }
}
