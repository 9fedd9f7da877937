use std::collections::HashMap;

use geojson::Feature;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::spatial::index::Rect;

/// The kind of state change a transaction record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Insert,
    Replace,
    Delete,
}

/// One committed mutation.
///
/// The same schema is appended to the transaction log, sent over replication
/// streams, and written into checkpoints. `lsn` is scoped to `name`, the node
/// that first accepted the mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub action: Action,
    pub name: String,
    pub lsn: u64,
    pub feature: Feature,
}

/// Domain errors surfaced by the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("feature {0} not found")]
    NotFound(u64),
    #[error("command queue full")]
    Busy,
    #[error("timed out waiting for the engine")]
    Timeout,
    #[error("engine is not serving")]
    Unavailable,
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Counters reported by the stats endpoint and asserted on in tests.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub name: String,
    pub features: usize,
    pub indexed: usize,
    pub wal_records: u64,
    pub vclock: HashMap<String, u64>,
}

/// Commands accepted by the engine inbox.
///
/// Callers that expect an answer attach a one-shot sender; the loop writes
/// exactly one reply per such command.
#[derive(Debug)]
pub enum Command {
    Select {
        rect: Rect,
        reply: oneshot::Sender<Vec<Feature>>,
    },
    Insert {
        feature: Feature,
        reply: oneshot::Sender<Result<u64, EngineError>>,
    },
    Replace {
        feature: Feature,
        reply: oneshot::Sender<Result<u64, EngineError>>,
    },
    Delete {
        id: u64,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Checkpoint {
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    /// Applies a foreign-origin transaction. Replies with whether the record
    /// was fresh (false means the vector clock had already seen it).
    Replicate {
        record: Transaction,
        reply: oneshot::Sender<bool>,
    },
    Stats {
        reply: oneshot::Sender<EngineStats>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}
