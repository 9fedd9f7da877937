//! Engine State & Command Loop
//!
//! Owns every piece of mutable node state. The loop spawned by
//! [`Engine::start`] is the sole writer; everything else talks to it through
//! the channel held by an [`EngineHandle`](super::handle::EngineHandle).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use geojson::Feature;
use tokio::sync::mpsc;

use super::handle::EngineHandle;
use super::types::{Action, Command, EngineError, EngineStats, Transaction};
use crate::feature::types::{assign_feature_id, feature_bounds, feature_id};
use crate::replication::service::ReplicaRegistry;
use crate::spatial::index::{Rect, SpatialIndex};
use crate::wal::checkpoint;
use crate::wal::log::TransactionLog;

/// Inbox depth. Mutation submitters that find it full get `Busy`.
pub const COMMAND_CHANNEL_CAPACITY: usize = 10;

/// A stored feature plus the bookkeeping the engine keeps around it: the
/// last transaction that wrote it and the bounds it is indexed under.
#[derive(Debug, Clone)]
struct StoredFeature {
    origin: String,
    lsn: u64,
    bounds: Rect,
    feature: Feature,
}

pub struct Engine {
    name: String,
    data: HashMap<u64, StoredFeature>,
    index: SpatialIndex,
    vclock: HashMap<String, u64>,
    wal: TransactionLog,
    wal_records: u64,
    checkpoint_path: PathBuf,
    vclock_path: PathBuf,
    replicas: Arc<ReplicaRegistry>,
    rx: mpsc::Receiver<Command>,
}

impl Engine {
    /// Recovers persisted state from `data_dir` and spawns the command loop.
    ///
    /// Recovery happens before the returned handle can reach the loop, so no
    /// command ever observes a partially replayed engine.
    pub fn start(
        name: impl Into<String>,
        data_dir: impl Into<PathBuf>,
        replicas: Arc<ReplicaRegistry>,
    ) -> Result<EngineHandle, EngineError> {
        let name = name.into();
        let data_dir = data_dir.into();
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let wal = TransactionLog::open(data_dir.join(format!("transaction_{}.log", name)))?;
        let mut engine = Engine {
            name: name.clone(),
            data: HashMap::new(),
            index: SpatialIndex::new(),
            vclock: HashMap::new(),
            wal,
            wal_records: 0,
            checkpoint_path: data_dir.join(format!("checkpoint_{}.json", name)),
            vclock_path: data_dir.join(format!("vclock_{}.json", name)),
            replicas,
            rx,
        };
        engine.recover()?;
        tokio::spawn(engine.run());

        Ok(EngineHandle::new(name, tx))
    }

    pub async fn run(mut self) {
        tracing::info!(name = %self.name, "engine loop started");

        while let Some(cmd) = self.rx.recv().await {
            if let Command::Shutdown { reply } = cmd {
                self.rx.close();
                self.drain();
                if let Err(e) = self.wal.sync() {
                    tracing::error!(name = %self.name, error = %e, "final log sync failed");
                }
                let _ = reply.send(());
                break;
            }
            self.dispatch(cmd);
        }

        tracing::info!(name = %self.name, "engine loop stopped");
    }

    fn dispatch(&mut self, cmd: Command) {
        match cmd {
            Command::Select { rect, reply } => {
                let _ = reply.send(self.select(rect));
            }
            Command::Insert { feature, reply } => {
                let _ = reply.send(self.insert(feature));
            }
            Command::Replace { feature, reply } => {
                let _ = reply.send(self.replace(feature));
            }
            Command::Delete { id, reply } => {
                let _ = reply.send(self.delete(id));
            }
            Command::Checkpoint { reply } => {
                let _ = reply.send(self.checkpoint());
            }
            Command::Replicate { record, reply } => {
                let _ = reply.send(self.apply_remote(record, true));
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
            // A second shutdown while already draining just gets its ack.
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    /// Finishes commands that were already queued when shutdown began.
    fn drain(&mut self) {
        while let Ok(cmd) = self.rx.try_recv() {
            self.dispatch(cmd);
        }
    }

    // --- local mutations -------------------------------------------------

    fn next_lsn(&mut self) -> u64 {
        let entry = self.vclock.entry(self.name.clone()).or_insert(0);
        *entry += 1;
        *entry
    }

    fn insert(&mut self, mut feature: Feature) -> Result<u64, EngineError> {
        let bounds = feature_bounds(&feature).ok_or_else(|| {
            EngineError::BadRequest("feature needs a geometry with finite bounds".into())
        })?;
        let lsn = self.next_lsn();
        assign_feature_id(&mut feature, lsn);
        self.data.insert(
            lsn,
            StoredFeature {
                origin: self.name.clone(),
                lsn,
                bounds,
                feature: feature.clone(),
            },
        );
        self.index.insert(lsn, bounds);
        self.commit_local(Action::Insert, lsn, feature);
        Ok(lsn)
    }

    fn replace(&mut self, feature: Feature) -> Result<u64, EngineError> {
        let id = feature_id(&feature).ok_or_else(|| {
            EngineError::BadRequest("replace needs a numeric feature id".into())
        })?;
        let bounds = feature_bounds(&feature).ok_or_else(|| {
            EngineError::BadRequest("feature needs a geometry with finite bounds".into())
        })?;
        let old = match self.data.remove(&id) {
            Some(old) => old,
            None => return Err(EngineError::NotFound(id)),
        };
        let lsn = self.next_lsn();
        // The tree keys on (id, bounds): drop the old entry before the new
        // bounds go in, or a moved feature would be indexed twice.
        self.index.remove(id, old.bounds);
        self.data.insert(
            id,
            StoredFeature {
                origin: self.name.clone(),
                lsn,
                bounds,
                feature: feature.clone(),
            },
        );
        self.index.insert(id, bounds);
        self.commit_local(Action::Replace, lsn, feature);
        Ok(lsn)
    }

    fn delete(&mut self, id: u64) -> Result<(), EngineError> {
        let old = match self.data.remove(&id) {
            Some(old) => old,
            None => return Err(EngineError::NotFound(id)),
        };
        let lsn = self.next_lsn();
        self.index.remove(id, old.bounds);
        self.commit_local(Action::Delete, lsn, old.feature);
        Ok(())
    }

    /// Logs and broadcasts an accepted local mutation. The indexes were
    /// already updated by the caller; this is steps four and five of the
    /// pipeline.
    fn commit_local(&mut self, action: Action, lsn: u64, feature: Feature) {
        let record = Transaction {
            action,
            name: self.name.clone(),
            lsn,
            feature,
        };
        self.append_wal(&record);
        self.replicas.broadcast(&record);
    }

    fn append_wal(&mut self, record: &Transaction) {
        // An append failure keeps the in-memory state and keeps serving; the
        // mutation is then only as durable as the next successful sync.
        match self.wal.append(record) {
            Ok(()) => self.wal_records += 1,
            Err(e) => {
                tracing::error!(name = %self.name, error = %e, "transaction log append failed");
            }
        }
    }

    fn select(&self, rect: Rect) -> Vec<Feature> {
        let mut results = Vec::new();
        self.index.search(rect, |id| {
            if let Some(stored) = self.data.get(&id) {
                results.push(stored.feature.clone());
            }
            true
        });
        results
    }

    // --- replication -----------------------------------------------------

    /// The replicate path: stale records are dropped against the vector
    /// clock, fresh ones are applied with their authoritative id and lsn and
    /// never re-broadcast. `durable` is false only during startup replay,
    /// which must not write the log it is reading.
    fn apply_remote(&mut self, record: Transaction, durable: bool) -> bool {
        let seen = self.vclock.get(&record.name).copied().unwrap_or(0);
        if record.lsn <= seen {
            tracing::debug!(
                name = %self.name,
                origin = %record.name,
                lsn = record.lsn,
                seen,
                "dropping stale transaction"
            );
            return false;
        }
        self.apply_record(&record);
        if durable {
            self.append_wal(&record);
        }
        self.vclock.insert(record.name.clone(), record.lsn);
        true
    }

    /// Applies a record's effect to both indexes, keyed by the record's own
    /// feature id.
    fn apply_record(&mut self, record: &Transaction) {
        let Some(id) = feature_id(&record.feature) else {
            tracing::warn!(
                name = %self.name,
                origin = %record.name,
                lsn = record.lsn,
                "transaction without a numeric feature id; skipping"
            );
            return;
        };
        match record.action {
            Action::Insert | Action::Replace => {
                let Some(bounds) = feature_bounds(&record.feature) else {
                    tracing::warn!(
                        name = %self.name,
                        origin = %record.name,
                        lsn = record.lsn,
                        "transaction without usable geometry; skipping"
                    );
                    return;
                };
                if let Some(old) = self.data.remove(&id) {
                    self.index.remove(id, old.bounds);
                }
                self.data.insert(
                    id,
                    StoredFeature {
                        origin: record.name.clone(),
                        lsn: record.lsn,
                        bounds,
                        feature: record.feature.clone(),
                    },
                );
                self.index.insert(id, bounds);
            }
            Action::Delete => {
                if let Some(old) = self.data.remove(&id) {
                    self.index.remove(id, old.bounds);
                }
            }
        }
    }

    // --- checkpoint & recovery -------------------------------------------

    /// Snapshots the primary index and truncates the log. Runs entirely on
    /// the loop, so no mutation interleaves with any step.
    fn checkpoint(&mut self) -> Result<(), EngineError> {
        let records: Vec<Transaction> = self
            .data
            .values()
            .map(|stored| Transaction {
                action: Action::Insert,
                name: stored.origin.clone(),
                lsn: stored.lsn,
                feature: stored.feature.clone(),
            })
            .collect();

        // Vector clock first: if we crash between the renames the persisted
        // clock is merely newer, which is safe because it only ever grows.
        checkpoint::write_vclock(&self.vclock_path, &self.vclock)?;
        checkpoint::write(&self.checkpoint_path, &records)?;
        self.wal.truncate()?;
        self.wal_records = 0;

        tracing::info!(name = %self.name, features = records.len(), "checkpoint written");
        Ok(())
    }

    fn recover(&mut self) -> Result<(), EngineError> {
        self.vclock = checkpoint::load_vclock(&self.vclock_path)?;

        let snapshot = checkpoint::load(&self.checkpoint_path)?;
        let snapshot_len = snapshot.len();
        for record in snapshot {
            self.restore(record);
        }

        let log = self.wal.replay()?;
        self.wal_records = log.len() as u64;
        let mut replayed = 0usize;
        for record in log {
            if self.apply_remote(record, false) {
                replayed += 1;
            }
        }

        if snapshot_len > 0 || replayed > 0 {
            tracing::info!(
                name = %self.name,
                snapshot = snapshot_len,
                log = replayed,
                "recovered persisted state"
            );
        }
        Ok(())
    }

    /// Applies one checkpoint record. A snapshot is authoritative, so the
    /// staleness guard does not apply; the vector clock is rebuilt as a
    /// running maximum per origin.
    fn restore(&mut self, record: Transaction) {
        let entry = self.vclock.entry(record.name.clone()).or_insert(0);
        if record.lsn > *entry {
            *entry = record.lsn;
        }
        self.apply_record(&record);
    }

    fn stats(&self) -> EngineStats {
        EngineStats {
            name: self.name.clone(),
            features: self.data.len(),
            indexed: self.index.len(),
            wal_records: self.wal_records,
            vclock: self.vclock.clone(),
        }
    }
}
