use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::engine::handle::EngineHandle;
use crate::engine::types::Transaction;

/// Delay between redial attempts once a peer stream has failed.
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Live replication streams, keyed by remote address.
///
/// Stream tasks register and deregister themselves from their own tasks, so
/// the table is shared; the engine loop only ever iterates it to broadcast.
#[derive(Debug, Default)]
pub struct ReplicaRegistry {
    streams: DashMap<String, mpsc::UnboundedSender<Transaction>>,
}

impl ReplicaRegistry {
    pub fn new() -> Self {
        Self {
            streams: DashMap::new(),
        }
    }

    pub fn register(&self, key: String, sender: mpsc::UnboundedSender<Transaction>) {
        if self.streams.insert(key.clone(), sender).is_some() {
            tracing::debug!(remote = %key, "replaced existing replication stream");
        }
    }

    pub fn deregister(&self, key: &str) {
        self.streams.remove(key);
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Queues `record` on every live stream. A failed send is logged and
    /// left to the dial loop to repair; the caller is never blocked.
    pub fn broadcast(&self, record: &Transaction) {
        for entry in self.streams.iter() {
            if entry.value().send(record.clone()).is_err() {
                tracing::warn!(remote = %entry.key(), "failed to queue transaction for replica");
            }
        }
    }
}

/// Spawns one dial loop per peer.
pub fn spawn_connectors(
    peers: Vec<String>,
    engine: EngineHandle,
    registry: Arc<ReplicaRegistry>,
) {
    for peer in peers {
        let engine = engine.clone();
        let registry = registry.clone();
        tokio::spawn(async move {
            connect_loop(peer, engine, registry).await;
        });
    }
}

/// Dials `peer` forever: connect, run the session until it ends, back off,
/// redial.
async fn connect_loop(peer: String, engine: EngineHandle, registry: Arc<ReplicaRegistry>) {
    let url = format!("ws://{}/replication", peer);
    loop {
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                tracing::info!(name = %engine.name(), peer = %peer, "replication stream connected");
                run_session(stream, &peer, &engine, &registry).await;
                tracing::warn!(name = %engine.name(), peer = %peer, "replication stream closed");
            }
            Err(e) => {
                tracing::debug!(name = %engine.name(), peer = %peer, error = %e, "replication dial failed");
            }
        }
        let jitter = rand::random::<u64>() % 500;
        tokio::time::sleep(RECONNECT_BACKOFF + Duration::from_millis(jitter)).await;
    }
}

async fn run_session(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    peer: &str,
    engine: &EngineHandle,
    registry: &ReplicaRegistry,
) {
    let (mut sink, mut reader) = stream.split();
    let (tx, mut outgoing) = mpsc::unbounded_channel::<Transaction>();
    registry.register(peer.to_string(), tx);

    let writer = tokio::spawn(async move {
        while let Some(record) = outgoing.recv().await {
            let frame = match serde_json::to_string(&record) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(error = %e, "failed to encode transaction");
                    continue;
                }
            };
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = reader.next().await {
        match msg {
            Ok(Message::Text(frame)) => apply_frame(&frame, engine).await,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    registry.deregister(peer);
    writer.abort();
}

/// Decodes one stream frame and feeds it to the engine as a replicate
/// command. Shared by the dial side and the accept side.
pub(crate) async fn apply_frame(frame: &str, engine: &EngineHandle) {
    let record: Transaction = match serde_json::from_str(frame) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(error = %e, "discarding malformed replication frame");
            return;
        }
    };
    tracing::debug!(
        name = %engine.name(),
        origin = %record.name,
        lsn = record.lsn,
        action = ?record.action,
        "received transaction"
    );
    if let Err(e) = engine.replicate(record).await {
        tracing::warn!(error = %e, "replicated transaction was not applied");
    }
}
