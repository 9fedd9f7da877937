//! Replication API Handler
//!
//! The accept side of the replication mesh: upgrades an incoming peer
//! connection to a streaming session, registers it for broadcast, and reads
//! transaction records into the engine until the peer goes away.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::Extension;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::service::{apply_frame, ReplicaRegistry};
use crate::engine::handle::EngineHandle;
use crate::engine::types::Transaction;

/// Upgrades an incoming peer connection to a replication session.
pub async fn handle_replication(
    ws: WebSocketUpgrade,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Extension(engine): Extension<EngineHandle>,
    Extension(registry): Extension<Arc<ReplicaRegistry>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| accept_session(socket, remote.to_string(), engine, registry))
}

async fn accept_session(
    socket: WebSocket,
    remote: String,
    engine: EngineHandle,
    registry: Arc<ReplicaRegistry>,
) {
    tracing::info!(name = %engine.name(), remote = %remote, "replication session established");

    let (mut sink, mut reader) = socket.split();
    let (tx, mut outgoing) = mpsc::unbounded_channel::<Transaction>();
    registry.register(remote.clone(), tx);

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
            Ok(Message::Text(frame)) => apply_frame(&frame, &engine).await,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    registry.deregister(&remote);
    writer.abort();
    tracing::info!(name = %engine.name(), remote = %remote, "replication session ended");
}
