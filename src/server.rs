//! Node Router
//!
//! Wires the engine and replication handlers into one Axum router and serves
//! it. Split out of `main.rs` so the integration tests can stand up the
//! exact router the binary runs.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Extension;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::engine::handle::EngineHandle;
use crate::engine::handlers::{
    handle_checkpoint, handle_delete, handle_insert, handle_replace, handle_select, handle_stats,
};
use crate::replication::handlers::handle_replication;
use crate::replication::service::ReplicaRegistry;

/// Builds the per-node router: the public feature API, the checkpoint
/// trigger, the replication upgrade endpoint, and node stats.
pub fn build_router(
    config: Arc<Config>,
    engine: EngineHandle,
    registry: Arc<ReplicaRegistry>,
) -> Router {
    Router::new()
        .route("/insert", post(handle_insert))
        .route("/replace", post(handle_replace))
        .route("/delete", post(handle_delete))
        .route("/select", get(handle_select))
        .route("/checkpoint", post(handle_checkpoint))
        .route("/replication", get(handle_replication))
        .route("/health/stats", get(handle_stats))
        .layer(Extension(engine))
        .layer(Extension(registry))
        .layer(Extension(config))
}

/// Serves `router` on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}
