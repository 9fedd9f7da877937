use std::sync::Arc;

use geostore::config::Config;
use geostore::engine::engine::Engine;
use geostore::replication::service::{spawn_connectors, ReplicaRegistry};
use geostore::server;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::from_args(&args) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("{}", e);
            eprintln!(
                "Usage: geostore --name <node> --listen <addr:port> \
                 [--peer <host:port>]... [--leader] [--data-dir <path>]"
            );
            std::process::exit(1);
        }
    };

    tracing::info!(
        name = %config.name,
        listen = %config.listen_addr,
        leader = config.leader,
        peers = config.peers.len(),
        "starting node"
    );

    let registry = Arc::new(ReplicaRegistry::new());
    let engine = Engine::start(
        config.name.clone(),
        config.data_dir.clone(),
        registry.clone(),
    )?;

    spawn_connectors(config.peers.clone(), engine.clone(), registry.clone());

    if let Some(interval) = config.checkpoint_interval {
        let handle = engine.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = handle.checkpoint().await {
                    tracing::warn!(error = %e, "periodic checkpoint failed");
                }
            }
        });
    }

    let listener = TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "listening");

    let router = server::build_router(config.clone(), engine.clone(), registry);
    let shutdown_engine = engine.clone();
    server::serve(listener, router, async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            return;
        }
        tracing::info!("shutting down");
        shutdown_engine.shutdown().await;
    })
    .await?;

    Ok(())
}
