//! Engine API Handlers
//!
//! HTTP endpoints that expose the engine to clients. These handlers
//! translate requests into engine commands, wait for the reply, and map
//! domain errors onto status codes.
//!
//! They act as the bridge between the Axum web framework and the command
//! loop in `engine.rs`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use geojson::{Feature, FeatureCollection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sysinfo::System;

use super::handle::EngineHandle;
use super::types::EngineError;
use crate::config::Config;
use crate::replication::service::ReplicaRegistry;
use crate::spatial::index::Rect;

fn error_response(err: EngineError) -> Response {
    let status = match &err {
        EngineError::BadRequest(_) => StatusCode::BAD_REQUEST,
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Busy | EngineError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Timeout => StatusCode::ACCEPTED,
        EngineError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if matches!(err, EngineError::Timeout) {
        // The command still runs on the loop after we stop waiting; the
        // client must reconcile with a later select.
        return (status, Json(json!({ "status": "uncertain" }))).into_response();
    }
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

fn not_leader() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": "this node is not the leader" })),
    )
        .into_response()
}

fn parse_feature(body: &str) -> Result<Feature, Response> {
    serde_json::from_str(body).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("invalid GeoJSON feature: {}", e) })),
        )
            .into_response()
    })
}

/// Public insert handler. The feature must not carry an id; the engine
/// assigns one and returns it.
pub async fn handle_insert(
    Extension(engine): Extension<EngineHandle>,
    Extension(config): Extension<Arc<Config>>,
    body: String,
) -> Response {
    if !config.leader {
        return not_leader();
    }
    let feature = match parse_feature(&body) {
        Ok(feature) => feature,
        Err(response) => return response,
    };
    match engine.insert(feature).await {
        Ok(id) => (StatusCode::OK, Json(json!({ "id": id }))).into_response(),
        Err(e) => error_response(e),
    }
}

/// Public replace handler. The feature's id must already exist.
pub async fn handle_replace(
    Extension(engine): Extension<EngineHandle>,
    Extension(config): Extension<Arc<Config>>,
    body: String,
) -> Response {
    if !config.leader {
        return not_leader();
    }
    let feature = match parse_feature(&body) {
        Ok(feature) => feature,
        Err(response) => return response,
    };
    match engine.replace(feature).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response(),
        Err(e) => error_response(e),
    }
}

/// Public delete handler. Accepts either a full feature carrying its id or a
/// bare `{"id": n}` object.
pub async fn handle_delete(
    Extension(engine): Extension<EngineHandle>,
    Extension(config): Extension<Arc<Config>>,
    body: String,
) -> Response {
    if !config.leader {
        return not_leader();
    }
    let value: serde_json::Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("invalid JSON body: {}", e) })),
            )
                .into_response();
        }
    };
    let Some(id) = value.get("id").and_then(|id| id.as_u64()) else {
        return bad_request("body needs a numeric id");
    };
    match engine.delete(id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub struct SelectParams {
    rect: Option<String>,
}

/// Public select handler. Returns every feature whose bounding box
/// intersects the `rect=minx,miny,maxx,maxy` query rectangle, as a GeoJSON
/// FeatureCollection.
pub async fn handle_select(
    Extension(engine): Extension<EngineHandle>,
    Query(params): Query<SelectParams>,
) -> Response {
    let raw = match params.rect {
        Some(raw) => raw,
        None => return bad_request("missing rect parameter"),
    };
    let rect = match Rect::parse(&raw) {
        Some(rect) => rect,
        None => return bad_request("rect must be minx,miny,maxx,maxy"),
    };
    match engine.select(rect).await {
        Ok(features) => {
            let collection = FeatureCollection {
                bbox: None,
                features,
                foreign_members: None,
            };
            (StatusCode::OK, Json(collection)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Triggers a checkpoint; 200 only after the snapshot is fsynced and the
/// transaction log truncated.
pub async fn handle_checkpoint(Extension(engine): Extension<EngineHandle>) -> Response {
    match engine.checkpoint().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Serialize)]
pub struct NodeStatsResponse {
    pub name: String,
    pub leader: bool,
    pub features: usize,
    pub indexed: usize,
    pub wal_records: u64,
    pub vclock: HashMap<String, u64>,
    pub replicas: usize,
    pub cpu_usage: f32,
    pub mem_used_mb: u64,
    pub mem_total_mb: u64,
}

pub async fn handle_stats(
    Extension(engine): Extension<EngineHandle>,
    Extension(config): Extension<Arc<Config>>,
    Extension(registry): Extension<Arc<ReplicaRegistry>>,
) -> Response {
    let stats = match engine.stats().await {
        Ok(stats) => stats,
        Err(e) => return error_response(e),
    };
    let mut sys = System::new_all();
    sys.refresh_cpu();
    sys.refresh_memory();
    let cpu_usage = sys.global_cpu_info().cpu_usage();
    // sysinfo returns bytes for memory values.
    let mem_total_mb = sys.total_memory() / (1024 * 1024);
    let mem_used_mb = sys.used_memory() / (1024 * 1024);

    (
        StatusCode::OK,
        Json(NodeStatsResponse {
            name: stats.name,
            leader: config.leader,
            features: stats.features,
            indexed: stats.indexed,
            wal_records: stats.wal_records,
            vclock: stats.vclock,
            replicas: registry.len(),
            cpu_usage,
            mem_used_mb,
            mem_total_mb,
        }),
    )
        .into_response()
}
