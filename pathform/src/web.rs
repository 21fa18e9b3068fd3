//! HTTP server exposing a [`ConfigManager`] to remote editors.
//!
//! - `GET /fields.json` returns the catalog as a JSON array
//! - `POST /save` applies a nested payload and answers `{success, msg}`

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::Value;
use tower_http::cors::CorsLayer;

use crate::{
    data::field::RawField,
    manager::ConfigManager,
    sync::{
        SaveResponse,
        http::{FIELDS_PATH, SAVE_PATH},
        local::apply_payload,
    },
};

/// Router serving `manager`.
pub fn router(manager: Arc<ConfigManager>) -> Router {
    Router::new()
        .route(FIELDS_PATH, get(fields_handler))
        .route(SAVE_PATH, post(save_handler))
        .layer(CorsLayer::permissive())
        .with_state(manager)
}

/// Serve `manager` on `addr` until the server fails.
pub async fn serve(manager: Arc<ConfigManager>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Starting configuration server on {}", listener.local_addr()?);
    axum::serve(listener, router(manager)).await?;
    Ok(())
}

async fn fields_handler(
    State(manager): State<Arc<ConfigManager>>,
) -> Result<Json<Vec<RawField>>, (StatusCode, String)> {
    manager.raw_fields().map(Json).map_err(|e| {
        error!("failed to list fields: {e:#}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
    })
}

async fn save_handler(
    State(manager): State<Arc<ConfigManager>>,
    Json(payload): Json<Value>,
) -> Json<SaveResponse> {
    Json(apply_payload(&manager, payload))
}
