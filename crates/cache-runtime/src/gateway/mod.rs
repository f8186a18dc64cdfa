//! # Read-Through Gateway
//!
//! Lets browsers reach the Codex node behind this cache:
//!
//! - `GET /api/qaku/v1/info`: peer id and first announced address of the node
//! - `GET /api/qaku/v1/snapshot/{cid}`: dataset content streamed from
//!   `GET {codex}/api/codex/v1/data/{cid}`, with the upstream status code

mod cors;

pub use cors::create_cors_layer;

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use qaku_cache::{CodexClient, ContentId, ResolutionError};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::container::GatewayConfig;

/// Gateway request failures.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid content id: {0}")]
    InvalidCid(String),

    #[error("Codex node unavailable: {0}")]
    Upstream(#[from] ResolutionError),

    #[error("Codex node announces no address")]
    NoAnnouncedAddress,

    #[error("Failed to build response: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCid(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::NoAnnouncedAddress => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = status.as_u16(), error = %self, "Gateway request failed");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Body of `GET /api/qaku/v1/info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub peer_id: String,
    pub addr: String,
}

#[derive(Clone)]
struct GatewayState {
    codex: Arc<CodexClient>,
}

/// Build the gateway router with CORS applied.
pub fn router(codex: Arc<CodexClient>, config: &GatewayConfig) -> Router {
    Router::new()
        .route("/api/qaku/v1/info", get(node_info))
        .route("/api/qaku/v1/snapshot/:cid", get(snapshot))
        .layer(create_cors_layer(&config.allowed_origins))
        .with_state(GatewayState { codex })
}

/// Serve `router` on an already bound listener until `shutdown` resolves.
pub async fn serve_gateway<F>(
    listener: TcpListener,
    router: Router,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(addr = %listener.local_addr()?, "Starting read-through gateway");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Read-through gateway stopped");
    Ok(())
}

async fn node_info(
    State(state): State<GatewayState>,
) -> Result<Json<InfoResponse>, GatewayError> {
    let info = state.codex.node_info().await?;
    let addr = info
        .primary_address()
        .ok_or(GatewayError::NoAnnouncedAddress)?;

    Ok(Json(InfoResponse {
        peer_id: info.id.clone(),
        addr: addr.to_string(),
    }))
}

async fn snapshot(
    State(state): State<GatewayState>,
    Path(cid): Path<String>,
) -> Result<Response, GatewayError> {
    let cid = ContentId::parse(&cid).map_err(|e| GatewayError::InvalidCid(e.to_string()))?;
    let upstream = state.codex.fetch_data(&cid).await?;
    debug!(cid = %cid, status = upstream.status().as_u16(), "Relaying snapshot");

    let mut response = Response::builder().status(upstream.status());
    for name in [header::CONTENT_TYPE, header::CONTENT_LENGTH] {
        if let Some(value) = upstream.headers().get(&name) {
            response = response.header(name, value.clone());
        }
    }

    response
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| GatewayError::Internal(e.to_string()))
}
