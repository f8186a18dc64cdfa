//! Prometheus registry and `/metrics` exporter.
//!
//! The registry is owned by the node and handed to whoever needs to register
//! collectors; nothing here is process-global, so tests can build as many
//! independent registries as they like.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::core::Collector;
use prometheus::{Encoder, Registry, TextEncoder};
use std::collections::HashMap;
use std::future::Future;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::TelemetryError;

/// Content type of the Prometheus text exposition format.
const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Cheaply clonable handle to a Prometheus registry.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
}

impl MetricsRegistry {
    /// Create a registry whose metrics all carry a `service` label.
    pub fn new(service_name: &str) -> Result<Self, TelemetryError> {
        let labels = HashMap::from([("service".to_string(), service_name.to_string())]);
        let registry = Registry::new_custom(None, Some(labels))
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        Ok(Self { registry })
    }

    /// Create a registry without constant labels.
    pub fn unlabeled() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    /// Register a collector.
    pub fn register(&self, collector: Box<dyn Collector>) -> Result<(), TelemetryError> {
        self.registry
            .register(collector)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }

    /// Encode all metrics as Prometheus text format.
    pub fn encode(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }

    /// Router exposing `GET /metrics`.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(self.clone())
    }
}

async fn metrics_handler(State(registry): State<MetricsRegistry>) -> Response {
    match registry.encode() {
        Ok(body) => ([(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Serve `/metrics` on an already bound listener until `shutdown` resolves.
pub async fn serve_metrics<F>(
    listener: TcpListener,
    registry: MetricsRegistry,
    shutdown: F,
) -> Result<(), TelemetryError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| TelemetryError::Exporter(e.to_string()))?;
    info!(addr = %addr, "Starting metrics exporter");

    axum::serve(listener, registry.router())
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

    info!("Metrics exporter stopped");
    Ok(())
}
