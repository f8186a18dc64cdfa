//! Telemetry configuration from environment variables.

use std::env;
use std::net::SocketAddr;

/// Default bind address of the metrics exporter.
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8003";

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to logs
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Prometheus exporter bind address
    pub metrics_addr: SocketAddr,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "qaku-cache".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            metrics_addr: default_metrics_addr(),
        }
    }
}

fn default_metrics_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8003))
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// - `OTEL_SERVICE_NAME`: Service name (default: qaku-cache)
    /// - `QAKU_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `QAKU_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    /// - `QAKU_METRICS_ADDR`: Exporter address (default: 0.0.0.0:8003)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "qaku-cache".to_string()),

            log_level: env::var("QAKU_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("QAKU_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            metrics_addr: env::var("QAKU_METRICS_ADDR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_metrics_addr),
        }
    }
}
