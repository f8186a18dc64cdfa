//! # Qaku Telemetry
//!
//! Logging and metrics plumbing for the cache node.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` with an env filter, plain or JSON output
//! - **Metrics**: a node-owned Prometheus [`MetricsRegistry`] and an HTTP
//!   exporter serving `/metrics`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qaku_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! let telemetry = init_telemetry(&config)?;
//! let registry = telemetry.registry();
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `qaku-cache` | Service name attached to logs |
//! | `QAKU_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `QAKU_JSON_LOGS` | `false` (`true` in containers) | JSON formatted logs |
//! | `QAKU_METRICS_ADDR` | `0.0.0.0:8003` | Metrics exporter bind address |

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{serve_metrics, MetricsRegistry};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Metrics exporter failed: {0}")]
    Exporter(String),
}

/// Initialize logging and create the node's metrics registry.
///
/// Call once per process; a second call fails because the global
/// subscriber is already set.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<Telemetry, TelemetryError> {
    init_logging(config)?;

    let registry = MetricsRegistry::new(&config.service_name)?;

    tracing::info!(
        service = %config.service_name,
        metrics_addr = %config.metrics_addr,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(Telemetry { registry })
}

/// Handle returned by [`init_telemetry`].
pub struct Telemetry {
    registry: MetricsRegistry,
}

impl Telemetry {
    /// The registry collectors should be registered into.
    pub fn registry(&self) -> MetricsRegistry {
        self.registry.clone()
    }
}
