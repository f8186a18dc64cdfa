//! Adapters Layer
//!
//! - `CodexClient`: storage node ports over the Codex REST API
//! - `PrometheusRecorder`: outcome counters exported to Prometheus
//! - `PersistBusAdapter`: subscription loop feeding the pipeline

pub mod bus_adapter;
pub mod codex;
pub mod prometheus_recorder;

pub use bus_adapter::PersistBusAdapter;
pub use codex::{parse_base_url, CodexClient, CodexClientConfig, NodeInfo, DEFAULT_CODEX_URL};
pub use prometheus_recorder::{PrometheusRecorder, SIZE_BUCKETS_KIB};
