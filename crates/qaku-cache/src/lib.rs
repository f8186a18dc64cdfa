//! # Qaku Cache
//!
//! Replication trigger pipeline for the Qaku cache node: watches persist
//! announcements and asks a Codex storage node to replicate the referenced
//! datasets, subject to a size policy.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure business logic, no I/O
//!   - `decode`: announcement codec
//!   - `DatasetManifest`: size metadata reported by the storage node
//!   - `evaluate`: size policy
//!   - `Outcome`, `PipelineStage`: terminal results and their attribution
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `ReplicationPipelineApi`: Driving port (inbound API)
//!   - `ManifestResolver`, `ReplicationTrigger`: Driven ports (storage node)
//!
//! - **Service Layer** (`service/`): Orchestration
//!   - `ReplicationPipeline`: Implements `ReplicationPipelineApi`
//!
//! - **Adapters Layer** (`adapters/`): External connections
//!   - `CodexClient`: Codex REST API
//!   - `PrometheusRecorder`: `qaku_cache_*` metrics
//!   - `PersistBusAdapter`: Bus subscription loop with an admission gate
//!
//! ## Flow
//!
//! ```text
//! bus message -> decode -> resolve manifest -> size policy -> trigger -> record
//!                  |             |                  |            |
//!                  +-------------+------ failure ---+------------+--> record
//! ```
//!
//! Every announcement is recorded exactly once, as one success (with a size
//! observation) or one failure labelled by stage. Nothing is retried.
//!
//! ## Wiring to Runtime
//!
//! ```ignore
//! use qaku_cache::{CodexClient, CodexClientConfig, PersistBusAdapter, PipelineConfig,
//!                  PrometheusRecorder, ReplicationPipeline};
//! use shared_bus::{ContentTopic, InMemoryMessageBus, QAKU_PERSIST_TOPIC};
//! use std::sync::Arc;
//!
//! let bus = Arc::new(InMemoryMessageBus::new());
//! let codex = Arc::new(CodexClient::new(&CodexClientConfig::default())?);
//! let recorder = Arc::new(PrometheusRecorder::new(&registry)?);
//! let config = PipelineConfig::default();
//! let pipeline = Arc::new(ReplicationPipeline::new(codex.clone(), codex, recorder, config)?);
//!
//! // Gate size and drain timeout are read from the pipeline's config.
//! let adapter = Arc::new(PersistBusAdapter::new(
//!     bus.clone(),
//!     pipeline,
//!     ContentTopic::new(QAKU_PERSIST_TOPIC),
//! ));
//! tokio::spawn(adapter.run(shutdown_rx));
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports for convenience
pub use domain::{
    decode, Announcement, AnnouncementKind, ContentId, DatasetManifest, Outcome, PipelineConfig,
    PipelineStage, PolicyConfig, PolicyDecision, RejectReason, ReplicationRequest,
};
pub use error::{ConfigError, DecodeError, PipelineError, ResolutionError, TriggerError};
pub use metrics::{Metrics, MetricsRecorder, MetricsSnapshot};
pub use ports::{ManifestResolver, ReplicationPipelineApi, ReplicationTrigger};
pub use service::{InFlightRegistry, ReplicationPipeline};

pub use adapters::{
    parse_base_url, CodexClient, CodexClientConfig, NodeInfo, PersistBusAdapter,
    PrometheusRecorder, DEFAULT_CODEX_URL,
};
