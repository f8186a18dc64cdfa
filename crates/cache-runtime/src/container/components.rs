//! # Component Container
//!
//! Builds every long-lived component of a cache node from its configuration.
//!
//! ```text
//! Waku relay bridge ──publish──→ Message Bus ──persist topic──→ PersistBusAdapter
//!                                                                     │
//!                                                          ReplicationPipeline
//!                                                            │            │
//!                                                      CodexClient   PrometheusRecorder
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use qaku_cache::{CodexClient, PersistBusAdapter, PrometheusRecorder, ReplicationPipeline};
use qaku_telemetry::MetricsRegistry;
use shared_bus::InMemoryMessageBus;
use tracing::info;

use crate::container::config::CacheConfig;

/// Pipeline resolving and triggering through one Codex client.
pub type CodexPipeline = ReplicationPipeline<CodexClient, CodexClient>;

/// Central container holding the node's components.
pub struct CacheComponents {
    pub config: CacheConfig,
    /// In-process message bus.
    pub bus: Arc<InMemoryMessageBus>,
    /// Storage node client, used as both resolver and trigger.
    pub codex: Arc<CodexClient>,
    pub recorder: Arc<PrometheusRecorder>,
    pub pipeline: Arc<CodexPipeline>,
    /// Subscription loop feeding the pipeline.
    pub adapter: Arc<PersistBusAdapter<CodexPipeline>>,
    pub registry: MetricsRegistry,
}

impl CacheComponents {
    /// Build all components and register metrics with `registry`.
    pub fn new(config: CacheConfig, registry: MetricsRegistry) -> Result<Self> {
        let bus = Arc::new(InMemoryMessageBus::with_capacity(config.bus_capacity));

        let codex = Arc::new(
            CodexClient::new(&config.codex).context("Failed to create Codex client")?,
        );

        let recorder = Arc::new(
            PrometheusRecorder::new(&registry).context("Failed to register cache metrics")?,
        );

        let pipeline = Arc::new(
            ReplicationPipeline::new(
                Arc::clone(&codex),
                Arc::clone(&codex),
                recorder.clone(),
                config.pipeline.clone(),
            )
            .context("Invalid pipeline configuration")?,
        );

        let adapter = Arc::new(PersistBusAdapter::new(
            bus.clone(),
            Arc::clone(&pipeline),
            config.content_topic.clone(),
        ));

        info!(
            codex = %codex.base_url(),
            topic = %config.content_topic,
            bus_capacity = bus.capacity(),
            max_dataset_size = config.pipeline.policy.max_dataset_size_bytes(),
            max_in_flight = config.pipeline.max_in_flight,
            dedupe_in_flight = config.pipeline.dedupe_in_flight,
            "Cache components initialized"
        );

        Ok(Self {
            config,
            bus,
            codex,
            recorder,
            pipeline,
            adapter,
            registry,
        })
    }
}
