//! # Qaku Cache Node Runtime
//!
//! Wires the message bus, the Codex client and the replication pipeline
//! together and runs them until shutdown. The `qaku-cache` binary is a thin
//! wrapper around [`CacheNode`].
//!
//! ## Flow
//!
//! ```text
//! Waku node ──REST──→ WakuRelayBridge ──→ Message Bus
//!                                              │ persist topic
//!                                              ↓
//!                                      PersistBusAdapter ──→ ReplicationPipeline ──→ Codex
//!                                                                    │                 ↑
//!                                                                    ↓                 │
//!                                                          Prometheus /metrics         │
//!                                                                                      │
//! Browser ──/api/qaku/v1──→ read-through gateway ──────────────────────────────────────┘
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Build components from [`CacheConfig`]
//! 2. Bind and serve the metrics exporter and the read-through gateway
//! 3. Start the bus adapter (and the relay bridge, if configured)
//! 4. Check the Codex node; an unreachable node is logged, never fatal

#![allow(clippy::type_complexity)]

pub mod container;
pub mod gateway;
pub mod relay;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use qaku_cache::PrometheusRecorder;
use qaku_telemetry::{serve_metrics, MetricsRegistry};
use shared_bus::{InMemoryMessageBus, MessagePublisher};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub use crate::container::{
    CacheComponents, CacheConfig, CodexPipeline, GatewayConfig, RelayConfig,
};
pub use crate::gateway::{GatewayError, InfoResponse};
pub use crate::relay::{RelayError, WakuRelayBridge};

/// Grace period on top of the pipeline drain timeout when joining tasks.
const JOIN_GRACE: Duration = Duration::from_secs(1);

/// A running (or ready to run) cache node.
pub struct CacheNode {
    components: CacheComponents,
    metrics_addr: SocketAddr,
    gateway_addr: Option<SocketAddr>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl CacheNode {
    /// Create a node. Nothing runs until [`CacheNode::start`].
    pub fn new(
        config: CacheConfig,
        registry: MetricsRegistry,
        metrics_addr: SocketAddr,
    ) -> Result<Self> {
        info!("Creating Qaku cache node");

        let components = CacheComponents::new(config, registry)?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            components,
            metrics_addr,
            gateway_addr: None,
            shutdown_tx,
            shutdown_rx,
            tasks: Vec::new(),
        })
    }

    /// Start all tasks. Returns the address the metrics exporter is bound to.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        info!("===========================================");
        info!("  Qaku Cache Node v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let metrics_addr = self.start_metrics_exporter().await?;
        let gateway_addr = self.start_gateway().await?;
        self.start_bus_adapter();
        self.start_relay_bridge()?;
        self.check_codex().await;

        info!(
            metrics = %metrics_addr,
            gateway = %gateway_addr,
            topic = %self.components.config.content_topic,
            "Cache node running"
        );
        Ok(metrics_addr)
    }

    async fn start_metrics_exporter(&mut self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(self.metrics_addr)
            .await
            .with_context(|| format!("Failed to bind metrics exporter on {}", self.metrics_addr))?;
        let bound = listener
            .local_addr()
            .context("Failed to read metrics exporter address")?;

        let registry = self.components.registry.clone();
        let mut shutdown = self.shutdown_rx.clone();
        let handle = tokio::spawn(async move {
            let signal = async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            };
            if let Err(e) = serve_metrics(listener, registry, signal).await {
                error!(error = %e, "Metrics exporter failed");
            }
        });
        self.tasks.push(("metrics", handle));
        Ok(bound)
    }

    async fn start_gateway(&mut self) -> Result<SocketAddr> {
        let addr = self.components.config.gateway.listen_addr;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind read-through gateway on {addr}"))?;
        let bound = listener
            .local_addr()
            .context("Failed to read gateway address")?;

        let router = gateway::router(
            Arc::clone(&self.components.codex),
            &self.components.config.gateway,
        );
        let mut shutdown = self.shutdown_rx.clone();
        let handle = tokio::spawn(async move {
            let signal = async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            };
            if let Err(e) = gateway::serve_gateway(listener, router, signal).await {
                error!(error = %e, "Read-through gateway failed");
            }
        });
        self.tasks.push(("gateway", handle));
        self.gateway_addr = Some(bound);
        Ok(bound)
    }

    fn start_bus_adapter(&mut self) {
        let adapter = Arc::clone(&self.components.adapter);
        let handle = tokio::spawn(adapter.run(self.shutdown_rx.clone()));
        self.tasks.push(("bus-adapter", handle));
    }

    fn start_relay_bridge(&mut self) -> Result<()> {
        let Some(relay) = self.components.config.relay.as_ref() else {
            info!("WAKU_REST_URL not set, relay bridge disabled");
            return Ok(());
        };

        let bridge = WakuRelayBridge::new(
            relay,
            self.components.config.content_topic.clone(),
            self.components.bus.clone(),
        )
        .context("Failed to create Waku relay bridge")?;
        let handle = tokio::spawn(bridge.run(self.shutdown_rx.clone()));
        self.tasks.push(("relay-bridge", handle));
        Ok(())
    }

    async fn check_codex(&self) {
        match self.components.codex.node_info().await {
            Ok(info) => info!(
                node_id = %info.id,
                addresses = info.announce_addresses.len(),
                "Connected to Codex node"
            ),
            Err(e) => warn!(
                error = %e,
                url = %self.components.codex.base_url(),
                "Codex node not reachable yet, continuing"
            ),
        }
    }

    /// Signal shutdown and wait for every task to finish.
    ///
    /// Executions still running after the drain timeout are aborted by the
    /// bus adapter.
    pub async fn shutdown(self) {
        info!("Initiating graceful shutdown...");

        if self.shutdown_tx.send(true).is_err() {
            warn!("All tasks already stopped");
        }

        let deadline = self.components.config.pipeline.drain_timeout + JOIN_GRACE;
        for (name, handle) in self.tasks {
            match tokio::time::timeout(deadline, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(task = name, error = %e, "Task ended abnormally"),
                Err(_) => warn!(task = name, "Task did not stop in time"),
            }
        }

        info!(
            published = self.components.bus.messages_published(),
            dispatched = self.components.adapter.dispatched(),
            "Shutdown complete"
        );
    }

    /// Address the read-through gateway is bound to, once started.
    pub fn gateway_addr(&self) -> Option<SocketAddr> {
        self.gateway_addr
    }

    /// The in-process bus announcements are published on.
    pub fn bus(&self) -> Arc<InMemoryMessageBus> {
        Arc::clone(&self.components.bus)
    }

    pub fn recorder(&self) -> Arc<PrometheusRecorder> {
        Arc::clone(&self.components.recorder)
    }

    pub fn components(&self) -> &CacheComponents {
        &self.components
    }
}
