//! # Qaku Cache Node
//!
//! Listens for Qaku persist announcements and asks a Codex storage node to
//! replicate every dataset that fits the size policy.
//!
//! Configuration comes from the environment; see [`cache_runtime::CacheConfig`]
//! and [`qaku_telemetry::TelemetryConfig`].

use anyhow::{Context, Result};
use cache_runtime::{CacheConfig, CacheNode};
use qaku_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry_config = TelemetryConfig::from_env();
    let telemetry =
        init_telemetry(&telemetry_config).context("Failed to initialize telemetry")?;

    let config = CacheConfig::from_env();

    let mut node = CacheNode::new(config, telemetry.registry(), telemetry_config.metrics_addr)?;
    node.start().await?;

    info!("Cache node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    node.shutdown().await;

    Ok(())
}
