//! Inbound Ports (Driving Ports)
//!
//! The API the bus adapter uses to hand announcements to the pipeline.

use async_trait::async_trait;

use crate::domain::{Outcome, PipelineConfig};

/// Replication pipeline API (Driving Port)
///
/// Every call runs one execution to a terminal [`Outcome`] and records it.
/// Nothing is retried.
#[async_trait]
pub trait ReplicationPipelineApi: Send + Sync {
    /// Decode a raw announcement payload and process it.
    async fn process(&self, payload: &[u8]) -> Outcome;

    /// Account for `count` announcements the bus dropped before they could
    /// be processed. Each is recorded as an admission failure.
    fn record_dropped(&self, count: u64);

    /// Admission, policy and drain settings the pipeline was built with.
    fn config(&self) -> &PipelineConfig;
}
