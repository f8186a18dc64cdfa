//! Outbound Ports (Driven Ports)
//!
//! What the pipeline needs from the storage node. Implemented over HTTP by
//! `adapters::CodexClient`.

use async_trait::async_trait;

use crate::domain::{ContentId, DatasetManifest};
use crate::error::{ResolutionError, TriggerError};

/// Manifest lookup (Driven Port)
///
/// Idempotent; no side effects beyond the query.
#[async_trait]
pub trait ManifestResolver: Send + Sync {
    /// Fetch size metadata of the dataset behind `cid`.
    async fn resolve_manifest(&self, cid: &ContentId) -> Result<DatasetManifest, ResolutionError>;
}

/// Replication request (Driven Port)
///
/// Returns once the storage node accepted the request, not when
/// replication finished.
#[async_trait]
pub trait ReplicationTrigger: Send + Sync {
    async fn trigger_replication(&self, cid: &ContentId) -> Result<(), TriggerError>;
}
