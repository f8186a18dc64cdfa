//! Domain Layer - Pure business logic
//!
//! This layer contains:
//! - Announcement codec (persist envelope -> replication request)
//! - Dataset manifest model
//! - Size policy
//! - Pipeline outcomes and states
//! - Configuration
//!
//! RULES:
//! - No I/O operations
//! - No async code
//! - Pure functions where possible

pub mod announcement;
pub mod config;
pub mod manifest;
pub mod outcome;
pub mod policy;

pub use announcement::{
    decode, Announcement, AnnouncementKind, ContentId, ReplicationRequest, MAX_ANNOUNCEMENT_BYTES,
};
pub use config::{PipelineConfig, PolicyConfig, DEFAULT_MAX_DATASET_SIZE_BYTES};
pub use manifest::{DataContent, DatasetManifest};
pub use outcome::{Outcome, PipelineStage, PipelineState, RejectReason};
pub use policy::{evaluate, PolicyDecision, PolicyDenial};
