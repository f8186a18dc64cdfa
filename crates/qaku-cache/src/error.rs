//! Error types for the replication pipeline

use thiserror::Error;

/// The announcement payload could not be turned into a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Announcement too large: {size} > {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("Malformed announcement: {0}")]
    Malformed(String),

    #[error("Unknown announcement kind: {0}")]
    UnknownKind(String),

    #[error("Announcement has no content identifier")]
    MissingContentId,
}

/// The storage node could not produce a manifest for a content identifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Dataset not found: {cid}")]
    NotFound { cid: String },

    #[error("Storage node unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed manifest: {0}")]
    Malformed(String),
}

/// The storage node did not accept the replication request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TriggerError {
    #[error("Replication request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Replication request failed: {0}")]
    Transport(String),
}

/// Invalid static configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Maximum dataset size must be greater than zero")]
    ZeroMaxDatasetSize,

    #[error("Maximum in-flight executions must be greater than zero")]
    ZeroMaxInFlight,

    #[error("Invalid storage node URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Terminal failure of a single pipeline execution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Trigger(#[from] TriggerError),

    #[error("Internal fault: {0}")]
    Internal(String),
}
