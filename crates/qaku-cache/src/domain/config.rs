//! Pipeline configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use qaku_cache::domain::{PipelineConfig, PolicyConfig};
//!
//! let config = PipelineConfig::new(PolicyConfig::new(10 * 1024 * 1024)?)
//!     .with_max_in_flight(16)
//!     .with_dedupe_in_flight(true);
//! config.validate()?;
//! ```

use std::num::NonZeroU64;
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;

/// Default maximum dataset size accepted for replication (5 MiB).
pub const DEFAULT_MAX_DATASET_SIZE_BYTES: u64 = 5 * 1024 * 1024;

const DEFAULT_MAX_DATASET_SIZE: NonZeroU64 = match NonZeroU64::new(DEFAULT_MAX_DATASET_SIZE_BYTES) {
    Some(size) => size,
    None => panic!("default dataset size must be non-zero"),
};

/// Default bound on concurrently running executions.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Default time the subscription loop waits for running executions on exit.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Size policy threshold. Always greater than zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PolicyConfig {
    max_dataset_size_bytes: NonZeroU64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_dataset_size_bytes: DEFAULT_MAX_DATASET_SIZE,
        }
    }
}

impl PolicyConfig {
    /// Create a policy with the given threshold in bytes.
    pub fn new(max_dataset_size_bytes: u64) -> Result<Self, ConfigError> {
        NonZeroU64::new(max_dataset_size_bytes)
            .map(|max_dataset_size_bytes| Self {
                max_dataset_size_bytes,
            })
            .ok_or(ConfigError::ZeroMaxDatasetSize)
    }

    /// Build a policy from a raw environment value.
    ///
    /// Missing, unparsable, zero or negative values keep the default.
    pub fn from_env_value(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };

        match raw.trim().parse::<i64>() {
            Ok(value) if value > 0 => Self::new(value as u64).unwrap_or_default(),
            Ok(value) => {
                warn!(value, "Maximum dataset size must be positive, using default");
                Self::default()
            }
            Err(e) => {
                warn!(value = raw, error = %e, "Invalid maximum dataset size, using default");
                Self::default()
            }
        }
    }

    /// Largest dataset, in bytes, that may be replicated.
    pub fn max_dataset_size_bytes(&self) -> u64 {
        self.max_dataset_size_bytes.get()
    }
}

/// Settings of one replication pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    pub policy: PolicyConfig,
    /// Upper bound on concurrently running executions.
    pub max_in_flight: usize,
    /// Reject an announcement whose content identifier is already being processed.
    pub dedupe_in_flight: bool,
    /// How long shutdown waits for running executions.
    pub drain_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}

impl PipelineConfig {
    pub fn new(policy: PolicyConfig) -> Self {
        Self {
            policy,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            dedupe_in_flight: false,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn with_dedupe_in_flight(mut self, enabled: bool) -> Self {
        self.dedupe_in_flight = enabled;
        self
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_in_flight == 0 {
            return Err(ConfigError::ZeroMaxInFlight);
        }
        Ok(())
    }
}
