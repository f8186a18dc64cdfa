//! Size policy
//!
//! A dataset is replicated only when its size does not exceed the configured
//! threshold. A denial is an ordinary outcome, not an error.

use std::fmt;

use super::config::PolicyConfig;
use super::manifest::DatasetManifest;

/// Why a dataset was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PolicyDenial {
    pub size_bytes: u64,
    pub max_bytes: u64,
}

impl fmt::Display for PolicyDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dataset too big: {} > {} bytes", self.size_bytes, self.max_bytes)
    }
}

/// Result of evaluating the size policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyDecision {
    Permit,
    Deny(PolicyDenial),
}

impl PolicyDecision {
    pub fn is_permit(&self) -> bool {
        matches!(self, Self::Permit)
    }
}

/// Permit iff `dataset_size_bytes <= max_dataset_size_bytes`.
pub fn evaluate(manifest: &DatasetManifest, config: &PolicyConfig) -> PolicyDecision {
    let max_bytes = config.max_dataset_size_bytes();
    if manifest.dataset_size_bytes <= max_bytes {
        PolicyDecision::Permit
    } else {
        PolicyDecision::Deny(PolicyDenial {
            size_bytes: manifest.dataset_size_bytes,
            max_bytes,
        })
    }
}
