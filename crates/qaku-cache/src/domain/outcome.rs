//! Terminal outcomes and execution states

use std::fmt;

use super::policy::PolicyDenial;
use crate::error::PipelineError;
use crate::metrics::MetricsRecorder;

/// Stage of the pipeline an outcome is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Decode,
    Resolve,
    Policy,
    Trigger,
    Admission,
    Internal,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 6] = [
        Self::Decode,
        Self::Resolve,
        Self::Policy,
        Self::Trigger,
        Self::Admission,
        Self::Internal,
    ];

    /// Label used in metrics and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Resolve => "resolve",
            Self::Policy => "policy",
            Self::Trigger => "trigger",
            Self::Admission => "admission",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of one execution.
///
/// `Received -> Decoded -> ManifestResolved -> PolicyEvaluated ->
/// {ReplicationTriggered | PolicyDenied} -> Recorded`. Any failure jumps
/// straight to `Recorded`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Decoded,
    ManifestResolved,
    PolicyEvaluated,
    ReplicationTriggered,
    PolicyDenied,
    Recorded,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Decoded => "decoded",
            Self::ManifestResolved => "manifest_resolved",
            Self::PolicyEvaluated => "policy_evaluated",
            Self::ReplicationTriggered => "replication_triggered",
            Self::PolicyDenied => "policy_denied",
            Self::Recorded => "recorded",
        }
    }
}

/// Why an announcement was refused without an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// The dataset exceeds the size threshold.
    PolicyDenied(PolicyDenial),
    /// Another execution for the same content identifier is running.
    AlreadyInFlight,
}

/// Terminal result of processing one announcement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Succeeded { size_bytes: u64 },
    Rejected(RejectReason),
    Failed(PipelineError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Stage the outcome is attributed to.
    ///
    /// Successes are attributed to `Trigger`, the last stage they pass.
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Succeeded { .. } => PipelineStage::Trigger,
            Self::Rejected(RejectReason::PolicyDenied(_)) => PipelineStage::Policy,
            Self::Rejected(RejectReason::AlreadyInFlight) => PipelineStage::Admission,
            Self::Failed(PipelineError::Decode(_)) => PipelineStage::Decode,
            Self::Failed(PipelineError::Resolution(_)) => PipelineStage::Resolve,
            Self::Failed(PipelineError::Trigger(_)) => PipelineStage::Trigger,
            Self::Failed(PipelineError::Internal(_)) => PipelineStage::Internal,
        }
    }

    /// Account for this outcome: one success with a size observation, or one
    /// failure labelled by stage.
    pub fn record_into(&self, recorder: &dyn MetricsRecorder) {
        match self {
            Self::Succeeded { size_bytes } => recorder.record_success(*size_bytes),
            _ => recorder.record_failure(self.stage()),
        }
    }
}
