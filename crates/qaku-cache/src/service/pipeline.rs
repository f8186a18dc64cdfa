//! Replication Pipeline
//!
//! Drives one announcement through decode, manifest resolution, the size
//! policy and the replication trigger, then records the outcome. Every
//! execution is recorded exactly once, whatever branch it takes.

use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, field, info, info_span, warn, Instrument, Span};

use crate::domain::{
    decode, evaluate, Outcome, PipelineConfig, PipelineStage, PipelineState, PolicyDecision,
    RejectReason, ReplicationRequest,
};
use crate::error::{ConfigError, PipelineError};
use crate::metrics::MetricsRecorder;
use crate::ports::{ManifestResolver, ReplicationPipelineApi, ReplicationTrigger};
use crate::service::InFlightRegistry;

/// Replication pipeline implementation
///
/// Implements the `ReplicationPipelineApi` port using injected storage node
/// ports and an outcome recorder.
pub struct ReplicationPipeline<R: ManifestResolver, T: ReplicationTrigger> {
    resolver: Arc<R>,
    trigger: Arc<T>,
    recorder: Arc<dyn MetricsRecorder>,
    config: PipelineConfig,
    in_flight: Option<InFlightRegistry>,
}

impl<R: ManifestResolver, T: ReplicationTrigger> ReplicationPipeline<R, T> {
    /// Create a pipeline. Fails if `config` does not validate.
    pub fn new(
        resolver: Arc<R>,
        trigger: Arc<T>,
        recorder: Arc<dyn MetricsRecorder>,
        config: PipelineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let in_flight = config.dedupe_in_flight.then(InFlightRegistry::new);

        Ok(Self {
            resolver,
            trigger,
            recorder,
            config,
            in_flight,
        })
    }

    /// Record `outcome` and log it.
    fn finish(&self, cid: Option<&str>, outcome: Outcome) -> Outcome {
        outcome.record_into(self.recorder.as_ref());
        Span::current().record("state", PipelineState::Recorded.as_str());

        let cid = cid.unwrap_or("-");
        let stage = outcome.stage().as_str();
        match &outcome {
            Outcome::Succeeded { size_bytes } => {
                info!(cid, size_bytes, "Replication triggered");
            }
            Outcome::Rejected(RejectReason::PolicyDenied(denial)) => {
                info!(
                    cid,
                    stage,
                    size_bytes = denial.size_bytes,
                    max_bytes = denial.max_bytes,
                    "Dataset too big, not replicating"
                );
            }
            Outcome::Rejected(RejectReason::AlreadyInFlight) => {
                info!(cid, stage, "Dataset already being processed, skipping");
            }
            Outcome::Failed(e) => {
                warn!(cid, stage, error = %e, "Replication pipeline failed");
            }
        }
        outcome
    }

    /// Resolve, evaluate and trigger. Does not record.
    async fn execute(&self, request: &ReplicationRequest) -> Outcome {
        let span = Span::current();

        let manifest = match self.resolver.resolve_manifest(&request.cid).await {
            Ok(manifest) => manifest,
            Err(e) => return Outcome::Failed(e.into()),
        };
        span.record("state", PipelineState::ManifestResolved.as_str());
        debug!(
            size_bytes = manifest.dataset_size_bytes,
            block_size = manifest.block_size_bytes,
            protected = manifest.is_protected,
            "Manifest resolved"
        );

        let decision = evaluate(&manifest, &self.config.policy);
        span.record("state", PipelineState::PolicyEvaluated.as_str());
        if let PolicyDecision::Deny(denial) = decision {
            span.record("state", PipelineState::PolicyDenied.as_str());
            return Outcome::Rejected(RejectReason::PolicyDenied(denial));
        }

        if let Err(e) = self.trigger.trigger_replication(&request.cid).await {
            return Outcome::Failed(e.into());
        }
        span.record("state", PipelineState::ReplicationTriggered.as_str());

        Outcome::Succeeded {
            size_bytes: manifest.dataset_size_bytes,
        }
    }

    /// Run one request with dedup and panic isolation.
    async fn run_request(&self, request: ReplicationRequest) -> Outcome {
        let _claim = match &self.in_flight {
            Some(registry) => match registry.try_acquire(&request.cid) {
                Some(guard) => Some(guard),
                None => {
                    return self.finish(
                        Some(request.cid.as_str()),
                        Outcome::Rejected(RejectReason::AlreadyInFlight),
                    )
                }
            },
            None => None,
        };

        let outcome = AssertUnwindSafe(self.execute(&request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Outcome::Failed(PipelineError::Internal(panic_message(panic.as_ref())))
            });

        self.finish(Some(request.cid.as_str()), outcome)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "execution panicked".to_string())
}

#[async_trait]
impl<R: ManifestResolver, T: ReplicationTrigger> ReplicationPipelineApi
    for ReplicationPipeline<R, T>
{
    async fn process(&self, payload: &[u8]) -> Outcome {
        let span = info_span!(
            "replication",
            cid = field::Empty,
            state = PipelineState::Received.as_str()
        );

        async {
            let announcement = match decode(payload) {
                Ok(announcement) => announcement,
                Err(e) => return self.finish(None, Outcome::Failed(e.into())),
            };

            let span = Span::current();
            span.record("cid", announcement.content_id().as_str());
            span.record("state", PipelineState::Decoded.as_str());
            debug!(
                kind = announcement.kind.tag(),
                timestamp = ?announcement.timestamp,
                signer = ?announcement.signer,
                "Announcement decoded"
            );

            self.run_request(announcement.into_request()).await
        }
        .instrument(span)
        .await
    }

    fn record_dropped(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.recorder.record_failures(PipelineStage::Admission, count);
        warn!(
            dropped = count,
            stage = PipelineStage::Admission.as_str(),
            "Announcements dropped before processing"
        );
    }

    fn config(&self) -> &PipelineConfig {
        &self.config
    }
}
