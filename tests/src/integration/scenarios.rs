//! # End-to-End Pipeline Scenarios
//!
//! The replication pipeline wired to the real `CodexClient`, talking HTTP to
//! a fake Codex node, with in-memory metrics.
//!
//! ## Flow Tested
//!
//! ```text
//! payload -> decode -> GET manifest -> size policy -> POST replication -> metrics
//! ```

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use qaku_cache::domain::PolicyDenial;
    use qaku_cache::{
        CodexClient, CodexClientConfig, Metrics, Outcome, PipelineConfig, PipelineError,
        PipelineStage, PolicyConfig, RejectReason, ReplicationPipeline, ReplicationPipelineApi,
        ResolutionError, TriggerError,
    };

    use crate::integration::fake_codex::{FakeCodex, ManifestReply};

    const SCENARIO_PAYLOAD: &[u8] =
        br#"{"type":"persist","payload":{"cid":"zCID1","owner":"alice","hash":"h1"},"timestamp":1700000000}"#;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    type CodexPipeline = ReplicationPipeline<CodexClient, CodexClient>;

    fn pipeline(codex: &FakeCodex, config: PipelineConfig) -> (Arc<CodexPipeline>, Arc<Metrics>) {
        let client = Arc::new(CodexClient::new(&CodexClientConfig::new(codex.url())).unwrap());
        let metrics = Arc::new(Metrics::new());
        let pipeline =
            ReplicationPipeline::new(client.clone(), client, metrics.clone(), config).unwrap();
        (Arc::new(pipeline), metrics)
    }

    fn persist(cid: &str) -> Vec<u8> {
        format!(r#"{{"type":"persist","payload":{{"cid":"{cid}"}}}}"#).into_bytes()
    }

    // =============================================================================
    // SCENARIOS A-D
    // =============================================================================

    /// Small dataset: replicated and observed once.
    #[tokio::test]
    async fn test_small_dataset_is_replicated() {
        let codex = FakeCodex::start().await.with_dataset("zCID1", 2_000_000);
        let (pipeline, metrics) = pipeline(&codex, PipelineConfig::default());

        let outcome = pipeline.process(SCENARIO_PAYLOAD).await;

        assert_eq!(outcome, Outcome::Succeeded { size_bytes: 2_000_000 });
        assert_eq!(codex.triggered(), vec!["zCID1".to_string()]);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.successes, 1);
        assert_eq!(snapshot.failures, 0);
        assert_eq!(snapshot.size_observations, 1);
        let observed = snapshot.last_size_kib.unwrap();
        assert!((observed - 1953.125).abs() < 1e-9, "observed {observed}");
    }

    /// Large dataset: resolved, denied, never triggered.
    #[tokio::test]
    async fn test_large_dataset_is_not_replicated() {
        let codex = FakeCodex::start().await.with_dataset("zCID1", 20_000_000);
        let (pipeline, metrics) = pipeline(&codex, PipelineConfig::default());

        let outcome = pipeline.process(SCENARIO_PAYLOAD).await;

        assert_eq!(
            outcome,
            Outcome::Rejected(RejectReason::PolicyDenied(PolicyDenial {
                size_bytes: 20_000_000,
                max_bytes: 5 * 1024 * 1024,
            }))
        );
        assert_eq!(codex.manifest_calls(), 1);
        assert_eq!(codex.trigger_calls(), 0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.successes, 0);
        assert_eq!(snapshot.size_observations, 0);
        assert_eq!(metrics.failures_at(PipelineStage::Policy), 1);
    }

    /// Manifest not found: one resolve failure, trigger never called.
    #[tokio::test]
    async fn test_missing_manifest_is_a_failure() {
        let codex = FakeCodex::start().await;
        let (pipeline, metrics) = pipeline(&codex, PipelineConfig::default());

        let outcome = pipeline.process(SCENARIO_PAYLOAD).await;

        assert_eq!(
            outcome,
            Outcome::Failed(PipelineError::Resolution(ResolutionError::NotFound {
                cid: "zCID1".to_string()
            }))
        );
        assert_eq!(codex.trigger_calls(), 0);
        assert_eq!(metrics.snapshot().failures, 1);
        assert_eq!(metrics.failures_at(PipelineStage::Resolve), 1);
    }

    /// Undecodable payload: one decode failure, no network traffic.
    #[tokio::test]
    async fn test_garbage_payload_makes_no_calls() {
        let codex = FakeCodex::start().await.with_dataset("zCID1", 2_000_000);
        let (pipeline, metrics) = pipeline(&codex, PipelineConfig::default());

        let outcome = pipeline.process(b"\x00\x01 definitely not json").await;

        assert!(matches!(outcome, Outcome::Failed(PipelineError::Decode(_))));
        assert_eq!(codex.storage_calls(), 0);
        assert_eq!(metrics.snapshot().failures, 1);
        assert_eq!(metrics.failures_at(PipelineStage::Decode), 1);
    }

    // =============================================================================
    // STORAGE NODE ERRORS
    // =============================================================================

    #[tokio::test]
    async fn test_unavailable_manifest_is_a_resolve_failure() {
        let codex = FakeCodex::start()
            .await
            .with_manifest("zCID1", ManifestReply::Status(503));
        let (pipeline, metrics) = pipeline(&codex, PipelineConfig::default());

        let outcome = pipeline.process(SCENARIO_PAYLOAD).await;

        assert!(matches!(
            outcome,
            Outcome::Failed(PipelineError::Resolution(ResolutionError::Unavailable(_)))
        ));
        assert_eq!(codex.trigger_calls(), 0);
        assert_eq!(metrics.failures_at(PipelineStage::Resolve), 1);
    }

    #[tokio::test]
    async fn test_malformed_manifest_is_a_resolve_failure() {
        let codex = FakeCodex::start()
            .await
            .with_manifest("zCID1", ManifestReply::Garbage);
        let (pipeline, metrics) = pipeline(&codex, PipelineConfig::default());

        let outcome = pipeline.process(SCENARIO_PAYLOAD).await;

        assert!(matches!(
            outcome,
            Outcome::Failed(PipelineError::Resolution(ResolutionError::Malformed(_)))
        ));
        assert_eq!(metrics.failures_at(PipelineStage::Resolve), 1);
    }

    #[tokio::test]
    async fn test_refused_trigger_is_a_trigger_failure() {
        let codex = FakeCodex::start()
            .await
            .with_dataset("zCID1", 2_000_000)
            .with_trigger_status(500);
        let (pipeline, metrics) = pipeline(&codex, PipelineConfig::default());

        let outcome = pipeline.process(SCENARIO_PAYLOAD).await;

        assert_eq!(
            outcome,
            Outcome::Failed(PipelineError::Trigger(TriggerError::Rejected {
                status: 500,
                body: "replication refused".to_string(),
            }))
        );
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.successes, 0);
        assert_eq!(snapshot.size_observations, 0);
        assert_eq!(metrics.failures_at(PipelineStage::Trigger), 1);
    }

    /// Only `200 OK` accepts a replication request.
    #[tokio::test]
    async fn test_non_ok_success_status_is_a_trigger_failure() {
        for status in [202u16, 204] {
            let codex = FakeCodex::start()
                .await
                .with_dataset("zCID1", 2_000_000)
                .with_trigger_status(status);
            let (pipeline, metrics) = pipeline(&codex, PipelineConfig::default());

            let outcome = pipeline.process(SCENARIO_PAYLOAD).await;

            assert!(
                matches!(
                    outcome,
                    Outcome::Failed(PipelineError::Trigger(TriggerError::Rejected { status: s, .. }))
                        if s == status
                ),
                "status {status}: {outcome:?}"
            );
            let snapshot = metrics.snapshot();
            assert_eq!(snapshot.successes, 0);
            assert_eq!(snapshot.size_observations, 0);
            assert_eq!(metrics.failures_at(PipelineStage::Trigger), 1);
        }
    }

    #[tokio::test]
    async fn test_unreachable_codex_is_a_resolve_failure() {
        // Bind and drop a listener to get a port nobody answers on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = CodexClientConfig::new(format!("http://{addr}"));
        config.connect_timeout = Duration::from_millis(500);
        let client = Arc::new(CodexClient::new(&config).unwrap());
        let metrics = Arc::new(Metrics::new());
        let pipeline =
            ReplicationPipeline::new(client.clone(), client, metrics.clone(), PipelineConfig::default())
                .unwrap();

        let outcome = pipeline.process(SCENARIO_PAYLOAD).await;

        assert!(matches!(
            outcome,
            Outcome::Failed(PipelineError::Resolution(ResolutionError::Unavailable(_)))
        ));
        assert_eq!(metrics.snapshot().failures, 1);
    }

    // =============================================================================
    // POLICY AND REPEATS
    // =============================================================================

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let codex = FakeCodex::start()
            .await
            .with_dataset("zAtLimit", 1_000)
            .with_dataset("zOverLimit", 1_001);
        let config = PipelineConfig::new(PolicyConfig::new(1_000).unwrap());
        let (pipeline, metrics) = pipeline(&codex, config);

        assert!(pipeline.process(&persist("zAtLimit")).await.is_success());
        assert!(!pipeline.process(&persist("zOverLimit")).await.is_success());

        assert_eq!(codex.triggered(), vec!["zAtLimit".to_string()]);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.successes, 1);
        assert_eq!(snapshot.failures, 1);
    }

    /// Repeated announcements are each processed; the storage node is
    /// expected to treat repeated replication requests as no-ops.
    #[tokio::test]
    async fn test_repeated_announcement_is_processed_each_time() {
        let codex = FakeCodex::start().await.with_dataset("zCID1", 2_000_000);
        let (pipeline, metrics) = pipeline(&codex, PipelineConfig::default());

        assert!(pipeline.process(SCENARIO_PAYLOAD).await.is_success());
        assert!(pipeline.process(SCENARIO_PAYLOAD).await.is_success());

        assert_eq!(codex.trigger_calls(), 2);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.successes, 2);
        assert_eq!(snapshot.size_observations, 2);
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_deduplicated_when_enabled() {
        let codex = FakeCodex::start()
            .await
            .with_dataset("zCID1", 2_000_000)
            .with_trigger_delay(Duration::from_millis(300));
        let config = PipelineConfig::default().with_dedupe_in_flight(true);
        let (pipeline, metrics) = pipeline(&codex, config);

        let first = {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.process(SCENARIO_PAYLOAD).await })
        };
        // Let the first execution claim the identifier.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = pipeline.process(SCENARIO_PAYLOAD).await;
        let first = first.await.unwrap();

        assert!(first.is_success());
        assert_eq!(second, Outcome::Rejected(RejectReason::AlreadyInFlight));
        assert_eq!(codex.trigger_calls(), 1);
        assert_eq!(metrics.failures_at(PipelineStage::Admission), 1);

        // Once finished, the identifier can be processed again.
        assert!(pipeline.process(SCENARIO_PAYLOAD).await.is_success());
        assert_eq!(codex.trigger_calls(), 2);
    }
}
