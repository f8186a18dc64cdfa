//! Outcome accounting for the replication pipeline
//!
//! Every announcement that reaches a terminal outcome bumps exactly one of
//! the two counters. Successes additionally observe the dataset size in
//! kilobytes.
//!
//! ## Usage
//!
//! ```ignore
//! use qaku_cache::metrics::{Metrics, MetricsRecorder};
//!
//! let metrics = Metrics::new();
//! metrics.record_success(2_000_000);
//! metrics.record_failure(PipelineStage::Resolve);
//!
//! assert_eq!(metrics.snapshot().successes, 1);
//! ```

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::PipelineStage;

/// Trait for outcome recording implementations
///
/// Implement this trait to integrate with external metrics systems.
/// See `adapters::PrometheusRecorder` for the exported one.
pub trait MetricsRecorder: Send + Sync {
    /// Record a triggered replication of a dataset of `size_bytes`.
    fn record_success(&self, size_bytes: u64);

    /// Record a rejected or failed announcement.
    fn record_failure(&self, stage: PipelineStage);

    /// Record `count` failures at once, for announcements that never reached
    /// the pipeline.
    fn record_failures(&self, stage: PipelineStage, count: u64) {
        for _ in 0..count {
            self.record_failure(stage);
        }
    }
}

#[derive(Default)]
struct SizeStats {
    count: u64,
    sum_kib: f64,
    last_kib: Option<f64>,
}

/// In-memory outcome counters
///
/// Thread-safe, used for embedding and tests.
#[derive(Default)]
pub struct Metrics {
    /// Total successful replications
    pub successes: AtomicU64,
    /// Total rejected or failed announcements
    pub failures: AtomicU64,
    failures_by_stage: [AtomicU64; PipelineStage::ALL.len()],
    sizes: Mutex<SizeStats>,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Failures attributed to `stage`.
    pub fn failures_at(&self, stage: PipelineStage) -> u64 {
        self.failures_by_stage[stage_index(stage)].load(Ordering::Relaxed)
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let sizes = self.sizes.lock();
        MetricsSnapshot {
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            size_observations: sizes.count,
            size_sum_kib: sizes.sum_kib,
            last_size_kib: sizes.last_kib,
        }
    }
}

fn stage_index(stage: PipelineStage) -> usize {
    match stage {
        PipelineStage::Decode => 0,
        PipelineStage::Resolve => 1,
        PipelineStage::Policy => 2,
        PipelineStage::Trigger => 3,
        PipelineStage::Admission => 4,
        PipelineStage::Internal => 5,
    }
}

impl MetricsRecorder for Metrics {
    fn record_success(&self, size_bytes: u64) {
        let kib = size_bytes as f64 / 1024.0;
        {
            let mut sizes = self.sizes.lock();
            sizes.count += 1;
            sizes.sum_kib += kib;
            sizes.last_kib = Some(kib);
        }
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self, stage: PipelineStage) {
        self.record_failures(stage, 1);
    }

    fn record_failures(&self, stage: PipelineStage, count: u64) {
        self.failures_by_stage[stage_index(stage)].fetch_add(count, Ordering::Relaxed);
        self.failures.fetch_add(count, Ordering::Relaxed);
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub successes: u64,
    pub failures: u64,
    pub size_observations: u64,
    pub size_sum_kib: f64,
    pub last_size_kib: Option<f64>,
}
