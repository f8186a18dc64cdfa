//! Prometheus outcome recorder
//!
//! Exposes the pipeline counters under the names dashboards already use:
//! `qaku_cache_successes`, `qaku_cache_failures{stage}` and the
//! `qaku_cache_sizes` histogram (kilobytes).

use prometheus::{Counter, CounterVec, Histogram, HistogramOpts, Opts};
use qaku_telemetry::{MetricsRegistry, TelemetryError};

use crate::domain::PipelineStage;
use crate::metrics::MetricsRecorder;

/// Size histogram buckets, in kilobytes.
pub const SIZE_BUCKETS_KIB: [f64; 8] = [
    100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0, 20000.0,
];

/// [`MetricsRecorder`] backed by Prometheus collectors.
#[derive(Clone)]
pub struct PrometheusRecorder {
    successes: Counter,
    failures: CounterVec,
    sizes: Histogram,
}

impl PrometheusRecorder {
    /// Create the collectors and register them with `registry`.
    pub fn new(registry: &MetricsRegistry) -> Result<Self, TelemetryError> {
        let metrics_err = |e: prometheus::Error| TelemetryError::MetricsInit(e.to_string());

        let successes = Counter::new(
            "qaku_cache_successes",
            "The total number successfully cached snapshot",
        )
        .map_err(metrics_err)?;

        let failures = CounterVec::new(
            Opts::new(
                "qaku_cache_failures",
                "The total number of failed snapshot cache requests",
            ),
            &["stage"],
        )
        .map_err(metrics_err)?;

        let sizes = Histogram::with_opts(
            HistogramOpts::new("qaku_cache_sizes", "Sizes of cached snapshots in KB")
                .buckets(SIZE_BUCKETS_KIB.to_vec()),
        )
        .map_err(metrics_err)?;

        // Export every stage at zero so rate() works before the first failure.
        for stage in PipelineStage::ALL {
            failures.with_label_values(&[stage.as_str()]);
        }

        registry.register(Box::new(successes.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(sizes.clone()))?;

        Ok(Self {
            successes,
            failures,
            sizes,
        })
    }

    pub fn successes(&self) -> f64 {
        self.successes.get()
    }

    /// Failures across all stages.
    pub fn failures(&self) -> f64 {
        PipelineStage::ALL
            .iter()
            .map(|stage| self.failures_at(*stage))
            .sum()
    }

    pub fn failures_at(&self, stage: PipelineStage) -> f64 {
        self.failures.with_label_values(&[stage.as_str()]).get()
    }

    pub fn size_observations(&self) -> u64 {
        self.sizes.get_sample_count()
    }
}

impl MetricsRecorder for PrometheusRecorder {
    fn record_success(&self, size_bytes: u64) {
        self.sizes.observe(size_bytes as f64 / 1024.0);
        self.successes.inc();
    }

    fn record_failure(&self, stage: PipelineStage) {
        self.failures.with_label_values(&[stage.as_str()]).inc();
    }

    fn record_failures(&self, stage: PipelineStage, count: u64) {
        self.failures
            .with_label_values(&[stage.as_str()])
            .inc_by(count as f64);
    }
}
