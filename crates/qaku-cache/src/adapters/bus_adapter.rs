//! Event Bus Adapter for the replication pipeline
//!
//! Subscribes to the persist content topic and hands every message to the
//! pipeline in its own task. An admission gate bounds the number of running
//! executions; when it is exhausted the loop stops pulling from the bus, and
//! the bus drops the oldest messages if we fall too far behind. Dropped
//! messages are reported to the pipeline as admission failures.

use futures::StreamExt;
use shared_bus::{ContentTopic, MessageFilter, MessageSubscriber, SubscriptionError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::domain::Outcome;
use crate::ports::ReplicationPipelineApi;

/// Bus adapter feeding persist announcements into the pipeline
pub struct PersistBusAdapter<P>
where
    P: ReplicationPipelineApi + 'static,
{
    /// Reference to the message bus
    bus: Arc<dyn MessageSubscriber>,
    pipeline: Arc<P>,
    content_topic: ContentTopic,
    /// Admission gate, one permit per running execution
    gate: Arc<Semaphore>,
    max_in_flight: usize,
    drain_timeout: Duration,
    dispatched: AtomicU64,
}

impl<P> PersistBusAdapter<P>
where
    P: ReplicationPipelineApi + 'static,
{
    /// Create a new bus adapter
    ///
    /// Gate size and drain timeout come from the pipeline's own config.
    pub fn new(
        bus: Arc<dyn MessageSubscriber>,
        pipeline: Arc<P>,
        content_topic: ContentTopic,
    ) -> Self {
        let config = pipeline.config();
        let max_in_flight = config.max_in_flight.max(1);
        let drain_timeout = config.drain_timeout;
        Self {
            bus,
            pipeline,
            content_topic,
            gate: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
            drain_timeout,
            dispatched: AtomicU64::new(0),
        }
    }

    pub fn content_topic(&self) -> &ContentTopic {
        &self.content_topic
    }

    /// Messages handed to the pipeline so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Executions currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.gate.available_permits()
    }

    /// Start listening for announcements
    ///
    /// Runs until the bus closes, `shutdown` holds `true` or its sender is
    /// dropped. Then waits up to the drain timeout for running executions and
    /// aborts whatever is still running.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let filter = MessageFilter::content_topics(vec![self.content_topic.clone()]);
        let mut stream = self.bus.message_stream(filter);
        let mut tasks: JoinSet<Outcome> = JoinSet::new();

        info!(
            topic = %self.content_topic,
            max_in_flight = self.max_in_flight,
            "[PersistBusAdapter] Started listening for announcements"
        );

        loop {
            let message = tokio::select! {
                biased;
                _ = shutdown.wait_for(|stop| *stop) => break,
                message = stream.next() => match message {
                    Some(Ok(message)) => message,
                    Some(Err(SubscriptionError::Lagged(count))) => {
                        self.pipeline.record_dropped(count);
                        continue;
                    }
                    None => {
                        warn!("[PersistBusAdapter] Message stream ended, shutting down");
                        break;
                    }
                },
            };

            let permit = tokio::select! {
                biased;
                _ = shutdown.wait_for(|stop| *stop) => break,
                permit = Arc::clone(&self.gate).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            while let Some(joined) = tasks.try_join_next() {
                Self::log_join(joined);
            }

            self.dispatched.fetch_add(1, Ordering::Relaxed);
            debug!(bytes = message.len(), "Dispatching announcement");

            let pipeline = Arc::clone(&self.pipeline);
            tasks.spawn(async move {
                let outcome = pipeline.process(&message.payload).await;
                drop(permit);
                outcome
            });
        }

        self.drain(&mut tasks).await;
        info!(
            dispatched = self.dispatched(),
            "[PersistBusAdapter] Stopped"
        );
    }

    async fn drain(&self, tasks: &mut JoinSet<Outcome>) {
        if tasks.is_empty() {
            return;
        }

        info!(
            in_flight = self.in_flight(),
            timeout_ms = self.drain_timeout.as_millis() as u64,
            "Waiting for running executions"
        );

        let joined = tokio::time::timeout(self.drain_timeout, async {
            while let Some(joined) = tasks.join_next().await {
                Self::log_join(joined);
            }
        })
        .await;

        if joined.is_err() {
            warn!(
                abandoned = tasks.len(),
                "Drain timeout elapsed, aborting remaining executions"
            );
            tasks.abort_all();
        }
    }

    fn log_join(joined: Result<Outcome, tokio::task::JoinError>) {
        if let Err(e) = joined {
            if e.is_panic() {
                error!(error = %e, "Execution task panicked");
            }
        }
    }
}
