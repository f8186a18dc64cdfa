//! # Waku REST relay bridge
//!
//! Subscribes a Waku node to the persist content topic over its REST API and
//! polls for new messages, publishing each one onto the in-process bus.
//! Bootstrapping and peering of the Waku node itself are not our concern.
//!
//! - `POST {base}/relay/v1/auto/subscriptions` with `["<topic>"]`
//! - `GET  {base}/relay/v1/auto/messages/<urlencoded topic>`

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{Client, Url};
use serde::Deserialize;
use shared_bus::{BusMessage, ContentTopic, MessagePublisher};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::container::RelayConfig;

/// Relay bridge errors
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid Waku URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Waku request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Waku node answered with status {0}")]
    Status(u16),
}

/// A message as returned by the Waku REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct WakuMessage {
    /// Base64 encoded payload.
    pub payload: String,
    #[serde(rename = "contentTopic", default)]
    pub content_topic: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Bridges one content topic of a Waku node into the message bus.
pub struct WakuRelayBridge {
    client: Client,
    base_url: Url,
    content_topic: ContentTopic,
    poll_interval: Duration,
    publisher: Arc<dyn MessagePublisher>,
}

impl WakuRelayBridge {
    pub fn new(
        config: &RelayConfig,
        content_topic: ContentTopic,
        publisher: Arc<dyn MessagePublisher>,
    ) -> Result<Self, RelayError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| RelayError::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(RelayError::InvalidUrl {
                url: config.base_url.clone(),
                reason: "cannot be a base URL".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(2))
            .build()?;

        Ok(Self {
            client,
            base_url,
            content_topic,
            poll_interval: config.poll_interval,
            publisher,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub(crate) fn subscriptions_url(&self) -> Url {
        self.endpoint(&["relay", "v1", "auto", "subscriptions"])
    }

    pub(crate) fn messages_url(&self) -> Url {
        self.endpoint(&["relay", "v1", "auto", "messages", self.content_topic.as_str()])
    }

    /// Ask the Waku node to relay our content topic.
    pub async fn subscribe(&self) -> Result<(), RelayError> {
        let response = self
            .client
            .post(self.subscriptions_url())
            .json(&[self.content_topic.as_str()])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RelayError::Status(response.status().as_u16()));
        }
        info!(topic = %self.content_topic, "Subscribed to Waku content topic");
        Ok(())
    }

    /// Fetch pending messages once and publish them. Returns how many were
    /// published.
    pub async fn poll_once(&self) -> Result<usize, RelayError> {
        let response = self.client.get(self.messages_url()).send().await?;
        if !response.status().is_success() {
            return Err(RelayError::Status(response.status().as_u16()));
        }

        let messages: Vec<WakuMessage> = response.json().await?;
        let mut published = 0;
        for message in messages {
            let payload = match STANDARD.decode(message.payload.as_bytes()) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "Skipping Waku message with undecodable payload");
                    continue;
                }
            };
            let topic = message
                .content_topic
                .map(ContentTopic::new)
                .unwrap_or_else(|| self.content_topic.clone());

            self.publisher.publish(BusMessage::new(topic, payload)).await;
            published += 1;
        }

        if published > 0 {
            debug!(published, "Relayed Waku messages");
        }
        Ok(published)
    }

    /// Subscribe (retrying every poll interval) and poll until shutdown.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut subscribed = false;

        info!(
            url = %self.base_url,
            topic = %self.content_topic,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Starting Waku relay bridge"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait_for(|stop| *stop) => break,
                _ = ticker.tick() => {}
            }

            if !subscribed {
                match self.subscribe().await {
                    Ok(()) => subscribed = true,
                    Err(e) => {
                        warn!(error = %e, "Waku subscription failed, retrying");
                        continue;
                    }
                }
            }

            if let Err(e) = self.poll_once().await {
                warn!(error = %e, "Waku poll failed");
            }
        }

        info!("Waku relay bridge stopped");
    }
}
