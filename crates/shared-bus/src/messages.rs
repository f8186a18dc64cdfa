//! # Bus Messages
//!
//! The envelope every message travels in, plus subscription filters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical channel label a message was published on.
///
/// Labels are compared verbatim; no normalisation is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentTopic(String);

impl ContentTopic {
    /// Wrap a topic label.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self(topic.into())
    }

    /// The raw label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentTopic {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A single message as delivered by the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMessage {
    /// Topic the message was published on.
    pub content_topic: ContentTopic,
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
    /// Unix time in milliseconds at which the message entered the bus.
    pub received_at: u64,
}

impl BusMessage {
    /// Create a message stamped with the current time.
    #[must_use]
    pub fn new(content_topic: impl Into<ContentTopic>, payload: impl Into<Vec<u8>>) -> Self {
        let received_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        Self {
            content_topic: content_topic.into(),
            payload: payload.into(),
            received_at,
        }
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Filter for subscribing to specific content topics.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    /// Topics to include. Empty means all topics.
    pub content_topics: Vec<ContentTopic>,
}

impl MessageFilter {
    /// Create a filter that accepts all messages.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific content topics.
    #[must_use]
    pub fn content_topics(content_topics: Vec<ContentTopic>) -> Self {
        Self { content_topics }
    }

    /// Check if a message matches this filter.
    #[must_use]
    pub fn matches(&self, message: &BusMessage) -> bool {
        self.content_topics.is_empty() || self.content_topics.contains(&message.content_topic)
    }
}
