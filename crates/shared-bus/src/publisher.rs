//! # Message Publisher
//!
//! Defines the publishing side of the message bus.

use crate::messages::{BusMessage, MessageFilter};
use crate::subscriber::MessageStream;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Trait for publishing messages to the bus.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish a message to the bus.
    ///
    /// # Returns
    ///
    /// The number of active subscribers that received the message.
    async fn publish(&self, message: BusMessage) -> usize;

    /// Get the total number of messages published.
    fn messages_published(&self) -> u64;
}

/// In-memory implementation of the message bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer semantics.
pub struct InMemoryMessageBus {
    /// Broadcast sender for messages.
    sender: broadcast::Sender<BusMessage>,

    /// Total messages published.
    messages_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryMessageBus {
    /// Create a new in-memory bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            messages_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Get a stream of messages matching a filter.
    ///
    /// The subscription starts now; earlier messages are not replayed.
    #[must_use]
    pub fn message_stream(&self, filter: MessageFilter) -> MessageStream {
        debug!(topics = ?filter.content_topics, "New subscription created");
        MessageStream::new(self.sender.subscribe(), filter)
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagePublisher for InMemoryMessageBus {
    async fn publish(&self, message: BusMessage) -> usize {
        let topic = message.content_topic.clone();
        let bytes = message.len();

        self.messages_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(message) {
            Ok(receiver_count) => {
                debug!(
                    topic = %topic,
                    bytes,
                    receivers = receiver_count,
                    "Message published"
                );
                receiver_count
            }
            Err(_) => {
                warn!(topic = %topic, bytes, "Message dropped (no receivers)");
                0
            }
        }
    }

    fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }
}
