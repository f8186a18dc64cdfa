//! # Message Subscriber
//!
//! Defines the subscription side of the message bus.

use crate::messages::{BusMessage, MessageFilter};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::warn;

/// Errors surfaced by a message stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The subscriber fell behind and the bus dropped this many messages.
    ///
    /// Dropped messages cannot be inspected, so the count covers every
    /// topic on the channel, not only the filtered ones.
    #[error("Subscriber lagged, {0} messages dropped")]
    Lagged(u64),
}

/// Trait for subscribing to messages from the bus.
pub trait MessageSubscriber: Send + Sync {
    /// Subscribe to messages matching a filter.
    fn message_stream(&self, filter: MessageFilter) -> MessageStream;
}

impl MessageSubscriber for crate::publisher::InMemoryMessageBus {
    fn message_stream(&self, filter: MessageFilter) -> MessageStream {
        crate::publisher::InMemoryMessageBus::message_stream(self, filter)
    }
}

/// A filtered stream of bus messages.
///
/// Yields `Err(SubscriptionError::Lagged)` when messages were dropped before
/// this subscriber read them, then continues with the oldest retained
/// message. Ends when the bus is dropped.
pub struct MessageStream {
    inner: BroadcastStream<BusMessage>,
    filter: MessageFilter,
}

impl MessageStream {
    pub(crate) fn new(receiver: broadcast::Receiver<BusMessage>, filter: MessageFilter) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
            filter,
        }
    }
}

impl Stream for MessageStream {
    type Item = Result<BusMessage, SubscriptionError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
                Some(Ok(message)) => {
                    if this.filter.matches(&message) {
                        return Poll::Ready(Some(Ok(message)));
                    }
                }
                Some(Err(BroadcastStreamRecvError::Lagged(count))) => {
                    warn!(lagged = count, "Stream lagged, some messages dropped");
                    return Poll::Ready(Some(Err(SubscriptionError::Lagged(count))));
                }
                None => return Poll::Ready(None),
            }
        }
    }
}
