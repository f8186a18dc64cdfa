//! # Shared Bus - Content-Topic Message Delivery
//!
//! In-process stand-in for the pub/sub network the cache node listens on.
//! Whatever bridges the real network (see `cache-runtime`) publishes raw
//! messages here; consumers subscribe with a content-topic filter.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Relay bridge │                    │ Bus adapter  │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │ Message Bus  │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  message_stream()
//! ```
//!
//! Delivery is at-least-once from the producer's point of view and lossy for
//! slow subscribers: a subscriber that lags behind the channel capacity skips
//! the oldest messages and is told how many through
//! [`SubscriptionError::Lagged`].

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod messages;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use messages::{BusMessage, ContentTopic, MessageFilter};
pub use publisher::{InMemoryMessageBus, MessagePublisher};
pub use subscriber::{MessageStream, MessageSubscriber, SubscriptionError};

/// Maximum messages to buffer per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Content topic Qaku clients publish persist announcements on.
pub const QAKU_PERSIST_TOPIC: &str = "/0/qaku/1/persist/json";
