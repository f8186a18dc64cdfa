//! # Relay Bridges
//!
//! Feed messages from an external pub/sub network into the in-process bus.

pub mod waku;

pub use waku::{RelayError, WakuMessage, WakuRelayBridge};
