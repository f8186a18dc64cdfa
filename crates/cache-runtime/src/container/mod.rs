//! # Cache Node Container
//!
//! Configuration and the component graph of one cache node.

pub mod components;
pub mod config;

pub use components::{CacheComponents, CodexPipeline};
pub use config::{CacheConfig, GatewayConfig, RelayConfig};
