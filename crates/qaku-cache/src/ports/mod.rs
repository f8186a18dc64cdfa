//! Ports Layer
//!
//! Defines the interfaces (traits) for:
//! - Driving Ports (inbound) - API for the subscription loop and embedders
//! - Driven Ports (outbound) - Dependencies on the storage node

pub mod inbound;
pub mod outbound;

pub use inbound::ReplicationPipelineApi;
pub use outbound::{ManifestResolver, ReplicationTrigger};
