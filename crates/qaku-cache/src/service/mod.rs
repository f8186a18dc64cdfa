//! Service Layer
//!
//! Orchestrates the domain and the storage node ports into one execution
//! per announcement.

mod in_flight;
mod pipeline;

pub use in_flight::{InFlightGuard, InFlightRegistry};
pub use pipeline::ReplicationPipeline;
