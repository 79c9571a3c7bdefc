//! # Keyed flight registry.
//!
//! [`FlightGroup`] maps caller-chosen keys to flights so that concurrent
//! requests for the same key share one execution. The group is owned by the
//! caller; there is no process-wide cache.
//!
//! - [`builder`]: wires config, event bus and subscribers;
//! - [`registry`]: join-or-start, retention and eviction, shutdown.

mod builder;
mod registry;

pub use builder::FlightGroupBuilder;
pub use registry::FlightGroup;
