//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the fan-out machinery that
//! delivers flight events from a group's bus to user observers.
//!
//! ## Architecture
//! ```text
//! Flight/Group ── publish(Event) ──► Bus ──► group listener ──► SubscriberSet
//!                                                          ┌────────┼────────┐
//!                                                          ▼        ▼        ▼
//!                                                      LogWriter  Metrics  Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use flightcast::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct CacheHits;
//!
//! #[async_trait]
//! impl Subscribe for CacheHits {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::FlightJoined {
//!             // increment hit counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "cache-hits" }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::Subscribe;
pub(crate) use subscriber_set::SubscriberSet;
