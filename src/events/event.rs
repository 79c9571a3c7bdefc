//! # Events emitted by flights and flight groups.
//!
//! The [`EventKind`] enum classifies events across three categories:
//! - **Flight lifecycle**: starting, succeeded, failed, timeout, disposed
//! - **Group management**: joined, evicted, shutdown
//! - **Subscriber health**: overflow, panic
//!
//! The [`Event`] struct carries additional metadata such as timestamps, flight
//! name, reasons, and the number of waiters notified.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use flightcast::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::FlightFailed)
//!     .with_flight("fetch-user")
//!     .with_reason("connection refused")
//!     .with_waiters(3);
//!
//! assert_eq!(ev.kind, EventKind::FlightFailed);
//! assert_eq!(ev.flight.as_deref(), Some("fetch-user"));
//! assert_eq!(ev.waiters, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of flight events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Flight lifecycle ===
    /// Flight left `Initial` and invoked its operation.
    ///
    /// Sets: `flight`
    FlightStarting,

    /// Operation settled successfully and waiters were notified.
    ///
    /// Sets: `flight`, `waiters`, `elapsed_ms`
    FlightSucceeded,

    /// Operation settled with an error and waiters were notified.
    ///
    /// Sets: `flight`, `reason`, `waiters`, `elapsed_ms`
    FlightFailed,

    /// Operation exceeded its timeout (always followed by `FlightFailed`).
    ///
    /// Sets: `flight`, `timeout_ms`
    TimeoutHit,

    /// Flight was disposed; pending waiters were rejected.
    ///
    /// Sets: `flight`, `reason`, `waiters`
    FlightDisposed,

    // === Group management ===
    /// A caller joined an existing flight instead of starting a new one.
    ///
    /// Sets: `flight`
    FlightJoined,

    /// A settled or forgotten flight was removed from its group.
    ///
    /// Sets: `flight`, `reason` ("settled", "expired", "forgotten")
    FlightEvicted,

    /// Group shutdown: all flights disposed.
    ///
    /// Sets: `reason`, `waiters` (total rejected)
    GroupShutdown,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `flight` (subscriber name), `reason` (panic info)
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `flight` (subscriber name), `reason`
    SubscriberOverflow,
}

/// Flight event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Flight (operation) name, or subscriber name for subscriber events.
    pub flight: Option<Arc<str>>,
    /// Human-readable reason (errors, eviction cause, etc.).
    pub reason: Option<Arc<str>>,
    /// Number of waiters notified or rejected.
    pub waiters: Option<u32>,
    /// Operation timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Time from start to settlement in milliseconds (compact).
    pub elapsed_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            flight: None,
            reason: None,
            waiters: None,
            timeout_ms: None,
            elapsed_ms: None,
        }
    }

    /// Attaches a flight name.
    #[inline]
    pub fn with_flight(mut self, flight: impl Into<Arc<str>>) -> Self {
        self.flight = Some(flight.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a waiter count (saturating at `u32::MAX`).
    #[inline]
    pub fn with_waiters(mut self, n: usize) -> Self {
        self.waiters = Some(u32::try_from(n).unwrap_or(u32::MAX));
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(compact_ms(d));
        self
    }

    /// Attaches the start-to-settle duration (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed_ms = Some(compact_ms(d));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_flight(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_flight(subscriber)
            .with_reason(info)
    }
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}
