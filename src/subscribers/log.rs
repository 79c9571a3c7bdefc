//! # LogWriter — simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [starting] flight="fetch-user"
//! [joined] flight="fetch-user"
//! [succeeded] flight="fetch-user" waiters=3 elapsed_ms=120
//! [failed] flight="fetch-user" err="operation failed: refused" waiters=1 elapsed_ms=5
//! [timeout] flight="fetch-user" timeout_ms=1000
//! [evicted] flight="fetch-user" reason="expired"
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let flight = e.flight.as_deref().unwrap_or("unknown");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::FlightStarting => println!("[starting] flight={flight:?}"),
            EventKind::FlightJoined => println!("[joined] flight={flight:?}"),
            EventKind::FlightSucceeded => println!(
                "[succeeded] flight={flight:?} waiters={:?} elapsed_ms={:?}",
                e.waiters, e.elapsed_ms
            ),
            EventKind::FlightFailed => println!(
                "[failed] flight={flight:?} err={reason:?} waiters={:?} elapsed_ms={:?}",
                e.waiters, e.elapsed_ms
            ),
            EventKind::TimeoutHit => {
                println!("[timeout] flight={flight:?} timeout_ms={:?}", e.timeout_ms)
            }
            EventKind::FlightDisposed => println!(
                "[disposed] flight={flight:?} reason={reason:?} waiters={:?}",
                e.waiters
            ),
            EventKind::FlightEvicted => println!("[evicted] flight={flight:?} reason={reason:?}"),
            EventKind::GroupShutdown => {
                println!("[group-shutdown] reason={reason:?} waiters={:?}", e.waiters)
            }
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] subscriber={flight} reason={reason}")
            }
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] subscriber={flight} info={reason}")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
