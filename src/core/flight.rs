//! # Flight: at-most-once execution with outcome fan-out.
//!
//! A [`Flight`] wraps one [`Operation`](crate::Operation), runs it at most once and
//! broadcasts the single [`Outcome`] to every [`Waiter`], whether the waiter was
//! created before, during or after execution.
//!
//! ## Rules
//! - `Initial → Pending` happens exactly once, synchronously inside [`Flight::start`].
//!   A second start returns [`FlightError::AlreadyStarted`].
//! - `Pending → Completed` happens exactly once; `Completed` is terminal.
//! - Waiters registered before settlement are notified in registration order,
//!   under the same lock that publishes the outcome. A waiter created afterwards
//!   can not observe `Pending` and is settled before `create_waiter` returns.
//! - The outcome is kept for the lifetime of the flight (no invalidation);
//!   groups decide how long a settled flight stays reachable, see
//!   [`Retention`](crate::Retention).
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use flightcast::{Flight, FlightState, OperationError, OperationFn};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let flight = Flight::new(OperationFn::arc("load", |_ctx: CancellationToken| async {
//!     Ok::<_, OperationError>(42u32)
//! }));
//!
//! let early = flight.create_waiter();
//! flight.execute().unwrap().await.unwrap();
//! assert_eq!(flight.state(), FlightState::Completed);
//!
//! let mut late = flight.create_waiter();
//! assert_eq!(late.try_outcome(), Some(Ok(42)));
//! assert_eq!(early.await, Ok(42));
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::FlightConfig;
use crate::core::execution::Execution;
use crate::core::outcome::Outcome;
use crate::core::waiter::{self, Notifier, Waiter};
use crate::error::{FlightError, OperationError};
use crate::events::{Bus, Event, EventKind};
use crate::operations::OperationRef;

/// Execution state of a flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlightState {
    /// Created, operation not invoked yet.
    Initial,
    /// Operation invoked, not settled.
    Pending,
    /// Outcome stored; terminal.
    Completed,
}

/// State machine with the data each state owns.
enum Phase<T> {
    Initial {
        waiters: Vec<Notifier<T>>,
    },
    Pending {
        waiters: Vec<Notifier<T>>,
        started_at: Instant,
    },
    Completed {
        outcome: Arc<Outcome<T>>,
        settled_at: Instant,
    },
}

impl<T> Phase<T> {
    fn state(&self) -> FlightState {
        match self {
            Phase::Initial { .. } => FlightState::Initial,
            Phase::Pending { .. } => FlightState::Pending,
            Phase::Completed { .. } => FlightState::Completed,
        }
    }
}

struct Inner<T> {
    phase: Phase<T>,
    next_waiter: u64,
}

/// State shared between flight handles and the execution future.
pub(crate) struct Shared<T> {
    name: Arc<str>,
    op: OperationRef<T>,
    timeout: Option<Duration>,
    bus: Option<Bus>,
    token: CancellationToken,
    inner: Mutex<Inner<T>>,
}

impl<T: Clone + Send + Sync + 'static> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn op(&self) -> &OperationRef<T> {
        &self.op
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub(crate) fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Publishes `ev` tagged with this flight's name (no-op without a bus).
    pub(crate) fn publish(&self, ev: Event) {
        if let Some(bus) = &self.bus {
            bus.publish(ev.with_flight(Arc::clone(&self.name)));
        }
    }

    /// Stores the outcome and notifies every registered waiter.
    ///
    /// If the flight was disposed meanwhile, `result` is discarded and the
    /// stored outcome is returned.
    pub(crate) fn settle(&self, result: Result<T, OperationError>) -> Arc<Outcome<T>> {
        let mut inner = self.lock();
        let (waiters, started_at) = match &mut inner.phase {
            Phase::Completed { outcome, .. } => return Arc::clone(outcome),
            Phase::Pending {
                waiters,
                started_at,
            } => (std::mem::take(waiters), *started_at),
            Phase::Initial { waiters } => {
                debug_assert!(false, "settle before start");
                (std::mem::take(waiters), Instant::now())
            }
        };

        let outcome = Arc::new(Outcome::from(result));
        let settled_at = Instant::now();
        let notified = waiters.len();
        inner.phase = Phase::Completed {
            outcome: Arc::clone(&outcome),
            settled_at,
        };
        for w in waiters {
            w.notify(&outcome);
        }
        drop(inner);

        let elapsed = settled_at.saturating_duration_since(started_at);
        let ev = match &*outcome {
            Outcome::Success(_) => Event::new(EventKind::FlightSucceeded),
            Outcome::Failure(e) => Event::new(EventKind::FlightFailed).with_reason(e.to_string()),
        };
        self.publish(ev.with_waiters(notified).with_elapsed(elapsed));
        outcome
    }
}

/// Single-flight runner for one operation.
///
/// Cheap to clone: clones are handles to the same flight.
pub struct Flight<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Flight<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Flight<T> {
    /// Creates a flight with default configuration (no timeout, no events).
    pub fn new(op: OperationRef<T>) -> Self {
        Self::with_config(op, &FlightConfig::default())
    }

    /// Creates a flight using the timeout from `cfg`.
    pub fn with_config(op: OperationRef<T>, cfg: &FlightConfig) -> Self {
        Self::build(op, cfg.default_timeout(), None, CancellationToken::new())
    }

    /// Creates a flight that publishes to `bus` and is cancelled with `token`.
    pub(crate) fn attached(
        op: OperationRef<T>,
        cfg: &FlightConfig,
        bus: Bus,
        token: CancellationToken,
    ) -> Self {
        Self::build(op, cfg.default_timeout(), Some(bus), token)
    }

    fn build(
        op: OperationRef<T>,
        timeout: Option<Duration>,
        bus: Option<Bus>,
        token: CancellationToken,
    ) -> Self {
        let name: Arc<str> = Arc::from(op.name());
        Self {
            shared: Arc::new(Shared {
                name,
                op,
                timeout,
                bus,
                token,
                inner: Mutex::new(Inner {
                    phase: Phase::Initial {
                        waiters: Vec::new(),
                    },
                    next_waiter: 0,
                }),
            }),
        }
    }

    /// Operation name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Current state.
    pub fn state(&self) -> FlightState {
        self.shared.lock().phase.state()
    }

    /// The stored outcome, once `Completed`.
    pub fn outcome(&self) -> Option<Arc<Outcome<T>>> {
        match &self.shared.lock().phase {
            Phase::Completed { outcome, .. } => Some(Arc::clone(outcome)),
            _ => None,
        }
    }

    /// Number of registered, not yet notified waiters (always 0 once `Completed`).
    pub fn pending_waiters(&self) -> usize {
        match &self.shared.lock().phase {
            Phase::Initial { waiters } | Phase::Pending { waiters, .. } => waiters.len(),
            Phase::Completed { .. } => 0,
        }
    }

    /// Time elapsed since settlement, once `Completed`.
    pub fn settled_for(&self) -> Option<Duration> {
        match &self.shared.lock().phase {
            Phase::Completed { settled_at, .. } => Some(settled_at.elapsed()),
            _ => None,
        }
    }

    /// True if both handles refer to the same flight.
    pub fn ptr_eq(&self, other: &Flight<T>) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Registers interest in the outcome.
    ///
    /// Never blocks and never fails. On a completed flight the returned waiter
    /// is already settled.
    pub fn create_waiter(&self) -> Waiter<T> {
        let mut inner = self.shared.lock();
        let id = inner.next_waiter;
        inner.next_waiter += 1;

        let (notifier, waiter) = waiter::pair(id);
        match &mut inner.phase {
            Phase::Initial { waiters } | Phase::Pending { waiters, .. } => waiters.push(notifier),
            Phase::Completed { outcome, .. } => notifier.notify(outcome),
        }
        waiter
    }

    /// Moves the flight to `Pending`, invokes the operation and returns the
    /// future that settles it.
    ///
    /// The returned [`Execution`] must be polled to completion; dropping it
    /// early settles the flight with [`OperationError::Abandoned`].
    /// If invoking the operation panics, the flight is already settled with
    /// [`OperationError::Panicked`] when this returns.
    pub fn start(&self) -> Result<Execution<T>, FlightError> {
        {
            let mut inner = self.shared.lock();
            let waiters = match &mut inner.phase {
                Phase::Initial { waiters } => std::mem::take(waiters),
                other => {
                    return Err(FlightError::AlreadyStarted {
                        state: other.state(),
                    });
                }
            };
            inner.phase = Phase::Pending {
                waiters,
                started_at: Instant::now(),
            };
        }
        self.shared.publish(Event::new(EventKind::FlightStarting));
        Ok(Execution::new(Arc::clone(&self.shared)))
    }

    /// Starts the flight on the tokio runtime.
    ///
    /// The join handle yields the outcome; awaiting it is optional.
    pub fn execute(&self) -> Result<JoinHandle<Arc<Outcome<T>>>, FlightError> {
        let exec = self.start()?;
        Ok(tokio::spawn(exec))
    }

    /// Settles the flight with [`OperationError::Disposed`] and cancels the operation.
    ///
    /// Returns the number of waiters rejected. No-op on a completed flight.
    pub fn dispose(&self, reason: impl Into<String>) -> usize {
        let reason = reason.into();
        let mut inner = self.shared.lock();
        let waiters = match &mut inner.phase {
            Phase::Completed { .. } => return 0,
            Phase::Initial { waiters } | Phase::Pending { waiters, .. } => std::mem::take(waiters),
        };

        let outcome = Arc::new(Outcome::Failure(OperationError::Disposed {
            reason: reason.clone(),
        }));
        let rejected = waiters.len();
        inner.phase = Phase::Completed {
            outcome: Arc::clone(&outcome),
            settled_at: Instant::now(),
        };
        for w in waiters {
            w.notify(&outcome);
        }
        drop(inner);

        self.shared.token.cancel();
        self.shared.publish(
            Event::new(EventKind::FlightDisposed)
                .with_reason(reason)
                .with_waiters(rejected),
        );
        rejected
    }
}

impl<T: Clone + Send + Sync + 'static> std::fmt::Debug for Flight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flight")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .finish()
    }
}
