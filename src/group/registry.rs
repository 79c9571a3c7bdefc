//! # FlightGroup: join-or-start by key.
//!
//! ## Architecture
//! ```text
//! work(key, op)
//!   ├─ key present and reusable ─► FlightJoined, flight.create_waiter()
//!   ├─ key present but expired  ─► FlightEvicted("expired"), fall through
//!   └─ new Flight(op) ─► insert ─► create_waiter ─► start ─► tokio::spawn(exec)
//!                                                              │
//!                                    settled ◄─────────────────┘
//!                                       └─ Retention::UntilSettled ─► FlightEvicted("settled")
//! ```
//!
//! ## Rules
//! - At most one live flight per key; concurrent `work` calls for a key share it.
//! - Reusable = not settled yet, or settled and still within [`Retention`](crate::Retention).
//! - A failed outcome is retained like a successful one; `forget` the key (or use
//!   `UntilSettled`) to let the next call start a fresh flight.
//! - After `shutdown` the group is closed: `work` registers nothing, never invokes
//!   the operation and returns a waiter already settled with `Disposed`.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{FlightConfig, Retention};
use crate::core::{Flight, Waiter};
use crate::events::{Bus, Event, EventKind};
use crate::operations::OperationRef;

use super::builder::FlightGroupBuilder;

const CLOSED_REASON: &str = "group is shut down";

/// Caller-owned map from key to flight.
///
/// # Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use flightcast::{FlightConfig, FlightGroup, OperationError, OperationFn, OperationRef};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let group = FlightGroup::<&'static str, u64>::builder(FlightConfig::default()).build();
/// let op: OperationRef<u64> = OperationFn::arc("user-42", |_ctx: CancellationToken| async {
///     Ok::<u64, OperationError>(42)
/// });
///
/// let a = group.work("user-42", op.clone());
/// let b = group.work("user-42", op);
/// assert_eq!(a.await, Ok(42));
/// assert_eq!(b.await, Ok(42));
/// # }
/// ```
pub struct FlightGroup<K, T> {
    pub(super) cfg: FlightConfig,
    pub(super) flights: Mutex<HashMap<K, Flight<T>>>,
    pub(super) bus: Bus,
    pub(super) token: CancellationToken,
    pub(super) closed: AtomicBool,
    pub(super) listener: Mutex<Option<JoinHandle<()>>>,
}

impl<K, T> FlightGroup<K, T>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Returns a builder for a group with the given configuration.
    pub fn builder(cfg: FlightConfig) -> FlightGroupBuilder<K, T> {
        FlightGroupBuilder::new(cfg)
    }

    /// Creates a group without subscribers.
    pub fn new(cfg: FlightConfig) -> Arc<Self> {
        Self::builder(cfg).build()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Flight<T>>> {
        self.flights.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_reusable(&self, flight: &Flight<T>) -> bool {
        match flight.settled_for() {
            None => true,
            Some(age) => self.cfg.retention.retains(age),
        }
    }

    fn publish_evicted(&self, flight: &Flight<T>, reason: &'static str) {
        self.bus.publish(
            Event::new(EventKind::FlightEvicted)
                .with_flight(flight.name())
                .with_reason(reason),
        );
    }

    /// Joins the live flight for `key`, or starts `op` as a new flight.
    ///
    /// Never blocks. `op` is dropped unused when an existing flight is joined.
    /// Must be called inside a tokio runtime.
    pub fn work(self: &Arc<Self>, key: K, op: OperationRef<T>) -> Waiter<T> {
        let flight = {
            let mut flights = self.lock();
            if self.closed.load(Ordering::Acquire) {
                drop(flights);
                return self.refuse(op);
            }
            if let Some(existing) = flights.get(&key) {
                if self.is_reusable(existing) {
                    self.bus
                        .publish(Event::new(EventKind::FlightJoined).with_flight(existing.name()));
                    return existing.create_waiter();
                }
                self.publish_evicted(existing, "expired");
            }

            let flight = Flight::attached(op, &self.cfg, self.bus.clone(), self.token.child_token());
            flights.insert(key.clone(), flight.clone());
            flight
        };

        let waiter = flight.create_waiter();
        // Err only if a concurrent shutdown already disposed the flight.
        if let Ok(exec) = flight.start() {
            let group = Arc::downgrade(self);
            tokio::spawn(async move {
                exec.await;
                if let Some(group) = group.upgrade() {
                    group.on_settled(&key, &flight);
                }
            });
        }
        waiter
    }

    /// Waiter for work submitted to a closed group; `op` is never invoked.
    fn refuse(&self, op: OperationRef<T>) -> Waiter<T> {
        let flight = Flight::attached(op, &self.cfg, self.bus.clone(), self.token.child_token());
        let waiter = flight.create_waiter();
        flight.dispose(CLOSED_REASON);
        waiter
    }

    fn on_settled(&self, key: &K, flight: &Flight<T>) {
        if self.cfg.retention != Retention::UntilSettled {
            return;
        }
        let mut flights = self.lock();
        if flights.get(key).is_some_and(|f| f.ptr_eq(flight)) {
            flights.remove(key);
            drop(flights);
            self.publish_evicted(flight, "settled");
        }
    }

    /// Returns the flight currently registered for `key`, reusable or not.
    pub fn get(&self, key: &K) -> Option<Flight<T>> {
        self.lock().get(key).cloned()
    }

    /// Removes `key` without disposing its flight; waiters already registered still settle.
    pub fn forget(&self, key: &K) -> Option<Flight<T>> {
        let removed = self.lock().remove(key);
        if let Some(flight) = &removed {
            self.publish_evicted(flight, "forgotten");
        }
        removed
    }

    /// Evicts every settled flight no longer covered by the retention policy.
    ///
    /// Returns the number of evicted flights.
    pub fn purge_expired(&self) -> usize {
        let mut evicted = Vec::new();
        self.lock().retain(|_, flight| {
            let keep = self.is_reusable(flight);
            if !keep {
                evicted.push(flight.clone());
            }
            keep
        });
        for flight in &evicted {
            self.publish_evicted(flight, "expired");
        }
        evicted.len()
    }

    /// Number of registered flights.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if no flights are registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Disposes every flight, stops the event listener and returns the number of
    /// waiters rejected with [`OperationError::Disposed`](crate::OperationError::Disposed).
    ///
    /// Events published before shutdown are delivered to subscribers before this returns.
    pub async fn shutdown(&self, reason: impl Into<String>) -> usize {
        let reason = reason.into();
        let drained: Vec<Flight<T>> = {
            let mut flights = self.lock();
            self.closed.store(true, Ordering::Release);
            flights.drain().map(|(_, f)| f).collect()
        };
        let rejected: usize = drained.iter().map(|f| f.dispose(reason.clone())).sum();

        self.bus.publish(
            Event::new(EventKind::GroupShutdown)
                .with_reason(reason)
                .with_waiters(rejected),
        );
        self.token.cancel();

        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = listener {
            let _ = handle.await;
        }
        rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OperationError;
    use crate::operations::OperationFn;
    use crate::subscribers::Subscribe;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counted(calls: &Arc<AtomicUsize>, delay: Duration) -> OperationRef<usize> {
        let calls = Arc::clone(calls);
        OperationFn::arc("counted", move |_ctx: CancellationToken| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                tokio::time::sleep(delay).await;
                Ok::<usize, OperationError>(n)
            }
        })
    }

    fn group(retention: Retention) -> Arc<FlightGroup<&'static str, usize>> {
        FlightGroup::new(FlightConfig {
            retention,
            ..FlightConfig::default()
        })
    }

    #[derive(Default)]
    struct Recorder {
        kinds: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.kinds.lock().unwrap().push(event.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_work_for_one_key_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let g = group(Retention::Forever);

        let waiters: Vec<_> = (0..10)
            .map(|_| g.work("k", counted(&calls, Duration::from_millis(100))))
            .collect();
        assert_eq!(g.len(), 1);

        for w in waiters {
            assert_eq!(w.await, Ok(1));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_keys_run_independently() {
        let calls = Arc::new(AtomicUsize::new(0));
        let g = group(Retention::Forever);

        let a = g.work("a", counted(&calls, Duration::from_millis(10)));
        let b = g.work("b", counted(&calls, Duration::from_millis(10)));
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        assert_ne!(a, b);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(g.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forever_retention_serves_cached_outcome() {
        let calls = Arc::new(AtomicUsize::new(0));
        let g = group(Retention::Forever);

        assert_eq!(g.work("k", counted(&calls, Duration::from_millis(10))).await, Ok(1));
        tokio::time::advance(Duration::from_secs(3600)).await;

        let mut again = g.work("k", counted(&calls, Duration::from_millis(10)));
        assert_eq!(again.try_outcome(), Some(Ok(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(g.purge_expired(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_until_settled_evicts_on_completion() {
        let calls = Arc::new(AtomicUsize::new(0));
        let g = group(Retention::UntilSettled);

        assert_eq!(g.work("k", counted(&calls, Duration::from_millis(10))).await, Ok(1));
        tokio::task::yield_now().await;
        assert!(g.is_empty());

        assert_eq!(g.work("k", counted(&calls, Duration::from_millis(10))).await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_reuses_until_expiry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let g = group(Retention::Ttl(Duration::from_secs(10)));

        assert_eq!(g.work("k", counted(&calls, Duration::ZERO)).await, Ok(1));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(g.work("k", counted(&calls, Duration::ZERO)).await, Ok(1));
        assert_eq!(g.purge_expired(), 0);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(g.purge_expired(), 1);
        assert!(g.get(&"k").is_none());

        assert_eq!(g.work("k", counted(&calls, Duration::ZERO)).await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_work_replaces_expired_flight() {
        let calls = Arc::new(AtomicUsize::new(0));
        let recorder = Arc::new(Recorder::default());
        let g: Arc<FlightGroup<&'static str, usize>> = FlightGroup::builder(FlightConfig {
            retention: Retention::Ttl(Duration::from_secs(10)),
            ..FlightConfig::default()
        })
        .with_subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
        .build();

        assert_eq!(g.work("k", counted(&calls, Duration::ZERO)).await, Ok(1));
        let old = g.get(&"k").unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(g.work("k", counted(&calls, Duration::ZERO)).await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let fresh = g.get(&"k").unwrap();
        assert!(!fresh.ptr_eq(&old));
        assert_eq!(g.len(), 1);

        g.shutdown("done").await;
        let kinds = recorder.kinds.lock().unwrap().clone();
        assert_eq!(
            kinds.iter().filter(|k| **k == EventKind::FlightEvicted).count(),
            1
        );
        assert_eq!(
            kinds.iter().filter(|k| **k == EventKind::FlightStarting).count(),
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_panicking_before_its_future_settles_the_key() {
        let boom: OperationRef<usize> = OperationFn::arc("boom", |_ctx: CancellationToken| {
            if true {
                panic!("sync boom");
            }
            async { Ok::<usize, OperationError>(0) }
        });
        let calls = Arc::new(AtomicUsize::new(0));
        let g = group(Retention::Forever);

        let expected = Err(OperationError::Panicked {
            info: "sync boom".into(),
        });
        assert_eq!(g.work("k", boom).await, expected);
        assert_eq!(g.get(&"k").unwrap().state(), crate::FlightState::Completed);

        let joined = tokio::time::timeout(
            Duration::from_secs(3600),
            g.work("k", counted(&calls, Duration::ZERO)),
        )
        .await;
        assert_eq!(joined, Ok(expected));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_forget_allows_retry_after_failure() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let a = Arc::clone(&attempts);
        let flaky: OperationRef<usize> = OperationFn::arc("flaky", move |_ctx: CancellationToken| {
            let n = a.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(OperationError::fail("first call fails"))
                } else {
                    Ok(n)
                }
            }
        });
        let g: Arc<FlightGroup<&'static str, usize>> = group(Retention::Forever);

        let err = g.work("k", flaky.clone()).await.unwrap_err();
        assert!(err.is_retryable());
        // failure is retained until the caller decides to retry
        assert_eq!(g.work("k", flaky.clone()).await, Err(err));

        assert!(g.forget(&"k").is_some());
        assert_eq!(g.work("k", flaky).await, Ok(1));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_disposes_pending_flights() {
        let calls = Arc::new(AtomicUsize::new(0));
        let g = group(Retention::Forever);

        let a = g.work("a", counted(&calls, Duration::from_secs(60)));
        let b = g.work("a", counted(&calls, Duration::from_secs(60)));
        let c = g.work("c", counted(&calls, Duration::from_secs(60)));

        assert_eq!(g.shutdown("stopping").await, 3);
        assert!(g.is_empty());

        let disposed = Err(OperationError::Disposed {
            reason: "stopping".into(),
        });
        assert_eq!(a.await, disposed);
        assert_eq!(b.await, disposed);
        assert_eq!(c.await, disposed);
    }

    #[tokio::test]
    async fn test_work_after_shutdown_is_refused() {
        let calls = Arc::new(AtomicUsize::new(0));
        let g = group(Retention::Forever);
        g.shutdown("stopping").await;

        let w = g.work("k", counted(&calls, Duration::ZERO));
        assert_eq!(
            w.await,
            Err(OperationError::Disposed {
                reason: CLOSED_REASON.into(),
            })
        );
        assert!(g.is_empty());
        assert!(g.get(&"k").is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_subscribers_observe_flight_lifecycle() {
        let calls = Arc::new(AtomicUsize::new(0));
        let recorder = Arc::new(Recorder::default());
        let g: Arc<FlightGroup<&'static str, usize>> = FlightGroup::builder(FlightConfig::default())
            .with_subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
            .build();

        let first = g.work("k", counted(&calls, Duration::ZERO));
        let second = g.work("k", counted(&calls, Duration::ZERO));
        assert_eq!(first.await, Ok(1));
        assert_eq!(second.await, Ok(1));
        g.shutdown("done").await;

        assert_eq!(
            *recorder.kinds.lock().unwrap(),
            vec![
                EventKind::FlightStarting,
                EventKind::FlightJoined,
                EventKind::FlightSucceeded,
                EventKind::GroupShutdown,
            ]
        );
    }
}
