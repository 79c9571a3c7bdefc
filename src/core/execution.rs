//! # Run the operation of a started flight.
//!
//! [`Execution`] is returned by [`Flight::start`](crate::Flight::start). It invokes the
//! operation with a child cancellation token and settles the flight with whatever
//! the attempt produced.
//!
//! ## Result mapping
//! ```text
//! op future ── Ok(v)           ──► Outcome::Success(v)
//!           ── Err(e)          ──► Outcome::Failure(e)
//!           ── panic           ──► Failure(Panicked { info })
//! op.spawn panics              ──► Failure(Panicked { info }), settled inside start
//!           ── timeout elapsed ──► cancel child, publish TimeoutHit, Failure(Timeout)
//! flight token cancelled       ──► stop waiting (dispose already stored the outcome)
//! Execution dropped unsettled  ──► Failure(Abandoned)
//! ```

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::core::flight::Shared;
use crate::core::outcome::Outcome;
use crate::error::OperationError;
use crate::events::{Event, EventKind};
use crate::operations::BoxOperationFuture;

/// Future driving one started flight to settlement.
///
/// Resolves to the stored outcome (which is the disposal outcome if the
/// flight was disposed while running).
#[must_use = "an execution settles its flight only when polled"]
pub struct Execution<T> {
    fut: BoxFuture<'static, Arc<Outcome<T>>>,
}

impl<T: Clone + Send + Sync + 'static> Execution<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Self {
        let child = shared.token().child_token();
        let mut guard = AbandonGuard {
            shared: Some(Arc::clone(&shared)),
        };

        let work = match panic::catch_unwind(AssertUnwindSafe(|| shared.op().spawn(child.clone()))) {
            Ok(work) => work,
            Err(payload) => {
                guard.disarm();
                let outcome = shared.settle(Err(OperationError::Panicked {
                    info: panic_message(payload.as_ref()),
                }));
                return Self {
                    fut: futures::future::ready(outcome).boxed(),
                };
            }
        };

        let fut = async move {
            let mut guard = guard;
            let result = drive(&shared, work, child).await;
            guard.disarm();
            shared.settle(result)
        }
        .boxed();
        Self { fut }
    }
}

impl<T> Future for Execution<T> {
    type Output = Arc<Outcome<T>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.fut.poll_unpin(cx)
    }
}

async fn drive<T>(
    shared: &Shared<T>,
    work: BoxOperationFuture<T>,
    child: CancellationToken,
) -> Result<T, OperationError>
where
    T: Clone + Send + Sync + 'static,
{
    let caught = AssertUnwindSafe(work).catch_unwind();
    let attempt = async {
        let res = match shared.timeout() {
            Some(dur) => match time::timeout(dur, caught).await {
                Ok(r) => r,
                Err(_elapsed) => {
                    child.cancel();
                    shared.publish(Event::new(EventKind::TimeoutHit).with_timeout(dur));
                    return Err(OperationError::Timeout { timeout: dur });
                }
            },
            None => caught.await,
        };
        res.unwrap_or_else(|panic| {
            Err(OperationError::Panicked {
                info: panic_message(panic.as_ref()),
            })
        })
    };

    tokio::select! {
        biased;
        _ = shared.token().cancelled() => Err(OperationError::Canceled),
        res = attempt => res,
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Settles the flight with `Abandoned` if the execution is dropped mid-flight.
struct AbandonGuard<T: Clone + Send + Sync + 'static> {
    shared: Option<Arc<Shared<T>>>,
}

impl<T: Clone + Send + Sync + 'static> AbandonGuard<T> {
    fn disarm(&mut self) {
        self.shared = None;
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for AbandonGuard<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.settle(Err(OperationError::Abandoned));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::config::FlightConfig;
    use crate::core::{Flight, FlightState};
    use crate::error::OperationError;
    use crate::operations::{OperationFn, OperationRef};
    use tokio_util::sync::CancellationToken;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_and_cancels_operation() {
        let seen: Arc<Mutex<Option<CancellationToken>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        let op: OperationRef<u32> = OperationFn::arc("slow", move |ctx: CancellationToken| {
            *slot.lock().unwrap() = Some(ctx);
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<u32, OperationError>(1)
            }
        });
        let cfg = FlightConfig {
            timeout: Duration::from_secs(1),
            ..FlightConfig::default()
        };
        let flight = Flight::with_config(op, &cfg);
        let w = flight.create_waiter();

        let outcome = flight.start().unwrap().await;
        let expected = OperationError::Timeout {
            timeout: Duration::from_secs(1),
        };
        assert_eq!(outcome.error(), Some(&expected));
        assert_eq!(w.await, Err(expected));

        let token = seen.lock().unwrap().take().unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_panic_becomes_failure_for_every_waiter() {
        let op: OperationRef<u32> = OperationFn::arc("explode", |_ctx: CancellationToken| async {
            if true {
                panic!("kaboom");
            }
            Ok::<u32, OperationError>(0)
        });
        let flight = Flight::new(op);
        let a = flight.create_waiter();
        let b = flight.create_waiter();

        flight.start().unwrap().await;
        let expected = OperationError::Panicked {
            info: "kaboom".into(),
        };
        assert_eq!(a.await, Err(expected.clone()));
        assert_eq!(b.await, Err(expected));
    }

    #[tokio::test]
    async fn test_panic_before_future_is_built_settles_flight() {
        let op: OperationRef<u32> = OperationFn::arc("eager-boom", |_ctx: CancellationToken| {
            if true {
                panic!("sync boom");
            }
            async { Ok::<u32, OperationError>(0) }
        });
        let flight = Flight::new(op);
        let early = flight.create_waiter();

        let exec = flight.start().unwrap();
        assert_eq!(flight.state(), FlightState::Completed);

        let expected = OperationError::Panicked {
            info: "sync boom".into(),
        };
        assert_eq!(exec.await.error(), Some(&expected));
        assert_eq!(early.await, Err(expected.clone()));
        assert_eq!(flight.create_waiter().await, Err(expected));
    }

    #[tokio::test]
    async fn test_dropped_execution_abandons_waiters() {
        let op: OperationRef<u32> = OperationFn::arc("never-polled", |_ctx: CancellationToken| async {
            Ok::<u32, OperationError>(1)
        });
        let flight = Flight::new(op);
        let w = flight.create_waiter();

        let exec = flight.start().unwrap();
        assert_eq!(flight.state(), FlightState::Pending);
        drop(exec);

        assert_eq!(flight.state(), FlightState::Completed);
        assert_eq!(w.await, Err(OperationError::Abandoned));
    }

    #[tokio::test]
    async fn test_start_invokes_operation_once_even_if_never_polled() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let op: OperationRef<()> = OperationFn::arc("eager", move |_ctx: CancellationToken| {
            c.fetch_add(1, Ordering::SeqCst);
            async { Ok::<(), OperationError>(()) }
        });
        let flight = Flight::new(op);
        let exec = flight.start().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(flight.start().is_err());
        exec.await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
