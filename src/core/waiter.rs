//! # One-shot waiters.
//!
//! A waiter is split in two halves over a [`tokio::sync::oneshot`] channel:
//! - [`Waiter`] — returned to the caller; a future resolving to the flight's result.
//! - [`Notifier`] — kept by the flight; [`Notifier::notify`] consumes it, so a
//!   waiter can never be settled twice.
//!
//! ## Rules
//! - A waiter settles at most once and is never reused.
//! - Dropping a `Waiter` only withdraws that caller's interest; the flight and
//!   every other waiter are unaffected.
//! - If the notifier disappears without firing, the waiter resolves to
//!   [`OperationError::Abandoned`].

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::FusedFuture;
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::core::outcome::Outcome;
use crate::error::OperationError;

type Delivery<T> = Result<T, OperationError>;

/// Creates a connected notifier/waiter pair.
pub(crate) fn pair<T>(id: u64) -> (Notifier<T>, Waiter<T>) {
    let (tx, rx) = oneshot::channel();
    (
        Notifier { tx },
        Waiter {
            id,
            rx,
            ready: None,
            done: false,
        },
    )
}

/// Flight-side half of a waiter.
pub(crate) struct Notifier<T> {
    tx: oneshot::Sender<Delivery<T>>,
}

impl<T: Clone> Notifier<T> {
    /// Settles the paired [`Waiter`] from `outcome`.
    ///
    /// If the caller already dropped its waiter the delivery is discarded.
    pub fn notify(self, outcome: &Outcome<T>) {
        let _ = self.tx.send(outcome.to_result());
    }
}

/// Caller-side subscription to a flight's outcome.
///
/// Resolves to `Ok(value)` if the operation succeeded, or to the shared
/// [`OperationError`] otherwise. Once resolved it behaves as a fused future
/// and stays pending if polled again.
///
/// # Example
/// ```
/// use flightcast::{Flight, OperationError, OperationFn};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let flight = Flight::new(OperationFn::arc("ping", |_ctx: CancellationToken| async {
///     Ok::<_, OperationError>("pong")
/// }));
///
/// let waiter = flight.create_waiter();
/// flight.execute().unwrap();
/// assert_eq!(waiter.await, Ok("pong"));
/// # }
/// ```
#[must_use = "a waiter does nothing unless awaited or inspected"]
pub struct Waiter<T> {
    id: u64,
    rx: oneshot::Receiver<Delivery<T>>,
    ready: Option<Delivery<T>>,
    done: bool,
}

impl<T> Waiter<T> {
    /// Registration number within the flight (0-based, in creation order).
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True once the flight has delivered a result to this waiter.
    ///
    /// Never suspends; a waiter created on a completed flight is settled
    /// immediately.
    pub fn is_settled(&mut self) -> bool {
        self.fill();
        self.done || self.ready.is_some()
    }

    /// Returns the delivered result without waiting, or `None` while pending.
    ///
    /// Does not consume the result: awaiting the waiter afterwards yields the same value.
    /// Returns `None` once the waiter has been awaited to completion.
    pub fn try_outcome(&mut self) -> Option<Result<T, OperationError>>
    where
        T: Clone,
    {
        self.fill();
        self.ready.clone()
    }

    fn fill(&mut self) {
        if self.done || self.ready.is_some() {
            return;
        }
        match self.rx.try_recv() {
            Ok(delivery) => self.ready = Some(delivery),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Closed) => self.ready = Some(Err(OperationError::Abandoned)),
        }
    }
}

// `T` is only ever moved, never pinned.
impl<T> Unpin for Waiter<T> {}

impl<T> Future for Waiter<T> {
    type Output = Result<T, OperationError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.done {
            return Poll::Pending;
        }
        if let Some(delivery) = this.ready.take() {
            this.done = true;
            return Poll::Ready(delivery);
        }
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(res) => {
                this.done = true;
                Poll::Ready(res.unwrap_or(Err(OperationError::Abandoned)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> FusedFuture for Waiter<T> {
    fn is_terminated(&self) -> bool {
        self.done
    }
}

impl<T> std::fmt::Debug for Waiter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter")
            .field("id", &self.id)
            .field("ready", &self.ready.is_some())
            .field("done", &self.done)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[test]
    fn test_notify_settles_waiter_without_runtime() {
        let (notifier, mut waiter) = pair::<u32>(0);
        assert!(!waiter.is_settled());
        assert_eq!(waiter.try_outcome(), None);

        notifier.notify(&Outcome::Success(5));

        assert!(waiter.is_settled());
        assert_eq!(waiter.try_outcome(), Some(Ok(5)));
        // peeking does not consume
        assert_eq!(waiter.now_or_never(), Some(Ok(5)));
    }

    #[test]
    fn test_failure_is_delivered_as_err() {
        let (notifier, waiter) = pair::<u32>(3);
        assert_eq!(waiter.id(), 3);
        notifier.notify(&Outcome::Failure(OperationError::fail("boom")));
        assert_eq!(waiter.now_or_never(), Some(Err(OperationError::fail("boom"))));
    }

    #[test]
    fn test_dropped_notifier_resolves_abandoned() {
        let (notifier, mut waiter) = pair::<u32>(0);
        drop(notifier);
        assert_eq!(waiter.try_outcome(), Some(Err(OperationError::Abandoned)));
    }

    #[tokio::test]
    async fn test_waiter_is_fused_after_completion() {
        let (notifier, mut waiter) = pair::<&'static str>(0);
        notifier.notify(&Outcome::Success("ok"));

        assert_eq!((&mut waiter).await, Ok("ok"));
        assert!(waiter.is_terminated());
        assert!(waiter.is_settled());
        assert_eq!(waiter.try_outcome(), None);
    }

    #[test]
    fn test_notify_after_waiter_dropped_is_silent() {
        let (notifier, waiter) = pair::<u32>(0);
        drop(waiter);
        notifier.notify(&Outcome::Success(1));
    }
}
