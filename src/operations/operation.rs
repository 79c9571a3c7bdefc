//! # Operation trait.
//!
//! An [`Operation`] is the unit of work a [`Flight`](crate::Flight) deduplicates.
//! It receives a [`CancellationToken`] and should check it to stop cooperatively
//! when the flight is disposed or times out.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::OperationError;

/// Boxed future returned by [`Operation::spawn`].
pub type BoxOperationFuture<T> = Pin<Box<dyn Future<Output = Result<T, OperationError>> + Send + 'static>>;

/// Shared handle to an operation producing `T`.
pub type OperationRef<T> = Arc<dyn Operation<Output = T>>;

/// # Asynchronous, cancelable operation producing one value.
///
/// A flight calls [`spawn`](Operation::spawn) at most once. The same operation
/// may back several flights over time (e.g. after a failed outcome is evicted),
/// so `spawn` takes `&self` and must produce a fresh future per call.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use flightcast::{BoxOperationFuture, Operation, OperationError};
///
/// struct Answer;
///
/// impl Operation for Answer {
///     type Output = u32;
///
///     fn name(&self) -> &str { "answer" }
///
///     fn spawn(&self, ctx: CancellationToken) -> BoxOperationFuture<u32> {
///         Box::pin(async move {
///             if ctx.is_cancelled() {
///                 return Err(OperationError::Canceled);
///             }
///             Ok(42)
///         })
///     }
/// }
/// ```
pub trait Operation: Send + Sync + 'static {
    /// Value produced on success. Cloned into every waiter.
    type Output: Clone + Send + Sync + 'static;

    /// Returns a stable, human-readable operation name (used in events).
    fn name(&self) -> &str;

    /// Creates the future performing the work.
    fn spawn(&self, ctx: CancellationToken) -> BoxOperationFuture<Self::Output>;
}
