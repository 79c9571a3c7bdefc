//! # Closure-backed operation (`OperationFn`)
//!
//! [`OperationFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a
//! fresh future per spawn. If state must be shared between spawns, capture an
//! `Arc<...>` explicitly inside the closure.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use flightcast::{OperationError, OperationFn, OperationRef};
//!
//! let op: OperationRef<String> = OperationFn::arc("fetch-config", |_ctx: CancellationToken| async move {
//!     Ok::<_, OperationError>("v1".to_string())
//! });
//!
//! assert_eq!(op.name(), "fetch-config");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::OperationError;
use crate::operations::operation::{BoxOperationFuture, Operation};

/// Function-backed operation.
///
/// Wraps a closure that *creates* a new future per spawn.
#[derive(Debug)]
pub struct OperationFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> OperationFn<F> {
    /// Creates a new function-backed operation.
    ///
    /// Prefer [`OperationFn::arc`] when you immediately need an [`OperationRef`](crate::OperationRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    /// Creates the operation and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut, T> Operation for OperationFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, OperationError>> + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    type Output = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, ctx: CancellationToken) -> BoxOperationFuture<T> {
        Box::pin((self.f)(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::OperationRef;

    #[tokio::test]
    async fn test_each_spawn_builds_a_fresh_future() {
        let op: OperationRef<u32> = OperationFn::arc("count", |_ctx: CancellationToken| async {
            Ok::<u32, OperationError>(7)
        });

        assert_eq!(op.spawn(CancellationToken::new()).await, Ok(7));
        assert_eq!(op.spawn(CancellationToken::new()).await, Ok(7));
    }

    #[tokio::test]
    async fn test_operation_sees_cancelled_token() {
        let op = OperationFn::arc("cancel-aware", |ctx: CancellationToken| async move {
            if ctx.is_cancelled() {
                return Err(OperationError::Canceled);
            }
            Ok(1u8)
        });
        let token = CancellationToken::new();
        token.cancel();

        assert_eq!(op.spawn(token).await, Err(OperationError::Canceled));
    }
}
