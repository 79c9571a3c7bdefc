//! # Settled result of a flight.

use crate::error::OperationError;

/// Immutable success/failure record, produced exactly once per flight.
///
/// A flight keeps its outcome behind an `Arc` and clones the inner value into
/// each waiter it notifies.
///
/// # Example
/// ```
/// use flightcast::{OperationError, Outcome};
///
/// let ok: Outcome<u32> = Ok(42).into();
/// assert!(ok.succeeded());
/// assert_eq!(ok.value(), Some(&42));
///
/// let failed: Outcome<u32> = Outcome::Failure(OperationError::fail("boom"));
/// assert!(!failed.succeeded());
/// assert_eq!(failed.error().map(|e| e.as_label()), Some("operation_failed"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation produced a value.
    Success(T),
    /// The operation failed, timed out, panicked or the flight was disposed.
    Failure(OperationError),
}

impl<T> Outcome<T> {
    /// True if the operation succeeded.
    #[inline]
    pub fn succeeded(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Borrowed success value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Success(v) => Some(v),
            Outcome::Failure(_) => None,
        }
    }

    /// Borrowed failure, if any.
    pub fn error(&self) -> Option<&OperationError> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(e) => Some(e),
        }
    }

    /// Borrowed view as a `Result`.
    pub fn as_result(&self) -> Result<&T, &OperationError> {
        match self {
            Outcome::Success(v) => Ok(v),
            Outcome::Failure(e) => Err(e),
        }
    }

    /// Converts into a `Result`.
    pub fn into_result(self) -> Result<T, OperationError> {
        match self {
            Outcome::Success(v) => Ok(v),
            Outcome::Failure(e) => Err(e),
        }
    }
}

impl<T: Clone> Outcome<T> {
    /// Owned copy delivered to a single waiter.
    pub(crate) fn to_result(&self) -> Result<T, OperationError> {
        self.clone().into_result()
    }
}

impl<T> From<Result<T, OperationError>> for Outcome<T> {
    fn from(res: Result<T, OperationError>) -> Self {
        match res {
            Ok(v) => Outcome::Success(v),
            Err(e) => Outcome::Failure(e),
        }
    }
}
