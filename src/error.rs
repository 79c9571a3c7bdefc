//! Error types used by flights and the operations they wrap.
//!
//! This module defines two error enums:
//!
//! - [`OperationError`] — the failure side of an [`Outcome`](crate::Outcome),
//!   delivered identically to every waiter of a flight.
//! - [`FlightError`] — misuse faults raised by the runner itself, such as
//!   executing a flight twice.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logs/metrics.

use std::time::Duration;
use thiserror::Error;

use crate::core::FlightState;

/// # Misuse faults raised by a [`Flight`](crate::Flight).
///
/// These are programming errors in the caller. They are returned synchronously
/// from [`Flight::start`](crate::Flight::start) / [`Flight::execute`](crate::Flight::execute)
/// and never delivered to waiters.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlightError {
    /// The flight already left [`FlightState::Initial`]; an operation runs at most once per flight.
    #[error("flight already started (state: {state:?})")]
    AlreadyStarted {
        /// State observed when the second start was attempted.
        state: FlightState,
    },
}

impl FlightError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use flightcast::{FlightError, FlightState};
    ///
    /// let err = FlightError::AlreadyStarted { state: FlightState::Pending };
    /// assert_eq!(err.as_label(), "flight_already_started");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            FlightError::AlreadyStarted { .. } => "flight_already_started",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            FlightError::AlreadyStarted { state } => {
                format!("execute called twice; state={state:?}")
            }
        }
    }
}

/// # Failure outcome of a wrapped operation.
///
/// The same value is cloned into every waiter of a flight, so the type is `Clone`
/// and carries only owned, cheap data.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// Operation returned an error.
    #[error("operation failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Operation exceeded the configured timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Operation observed cancellation and stopped.
    #[error("operation cancelled")]
    Canceled,

    /// Operation future panicked.
    #[error("operation panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// Flight was disposed before the operation settled.
    #[error("flight disposed: {reason}")]
    Disposed {
        /// Reason passed to `dispose`.
        reason: String,
    },

    /// The execution driving the flight was dropped before it settled.
    #[error("flight abandoned before settlement")]
    Abandoned,
}

impl OperationError {
    /// Shorthand for [`OperationError::Fail`].
    ///
    /// ```
    /// use flightcast::OperationError;
    ///
    /// let err = OperationError::fail("boom");
    /// assert_eq!(err.to_string(), "operation failed: boom");
    /// ```
    pub fn fail(error: impl Into<String>) -> Self {
        OperationError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            OperationError::Fail { .. } => "operation_failed",
            OperationError::Timeout { .. } => "operation_timeout",
            OperationError::Canceled => "operation_canceled",
            OperationError::Panicked { .. } => "operation_panicked",
            OperationError::Disposed { .. } => "flight_disposed",
            OperationError::Abandoned => "flight_abandoned",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            OperationError::Fail { error } => format!("error: {error}"),
            OperationError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            OperationError::Canceled => "operation cancelled".to_string(),
            OperationError::Panicked { info } => format!("panic: {info}"),
            OperationError::Disposed { reason } => format!("disposed: {reason}"),
            OperationError::Abandoned => "abandoned".to_string(),
        }
    }

    /// Indicates whether a fresh flight for the same work might succeed.
    ///
    /// Flights never retry on their own; callers use this to decide whether to
    /// start a new one.
    ///
    /// ```
    /// use flightcast::OperationError;
    ///
    /// assert!(OperationError::fail("flaky").is_retryable());
    /// assert!(!OperationError::Disposed { reason: "shutdown".into() }.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OperationError::Fail { .. }
                | OperationError::Timeout { .. }
                | OperationError::Panicked { .. }
        )
    }
}
