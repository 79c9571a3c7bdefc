//! # Operation abstractions.
//!
//! This module provides the wrapped asynchronous action a flight runs:
//! - [`Operation`] - trait for async cancelable operations producing a value
//! - [`OperationFn`] - closure-backed implementation
//! - [`OperationRef`] - shared reference to an operation (`Arc<dyn Operation>`)

mod operation;
mod operation_fn;

pub use operation::{BoxOperationFuture, Operation, OperationRef};
pub use operation_fn::OperationFn;
