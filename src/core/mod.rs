//! Flight core: the single-flight runner and its waiters.
//!
//! The public API from this module is [`Flight`] (the runner), [`Waiter`]
//! (one caller's subscription), [`Outcome`] (the settled result) and
//! [`Execution`] (the future driving a started flight).
//!
//! Internal modules:
//! - [`outcome`]: immutable success/failure record;
//! - [`waiter`]: one-shot waiter handle and its crate-private notifier half;
//! - [`flight`]: state machine, waiter registration, settlement fan-out;
//! - [`execution`]: runs the operation once with timeout/panic/abandon handling.
//!
//! ## Lifecycle
//! ```text
//! Flight::new(op)            create_waiter() ──► registered (Initial/Pending)
//!      │                                     └─► settled at once (Completed)
//!      ▼
//!   Initial ──start()/execute()──► Pending ──settle──► Completed (terminal)
//!                                     │                  ▲
//!                                     └──dispose(reason)─┘
//! ```

mod execution;
mod flight;
mod outcome;
mod waiter;

pub use execution::Execution;
pub use flight::{Flight, FlightState};
pub use outcome::Outcome;
pub use waiter::Waiter;

pub(crate) use execution::panic_message;
