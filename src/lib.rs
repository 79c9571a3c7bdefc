//! # flightcast
//!
//! **flightcast** is a small single-flight library for tokio.
//!
//! It wraps one asynchronous operation, runs it **at most once**, and broadcasts
//! the single outcome to every interested caller, whether that caller registered
//! before, during or after the operation settled.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   caller A      caller B      caller C (late)
//!      │             │              │
//!      ▼             ▼              ▼
//! create_waiter  create_waiter  create_waiter ──► settled immediately
//!      │             │                               from stored Outcome
//!      ▼             ▼
//! ┌───────────────────────────────────────────────┐
//! │ Flight (Initial → Pending → Completed)        │
//! │  - waiters: ordered one-shot notifiers        │
//! │  - outcome: Arc<Outcome<T>> once settled      │
//! └──────────────┬────────────────────────────────┘
//!                │ start()/execute(): exactly one op.spawn(ctx)
//!                ▼
//!        Execution (timeout, panic capture, abandon guard)
//!                │ settle: store outcome, notify all waiters in order
//!                ▼
//!           Bus ──► SubscriberSet ──► LogWriter / custom subscribers
//! ```
//!
//! ### Keyed use
//! ```text
//! FlightGroup::work(key, op)
//!   ├─ live flight for key ─► join (FlightJoined)
//!   └─ none / expired       ─► new Flight, start on tokio
//! Retention: Forever | UntilSettled | Ttl(d)
//! ```
//!
//! ## Features
//! | Area              | Description                                                | Key types / traits                         |
//! |-------------------|------------------------------------------------------------|--------------------------------------------|
//! | **Runner**        | At-most-once execution with outcome fan-out.               | [`Flight`], [`FlightState`], [`Execution`] |
//! | **Waiters**       | One-shot futures, usable before or after settlement.       | [`Waiter`], [`Outcome`]                    |
//! | **Operations**    | Wrapped async work, as trait objects or closures.          | [`Operation`], [`OperationFn`]             |
//! | **Groups**        | Caller-owned keyed registry with retention policy.         | [`FlightGroup`], [`Retention`]             |
//! | **Subscriber API**| Observe flight events (logging, metrics).                  | [`Subscribe`], [`Event`]                   |
//! | **Errors**        | Operation failures and misuse faults.                      | [`OperationError`], [`FlightError`]        |
//! | **Configuration** | Timeout, retention and bus settings.                       | [`FlightConfig`]                           |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use flightcast::{Flight, OperationError, OperationFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let flight = Flight::new(OperationFn::arc("fetch", |_ctx: CancellationToken| async move {
//!         Ok::<_, OperationError>("payload".to_string())
//!     }));
//!
//!     let first = flight.create_waiter();
//!     let second = flight.create_waiter();
//!     flight.execute()?;
//!
//!     assert_eq!(first.await?, "payload");
//!     assert_eq!(second.await?, "payload");
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod group;
mod operations;
mod subscribers;

// ---- Public re-exports ----

pub use config::{FlightConfig, Retention};
pub use self::core::{Execution, Flight, FlightState, Outcome, Waiter};
pub use error::{FlightError, OperationError};
pub use events::{Event, EventKind};
pub use group::{FlightGroup, FlightGroupBuilder};
pub use operations::{BoxOperationFuture, Operation, OperationFn, OperationRef};
pub use subscribers::Subscribe;

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
