//! # Example: shared_fetch
//!
//! Five callers want the same slow "remote" value. They share one flight, the
//! fetch runs once, and a late caller is served from the stored outcome.
//!
//! Demonstrates how to:
//! - Wrap work in [`OperationFn`] and run it through a [`FlightGroup`].
//! - Observe flight events with the built-in [`LogWriter`].
//! - Join an in-flight and a settled flight for the same key.
//!
//! ## Flow
//! ```text
//! work("config") x5 ──► 1 x FlightStarting + 4 x FlightJoined
//!                  └─► fetch (300ms) ──► FlightSucceeded (waiters=5)
//! work("config") late ──► FlightJoined, settled immediately
//! shutdown ──► GroupShutdown
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example shared_fetch --features logging
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use flightcast::{FlightConfig, FlightGroup, LogWriter, OperationError, OperationFn, OperationRef, Subscribe};
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let group = FlightGroup::<&'static str, String>::builder(FlightConfig::default())
        .with_subscribers(subs)
        .build();

    let fetches = Arc::new(AtomicUsize::new(0));
    let counter = fetches.clone();
    let fetch: OperationRef<String> = OperationFn::arc("config", move |ctx: CancellationToken| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            tokio::select! {
                _ = ctx.cancelled() => Err(OperationError::Canceled),
                _ = tokio::time::sleep(Duration::from_millis(300)) => {
                    Ok::<_, OperationError>("feature_x=on".to_string())
                }
            }
        }
    });

    let waiters: Vec<_> = (0..5).map(|_| group.work("config", fetch.clone())).collect();
    for (i, w) in waiters.into_iter().enumerate() {
        println!("[caller {i}] got {:?}", w.await?);
    }

    let mut late = group.work("config", fetch);
    println!("[late caller] ready without waiting: {:?}", late.try_outcome());

    println!("fetch ran {} time(s)", fetches.load(Ordering::SeqCst));
    group.shutdown("demo finished").await;
    Ok(())
}
