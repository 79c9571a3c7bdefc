//! # Example: keyed_group
//!
//! A flight group with `Retention::Ttl`: lookups for the same user share one
//! load and reuse its result for two seconds; a failed load is forgotten so
//! the next call retries with a fresh flight.
//!
//! ## Run
//! ```bash
//! cargo run --example keyed_group
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use flightcast::{FlightConfig, FlightGroup, OperationError, OperationFn, OperationRef, Retention};
use tokio_util::sync::CancellationToken;

/// Loads a user; user 7 fails once while `flaky` is still set.
fn load_user(id: u32, loads: Arc<AtomicUsize>, flaky: Arc<AtomicBool>) -> OperationRef<String> {
    OperationFn::arc(format!("user-{id}"), move |_ctx: CancellationToken| {
        loads.fetch_add(1, Ordering::SeqCst);
        let fail = id == 7 && flaky.swap(false, Ordering::SeqCst);
        async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if fail {
                return Err(OperationError::fail("backend unavailable"));
            }
            Ok(format!("user #{id}"))
        }
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = FlightConfig {
        retention: Retention::Ttl(Duration::from_secs(2)),
        timeout: Duration::from_secs(1),
        ..FlightConfig::default()
    };
    let group = FlightGroup::<u32, String>::new(cfg);
    let loads = Arc::new(AtomicUsize::new(0));
    let flaky = Arc::new(AtomicBool::new(true));
    let user = |id: u32| load_user(id, loads.clone(), flaky.clone());

    let a = group.work(1, user(1));
    let b = group.work(1, user(1));
    println!("{:?} / {:?}", a.await?, b.await?);

    match group.work(7, user(7)).await {
        Err(e) if e.is_retryable() => {
            println!("first load of user 7 failed ({}), retrying", e.as_label());
            group.forget(&7);
            println!("{:?}", group.work(7, user(7)).await?);
        }
        other => println!("{other:?}"),
    }

    tokio::time::sleep(Duration::from_secs(3)).await;
    println!("expired entries purged: {}", group.purge_expired());
    println!("total loads: {}", loads.load(Ordering::SeqCst));

    group.shutdown("bye").await;
    Ok(())
}
