//! # Group construction.
//!
//! [`FlightGroupBuilder`] creates the event bus and, when subscribers are
//! configured, spawns the listener that forwards bus events to them.

use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::{
    config::FlightConfig,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

use super::registry::FlightGroup;

/// Builder for constructing a [`FlightGroup`] with optional subscribers.
pub struct FlightGroupBuilder<K, T> {
    cfg: FlightConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    _types: PhantomData<fn() -> (K, T)>,
}

impl<K, T> FlightGroupBuilder<K, T>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: FlightConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            _types: PhantomData,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive flight events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the group.
    ///
    /// When subscribers are configured this spawns the bus listener, so it must
    /// be called inside a tokio runtime.
    pub fn build(self) -> Arc<FlightGroup<K, T>> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let token = CancellationToken::new();

        let listener = if self.subscribers.is_empty() {
            None
        } else {
            let set = SubscriberSet::new(self.subscribers, bus.clone());
            Some(spawn_listener(set, &bus, token.clone()))
        };

        Arc::new(FlightGroup {
            cfg: self.cfg,
            flights: Mutex::new(HashMap::new()),
            bus,
            token,
            closed: AtomicBool::new(false),
            listener: Mutex::new(listener),
        })
    }
}

/// Forwards bus events to the subscriber set until `token` is cancelled,
/// then drains what is already queued and stops the workers.
fn spawn_listener(
    set: SubscriberSet,
    bus: &Bus,
    token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
                _ = token.cancelled() => break,
            }
        }
        while let Ok(ev) = rx.try_recv() {
            set.emit(ev);
        }
        set.shutdown().await;
    })
}
