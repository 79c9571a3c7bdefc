//! # Flight event bus.
//!
//! Flights and their group publish lifecycle [`Event`]s into one broadcast
//! channel; the group's listener is the only receiver and hands them to the
//! subscriber workers.
//!
//! ```text
//! Flight(s), FlightGroup ── publish ──► Bus ──► group listener ──► SubscriberSet
//! ```
//!
//! Publishing is fire-and-forget. With no receiver (a bare [`Flight`](crate::Flight)
//! or a group without subscribers) the event is discarded; a receiver that
//! falls more than `capacity` events behind loses the oldest ones.

use tokio::sync::broadcast;

use super::event::Event;

/// Sending half of the event channel, shared by every flight in a group.
#[derive(Clone, Debug)]
pub(crate) struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// `capacity` of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Never blocks; dropped when nobody listens.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_receiver_sees_events_published_after_subscribe() {
        let bus = Bus::new(4);
        bus.publish(Event::new(EventKind::FlightStarting).with_flight("lost"));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::FlightStarting).with_flight("seen"));

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.flight.as_deref(), Some("seen"));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::GroupShutdown));
    }
}
