use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::{Event, Ms};

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for booking events, channelled per slot. Availability
/// watchers subscribe to the slot they are rendering.
pub struct NotifyHub {
    channels: DashMap<Ms, broadcast::Sender<Event>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to events for a slot. Creates the channel if needed.
    pub fn subscribe(&self, slot_start: Ms) -> broadcast::Receiver<Event> {
        let sender = self
            .channels
            .entry(slot_start)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send a notification. No-op if nobody is listening.
    pub fn send(&self, slot_start: Ms, event: &Event) {
        if let Some(sender) = self.channels.get(&slot_start) {
            let _ = sender.send(event.clone());
        }
    }

    /// Remove a channel (e.g. when a slot's last watcher is gone).
    pub fn remove(&self, slot_start: Ms) {
        self.channels.remove(&slot_start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[tokio::test]
    async fn subscribe_and_receive() {
        let hub = NotifyHub::new();
        let slot = 36_000_000_000;
        let mut rx = hub.subscribe(slot);

        let event = Event::BookingCancelled {
            booking_id: Ulid::new(),
            slot_start: slot,
        };
        hub.send(slot, &event);

        let received = rx.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        // No subscriber — should not panic
        hub.send(
            0,
            &Event::BookingCancelled {
                booking_id: Ulid::new(),
                slot_start: 0,
            },
        );
    }
}
