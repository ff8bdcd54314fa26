use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::{Category, Event};

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for committed changes, one channel per category.
#[derive(Default)]
pub struct NotifyHub {
    channels: DashMap<Category, broadcast::Sender<Event>>,
}

impl NotifyHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a category. Creates the channel if needed.
    pub fn subscribe(&self, category: Category) -> broadcast::Receiver<Event> {
        self.channels
            .entry(category)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Fire-and-forget to the event's category. No-op if nobody is listening
    /// or the event belongs to no category.
    pub fn send(&self, event: &Event) {
        let Some(category) = event.category() else {
            return;
        };
        if let Some(sender) = self.channels.get(&category) {
            let _ = sender.send(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_own_category_only() {
        let hub = NotifyHub::new();
        let mut twin = hub.subscribe(Category::Twin);

        let queen = Event::CapacitySet {
            category: Category::Queen,
            units: 5,
        };
        let event = Event::CapacitySet {
            category: Category::Twin,
            units: 3,
        };
        hub.send(&queen);
        hub.send(&event);

        assert_eq!(twin.recv().await.unwrap(), event);
        assert!(twin.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        hub.send(&Event::CapacitySet {
            category: Category::King,
            units: 0,
        });
    }

    #[tokio::test]
    async fn snapshot_marker_reaches_nobody() {
        let hub = NotifyHub::new();
        let mut rxs: Vec<_> = Category::ALL.into_iter().map(|c| hub.subscribe(c)).collect();

        hub.send(&Event::Compacted);

        for rx in &mut rxs {
            assert!(rx.try_recv().is_err());
        }
    }
}
