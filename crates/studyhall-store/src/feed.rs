//! Managed change feed.
//!
//! Every committed write publishes one [`ChangeEvent`] per affected row.
//! Delivery is best-effort: a subscriber that falls more than the buffer
//! capacity behind observes a lag error instead of the skipped events.

use studyhall_shared::ChangeEvent;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: ChangeEvent) {
        match self.tx.send(event) {
            Ok(receivers) => {
                tracing::trace!(receivers, "change event published");
            }
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(table = %event.table, "change event dropped, no subscribers");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyhall_shared::{ChangeKind, Table};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let feed = ChangeFeed::new(8);
        let mut a = feed.subscribe();
        let mut b = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 2);

        let event = ChangeEvent::new(Table::Friends, ChangeKind::Insert, Uuid::new_v4());
        feed.publish(event.clone());

        assert_eq!(a.recv().await.unwrap(), event);
        assert_eq!(b.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let feed = ChangeFeed::new(0);
        feed.publish(ChangeEvent::new(
            Table::Donations,
            ChangeKind::Insert,
            Uuid::new_v4(),
        ));
        assert_eq!(feed.subscriber_count(), 0);
    }
}
