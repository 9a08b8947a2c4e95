//! Process-wide data-change channel.

use tokio::sync::broadcast;
use tracing::trace;

use crate::domain::ProcessedActionData;

/// Broadcast channel every mutation in the host publishes to.
///
/// Slow subscribers lag and skip events instead of blocking publishers.
#[derive(Debug, Clone)]
pub struct DataChangeBus {
    sender: broadcast::Sender<ProcessedActionData>,
}

impl DataChangeBus {
    /// A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns how many subscribers received the event, 0 when nobody listens.
    pub fn publish(&self, event: ProcessedActionData) -> usize {
        trace!("publish: {:?}", event.action);
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProcessedActionData> {
        self.sender.subscribe()
    }

    pub fn sender(&self) -> broadcast::Sender<ProcessedActionData> {
        self.sender.clone()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for DataChangeBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DataPayload;
    use serde_json::json;

    #[test]
    fn given_no_subscriber_when_publishing_then_zero_receivers() {
        let bus = DataChangeBus::new(4);
        assert_eq!(bus.publish(ProcessedActionData::no_change()), 0);
    }

    #[tokio::test]
    async fn given_two_subscribers_when_publishing_then_both_receive() {
        let bus = DataChangeBus::new(4);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let event = ProcessedActionData::updated(DataPayload::new("watchlist", json!({"id": 3})));
        assert_eq!(bus.publish(event.clone()), 2);

        assert_eq!(first.recv().await.unwrap(), event);
        assert_eq!(second.recv().await.unwrap(), event);
    }
}
