use crate::models::{LeadChange, LeadEvent};
use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;

pub const EVENT_CAPACITY: usize = 256;

/// Publish/subscribe hub for lead writes. Every successful insert, update or
/// delete is published here; list views subscribe and reload.
#[derive(Debug, Clone)]
pub struct LeadEvents {
    sender: broadcast::Sender<LeadEvent>,
}

impl Default for LeadEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl LeadEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LeadEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, source: &str, change: LeadChange) -> LeadEvent {
        let event = LeadEvent {
            event_id: Uuid::new_v4().to_string(),
            source: source.to_string(),
            change,
            timestamp: Utc::now(),
        };

        // No subscribers is fine: nothing is displaying leads yet.
        if self.sender.send(event.clone()).is_err() {
            tracing::debug!(lead_id = change.lead_id(), "lead change published without subscribers");
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::LeadEvents;
    use crate::models::LeadChange;

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let events = LeadEvents::new();
        let mut receiver = events.subscribe();

        events.publish("form", LeadChange::Created(1));
        events.publish("list-a", LeadChange::Deleted(1));

        let first = receiver.recv().await.expect("first event");
        let second = receiver.recv().await.expect("second event");
        assert_eq!(first.change, LeadChange::Created(1));
        assert_eq!(first.source, "form");
        assert_eq!(second.change, LeadChange::Deleted(1));
        assert_ne!(first.event_id, second.event_id);
    }

    #[test]
    fn publishing_without_subscribers_does_not_fail() {
        let events = LeadEvents::new();
        let event = events.publish("form", LeadChange::Updated(7));
        assert_eq!(event.change.lead_id(), 7);
    }

    #[tokio::test]
    async fn late_subscribers_miss_earlier_events() {
        let events = LeadEvents::new();
        events.publish("form", LeadChange::Created(1));

        let mut receiver = events.subscribe();
        events.publish("form", LeadChange::Created(2));

        let event = receiver.recv().await.expect("event");
        assert_eq!(event.change, LeadChange::Created(2));
    }
}
