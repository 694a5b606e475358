//! Broadcast channel carrying `TrackerEvent`s between components.

use tokio::sync::broadcast;
use tracker_types::TrackerEvent;

/// Cloneable handle to the tracker's event channel.
///
/// Publishing never blocks. Slow subscribers lose the oldest events and see
/// `RecvError::Lagged` on their next receive.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<TrackerEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event. Fails only when nobody is subscribed.
	pub fn publish(
		&self,
		event: TrackerEvent,
	) -> Result<usize, broadcast::error::SendError<TrackerEvent>> {
		self.sender.send(event)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tracker_types::{OrderEvent, TrackerEvent};

	#[tokio::test]
	async fn test_subscribers_receive_published_events() {
		let bus = EventBus::new(8);
		assert!(bus
			.publish(TrackerEvent::Order(OrderEvent::Seeded { count: 1 }))
			.is_err());

		let mut rx = bus.subscribe();
		bus.publish(TrackerEvent::Order(OrderEvent::Deleted {
			order_id: "c-1".into(),
		}))
		.unwrap();
		match rx.recv().await.unwrap() {
			TrackerEvent::Order(OrderEvent::Deleted { order_id }) => assert_eq!(order_id, "c-1"),
			other => panic!("unexpected event: {:?}", other),
		}
	}
}
