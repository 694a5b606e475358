//! Event types published on the engine's event bus.
//!
//! Stores publish an event after every successful mutation so other parts of
//! the service (logging, live listeners) can react without polling.

use crate::{OrderStatus, StorageKey};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all tracker events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrackerEvent {
	Order(OrderEvent),
	Catalog(CatalogEvent),
	Session(SessionEvent),
	/// The backend failed and the stores fell back to built-in data.
	StorageDegraded { collection: String, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
	/// A create was submitted. The id is assigned by the store.
	Submitted { order_id: String, status: OrderStatus },
	StatusChanged {
		order_id: String,
		from: OrderStatus,
		to: OrderStatus,
	},
	FieldsUpdated { order_id: String },
	Deleted { order_id: String },
	/// The empty collection was filled with the sample orders.
	Seeded { count: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CatalogEvent {
	Saved { categories: usize },
	Seeded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
	LoggedIn,
	LoggedOut,
	Rejected,
}

impl TrackerEvent {
	pub fn degraded(collection: StorageKey, reason: impl Into<String>) -> Self {
		TrackerEvent::StorageDegraded {
			collection: collection.as_str().to_string(),
			reason: reason.into(),
		}
	}
}
