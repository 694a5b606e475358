//! Live order collection.
//!
//! `OrderStore` keeps the newest-first snapshot of the `commissions`
//! collection in a watch channel. Mutations write to storage first and then
//! patch the snapshot; a background sync task re-reads the collection when
//! storage reports a change and, if configured, on a fixed interval so writes
//! from other clients of a shared backend show up too.
//!
//! Backend failures never escape as panics. They are logged, published as
//! `StorageDegraded` and the snapshot keeps the last-known orders (or the
//! built-in samples when nothing was ever loaded).

use crate::engine::event_bus::EventBus;
use crate::samples::sample_orders;
use crate::state::{apply_transition, Transition};
use crate::stores::sync::{spawn_sync, Reload};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::instrument;
use tracker_storage::{StorageError, StorageService};
use tracker_types::{
	current_timestamp_millis, today, truncate_id, NewOrder, Order, OrderEvent, OrderPatch,
	OrderStatus, StorageKey, TrackerEvent,
};

const COLLECTION: StorageKey = StorageKey::Commissions;

#[derive(Debug, Error)]
pub enum OrderStoreError {
	#[error("Order not found: {0}")]
	NotFound(String),
	#[error("Permission denied: {0}")]
	PermissionDenied(String),
	#[error("Storage unavailable: {0}")]
	Unavailable(String),
	#[error("Storage error: {0}")]
	Storage(String),
}

impl OrderStoreError {
	fn from_storage(id: &str, err: StorageError) -> Self {
		match err {
			StorageError::NotFound => OrderStoreError::NotFound(id.to_string()),
			StorageError::PermissionDenied(msg) => OrderStoreError::PermissionDenied(msg),
			StorageError::Unavailable(msg) => OrderStoreError::Unavailable(msg),
			other => OrderStoreError::Storage(other.to_string()),
		}
	}
}

/// Result of connecting the store to its backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
	/// Reading from the backend. `seeded` is set when the samples were
	/// written because the collection was empty.
	Live { seeded: bool, orders: usize },
	/// The backend failed; the snapshot holds fallback data.
	Fallback { reason: String },
}

pub struct OrderStore {
	storage: Arc<StorageService>,
	events: EventBus,
	snapshot: watch::Sender<Arc<Vec<Order>>>,
	poll_interval: Option<Duration>,
	sync_task: Mutex<Option<JoinHandle<()>>>,
}

/// Newest first; ties broken by id so the order is stable.
fn sort_newest_first(orders: &mut [Order]) {
	orders.sort_by(|a, b| {
		b.date_added
			.cmp(&a.date_added)
			.then_with(|| b.id.cmp(&a.id))
	});
}

fn new_order_id() -> String {
	let suffix = uuid::Uuid::new_v4().simple().to_string();
	format!("c-{}-{}", current_timestamp_millis(), &suffix[..6])
}

impl OrderStore {
	pub fn new(
		storage: Arc<StorageService>,
		events: EventBus,
		poll_interval: Option<Duration>,
	) -> Self {
		let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
		Self {
			storage,
			events,
			snapshot,
			poll_interval,
			sync_task: Mutex::new(None),
		}
	}

	/// Seeds an empty collection, loads the first snapshot and starts the
	/// sync task. Never fails; a broken backend yields `Fallback`.
	pub async fn connect(self: &Arc<Self>) -> SyncStatus {
		let seed: Vec<(String, Order)> = sample_orders()
			.into_iter()
			.map(|order| (order.id.clone(), order))
			.collect();

		let status = match self.storage.seed_if_empty(COLLECTION.as_str(), &seed).await {
			Ok(seeded) => {
				if seeded {
					self.events
						.publish(TrackerEvent::Order(OrderEvent::Seeded { count: seed.len() }))
						.ok();
				}
				match self.refresh().await {
					Ok(orders) => SyncStatus::Live { seeded, orders },
					Err(e) => SyncStatus::Fallback {
						reason: e.to_string(),
					},
				}
			},
			Err(e) => {
				self.degrade(&e);
				SyncStatus::Fallback {
					reason: e.to_string(),
				}
			},
		};

		self.start_sync().await;
		status
	}

	/// Re-reads the whole collection into the snapshot. Returns the number of
	/// orders loaded.
	pub async fn refresh(&self) -> Result<usize, OrderStoreError> {
		match self.storage.list::<Order>(COLLECTION.as_str()).await {
			Ok(mut orders) => {
				sort_newest_first(&mut orders);
				let count = orders.len();
				self.snapshot.send_replace(Arc::new(orders));
				Ok(count)
			},
			Err(e) => {
				self.degrade(&e);
				Err(OrderStoreError::from_storage(COLLECTION.as_str(), e))
			},
		}
	}

	fn degrade(&self, err: &StorageError) {
		match err {
			StorageError::PermissionDenied(_) => {
				tracing::error!(collection = COLLECTION.as_str(), error = %err, "Order sync rejected by backend")
			},
			_ => {
				tracing::warn!(collection = COLLECTION.as_str(), error = %err, "Order sync failed, using fallback data")
			},
		}
		self.snapshot.send_if_modified(|orders| {
			if orders.is_empty() {
				let mut samples = sample_orders();
				sort_newest_first(&mut samples);
				*orders = Arc::new(samples);
				true
			} else {
				false
			}
		});
		self.events
			.publish(TrackerEvent::degraded(COLLECTION, err.to_string()))
			.ok();
	}

	async fn start_sync(self: &Arc<Self>) {
		let mut task = self.sync_task.lock().await;
		if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
			return;
		}
		*task = Some(spawn_sync(
			Arc::downgrade(self),
			self.storage.subscribe(),
			self.poll_interval,
		));
	}

	/// Stops the sync task. The snapshot stays readable.
	pub async fn shutdown(&self) {
		if let Some(handle) = self.sync_task.lock().await.take() {
			handle.abort();
		}
	}

	/// Current snapshot, newest first.
	pub fn list(&self) -> Arc<Vec<Order>> {
		self.snapshot.borrow().clone()
	}

	pub fn get(&self, id: &str) -> Option<Order> {
		self.snapshot.borrow().iter().find(|o| o.id == id).cloned()
	}

	/// Live sequence of snapshots, starting with the current one.
	pub fn subscribe(&self) -> WatchStream<Arc<Vec<Order>>> {
		WatchStream::new(self.snapshot.subscribe())
	}

	pub fn watch(&self) -> watch::Receiver<Arc<Vec<Order>>> {
		self.snapshot.subscribe()
	}

	/// Stores a new order. The identifier is assigned here and the order
	/// surfaces through the snapshot rather than being returned.
	#[instrument(skip_all, fields(client = %new.client_name))]
	pub async fn create(&self, new: NewOrder) -> Result<(), OrderStoreError> {
		let id = new_order_id();
		let order = Order::from_new(id.clone(), new, today());
		self.storage
			.store(COLLECTION.as_str(), &id, &order)
			.await
			.map_err(|e| self.fail(&id, e))?;

		tracing::info!(order_id = %truncate_id(&id), status = %order.status, "Order submitted");
		self.events
			.publish(TrackerEvent::Order(OrderEvent::Submitted {
				order_id: id,
				status: order.status,
			}))
			.ok();
		self.upsert_local(order);
		Ok(())
	}

	/// Loads an order, applies `updater`, stamps `last_updated` and writes it
	/// back. Fields the updater leaves alone are preserved.
	pub async fn update_order_with<F>(&self, id: &str, updater: F) -> Result<Order, OrderStoreError>
	where
		F: FnOnce(&mut Order),
	{
		let mut order: Order = self
			.storage
			.retrieve(COLLECTION.as_str(), id)
			.await
			.map_err(|e| self.fail(id, e))?;

		updater(&mut order);
		order.last_updated = today();

		self.storage
			.update(COLLECTION.as_str(), id, &order)
			.await
			.map_err(|e| self.fail(id, e))?;
		self.upsert_local(order.clone());
		Ok(order)
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(id), status = %status))]
	pub async fn update_status(
		&self,
		id: &str,
		status: OrderStatus,
	) -> Result<Order, OrderStoreError> {
		let mut previous = status;
		let order = self
			.update_order_with(id, |o| {
				previous = o.status;
				o.status = status;
			})
			.await?;
		self.publish_status_change(id, previous, status);
		Ok(order)
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(id)))]
	pub async fn update_fields(
		&self,
		id: &str,
		patch: &OrderPatch,
	) -> Result<Order, OrderStoreError> {
		let mut previous = None;
		let order = self
			.update_order_with(id, |o| {
				previous = Some(o.status);
				patch.apply(o);
			})
			.await?;

		self.events
			.publish(TrackerEvent::Order(OrderEvent::FieldsUpdated {
				order_id: id.to_string(),
			}))
			.ok();
		if let Some(from) = previous {
			self.publish_status_change(id, from, order.status);
		}
		Ok(order)
	}

	/// Moves the order one step forward. At the last status this is a no-op
	/// that returns the order unchanged.
	pub async fn advance(&self, id: &str) -> Result<Order, OrderStoreError> {
		self.step(id, Transition::Advance).await
	}

	/// Moves the order one step back. At the first status this is a no-op.
	pub async fn retreat(&self, id: &str) -> Result<Order, OrderStoreError> {
		self.step(id, Transition::Retreat).await
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(id), transition = ?transition))]
	async fn step(&self, id: &str, transition: Transition) -> Result<Order, OrderStoreError> {
		let mut order: Order = self
			.storage
			.retrieve(COLLECTION.as_str(), id)
			.await
			.map_err(|e| self.fail(id, e))?;

		let Some(from) = apply_transition(&mut order, transition, today()) else {
			tracing::debug!(status = %order.status, "Transition not available");
			return Ok(order);
		};

		self.storage
			.update(COLLECTION.as_str(), id, &order)
			.await
			.map_err(|e| self.fail(id, e))?;
		self.publish_status_change(id, from, order.status);
		self.upsert_local(order.clone());
		Ok(order)
	}

	/// Permanently removes the order.
	#[instrument(skip_all, fields(order_id = %truncate_id(id)))]
	pub async fn delete(&self, id: &str) -> Result<(), OrderStoreError> {
		let exists = self
			.storage
			.exists(COLLECTION.as_str(), id)
			.await
			.map_err(|e| self.fail(id, e))?;
		if !exists {
			return Err(OrderStoreError::NotFound(id.to_string()));
		}
		self.storage
			.remove(COLLECTION.as_str(), id)
			.await
			.map_err(|e| self.fail(id, e))?;

		tracing::info!("Order deleted");
		self.events
			.publish(TrackerEvent::Order(OrderEvent::Deleted {
				order_id: id.to_string(),
			}))
			.ok();
		self.snapshot.send_if_modified(|orders| {
			if !orders.iter().any(|o| o.id == id) {
				return false;
			}
			*orders = Arc::new(orders.iter().filter(|o| o.id != id).cloned().collect());
			true
		});
		Ok(())
	}

	fn publish_status_change(&self, id: &str, from: OrderStatus, to: OrderStatus) {
		if from == to {
			return;
		}
		tracing::info!(order_id = %truncate_id(id), from = %from, to = %to, "Status changed");
		self.events
			.publish(TrackerEvent::Order(OrderEvent::StatusChanged {
				order_id: id.to_string(),
				from,
				to,
			}))
			.ok();
	}

	fn upsert_local(&self, order: Order) {
		self.snapshot.send_modify(|orders| {
			let mut next: Vec<Order> = orders.iter().filter(|o| o.id != order.id).cloned().collect();
			next.push(order);
			sort_newest_first(&mut next);
			*orders = Arc::new(next);
		});
	}

	/// Logs a failed write and maps it for the caller.
	fn fail(&self, id: &str, err: StorageError) -> OrderStoreError {
		match &err {
			StorageError::NotFound => {},
			StorageError::PermissionDenied(_) => {
				tracing::error!(order_id = %truncate_id(id), error = %err, "Order write rejected by backend")
			},
			_ => tracing::warn!(order_id = %truncate_id(id), error = %err, "Order operation failed"),
		}
		OrderStoreError::from_storage(id, err)
	}
}

#[async_trait]
impl Reload for OrderStore {
	const COLLECTION: StorageKey = COLLECTION;

	async fn reload(&self) {
		// Failures are already logged and published by refresh.
		let _ = self.refresh().await;
	}
}
