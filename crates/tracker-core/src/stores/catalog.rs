//! Live catalog document.
//!
//! The catalog lives in a single `product_options/singleton` document that
//! is always replaced as a whole. Readers get the stored document merged with
//! the built-in defaults, so a category added to the defaults is offered even
//! before an admin saves the catalog again.

use crate::engine::event_bus::EventBus;
use crate::samples::default_catalog;
use crate::stores::sync::{spawn_sync, Reload};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracker_storage::{StorageError, StorageService};
use tracker_types::{Catalog, CatalogEvent, StorageKey, TrackerEvent, CATALOG_DOCUMENT_ID};

const COLLECTION: StorageKey = StorageKey::ProductOptions;

#[derive(Debug, Error)]
pub enum CatalogStoreError {
	#[error("Permission denied: {0}")]
	PermissionDenied(String),
	#[error("Storage unavailable: {0}")]
	Unavailable(String),
	#[error("Storage error: {0}")]
	Storage(String),
}

impl From<StorageError> for CatalogStoreError {
	fn from(err: StorageError) -> Self {
		match err {
			StorageError::PermissionDenied(msg) => CatalogStoreError::PermissionDenied(msg),
			StorageError::Unavailable(msg) => CatalogStoreError::Unavailable(msg),
			other => CatalogStoreError::Storage(other.to_string()),
		}
	}
}

fn merged(mut catalog: Catalog) -> Catalog {
	catalog.merge_defaults(default_catalog());
	catalog
}

pub struct CatalogStore {
	storage: Arc<StorageService>,
	events: EventBus,
	snapshot: watch::Sender<Arc<Catalog>>,
	poll_interval: Option<Duration>,
	sync_task: Mutex<Option<JoinHandle<()>>>,
}

impl CatalogStore {
	pub fn new(
		storage: Arc<StorageService>,
		events: EventBus,
		poll_interval: Option<Duration>,
	) -> Self {
		let (snapshot, _) = watch::channel(Arc::new(default_catalog().clone()));
		Self {
			storage,
			events,
			snapshot,
			poll_interval,
			sync_task: Mutex::new(None),
		}
	}

	/// Seeds the document when absent, loads it and starts following
	/// changes. On failure the defaults stay in place and the error is
	/// returned for reporting only.
	pub async fn load(self: &Arc<Self>) -> Result<(), CatalogStoreError> {
		let result = self.seed_and_refresh().await;
		let mut task = self.sync_task.lock().await;
		if !task.as_ref().is_some_and(|handle| !handle.is_finished()) {
			*task = Some(spawn_sync(
				Arc::downgrade(self),
				self.storage.subscribe(),
				self.poll_interval,
			));
		}
		result
	}

	async fn seed_and_refresh(&self) -> Result<(), CatalogStoreError> {
		let seeded = self
			.storage
			.seed_document_if_absent(COLLECTION.as_str(), CATALOG_DOCUMENT_ID, default_catalog())
			.await
			.map_err(|e| self.degrade(e))?;
		if seeded {
			self.events
				.publish(TrackerEvent::Catalog(CatalogEvent::Seeded))
				.ok();
		}
		self.refresh().await
	}

	/// Re-reads the stored document into the snapshot.
	pub async fn refresh(&self) -> Result<(), CatalogStoreError> {
		let catalog = self.load_raw().await.map_err(|e| self.degrade(e))?;
		self.snapshot.send_replace(Arc::new(merged(catalog)));
		Ok(())
	}

	/// The stored document exactly as written, without default merging.
	pub async fn load_raw(&self) -> Result<Catalog, StorageError> {
		self.storage
			.retrieve(COLLECTION.as_str(), CATALOG_DOCUMENT_ID)
			.await
	}

	/// The stored document merged with the defaults, read fresh from storage.
	/// Edits start from this so categories offered only through the defaults
	/// keep their variants once saved.
	pub async fn load_merged(&self) -> Result<Catalog, StorageError> {
		Ok(merged(self.load_raw().await?))
	}

	/// Replaces the whole stored document. The outcome is reported to the
	/// caller; on failure the snapshot is left as it was.
	#[tracing::instrument(skip_all, fields(categories = catalog.categories().len()))]
	pub async fn save(&self, catalog: Catalog) -> Result<(), CatalogStoreError> {
		if let Err(e) = self
			.storage
			.store(COLLECTION.as_str(), CATALOG_DOCUMENT_ID, &catalog)
			.await
		{
			tracing::error!(error = %e, "Failed to save catalog");
			return Err(e.into());
		}

		let categories = catalog.categories().len();
		tracing::info!("Catalog saved");
		self.events
			.publish(TrackerEvent::Catalog(CatalogEvent::Saved { categories }))
			.ok();
		self.snapshot.send_replace(Arc::new(merged(catalog)));
		Ok(())
	}

	/// Stored catalog merged with the defaults.
	pub fn current(&self) -> Arc<Catalog> {
		self.snapshot.borrow().clone()
	}

	pub fn subscribe(&self) -> WatchStream<Arc<Catalog>> {
		WatchStream::new(self.snapshot.subscribe())
	}

	pub async fn shutdown(&self) {
		if let Some(handle) = self.sync_task.lock().await.take() {
			handle.abort();
		}
	}

	fn degrade(&self, err: StorageError) -> CatalogStoreError {
		match &err {
			StorageError::PermissionDenied(_) => {
				tracing::error!(collection = COLLECTION.as_str(), error = %err, "Catalog read rejected by backend")
			},
			_ => {
				tracing::warn!(collection = COLLECTION.as_str(), error = %err, "Catalog unavailable, keeping current options")
			},
		}
		self.events
			.publish(TrackerEvent::degraded(COLLECTION, err.to_string()))
			.ok();
		err.into()
	}
}

#[async_trait]
impl Reload for CatalogStore {
	const COLLECTION: StorageKey = COLLECTION;

	async fn reload(&self) {
		let _ = self.refresh().await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tracker_storage::implementations::memory::MemoryStorage;
	use tracker_types::{ProductVariant, CATEGORY_ORDER};

	fn store() -> (Arc<CatalogStore>, Arc<StorageService>) {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let store = Arc::new(CatalogStore::new(storage.clone(), EventBus::new(16), None));
		(store, storage)
	}

	#[tokio::test]
	async fn test_load_seeds_missing_document() {
		let (store, storage) = store();
		store.load().await.unwrap();

		let stored: Catalog = storage
			.retrieve("product_options", "singleton")
			.await
			.unwrap();
		assert_eq!(&stored, default_catalog());
		assert_eq!(store.current().categories(), CATEGORY_ORDER.to_vec());
		store.shutdown().await;
	}

	#[tokio::test]
	async fn test_save_then_load_round_trips_exactly() {
		let (store, _) = store();
		store.load().await.unwrap();

		let mut edited = Catalog::new();
		edited.set_category(
			"正方形",
			vec![ProductVariant::new("5x5cm正方形", 80).with_img("https://img/1.jpg")],
		);
		store.save(edited.clone()).await.unwrap();

		assert_eq!(store.load_raw().await.unwrap(), edited);
		store.shutdown().await;
	}

	#[tokio::test]
	async fn test_readers_still_see_default_categories() {
		let (store, storage) = store();
		let mut partial = Catalog::new();
		partial.set_category("正方形", vec![ProductVariant::new("only", 1)]);
		storage
			.store("product_options", "singleton", &partial)
			.await
			.unwrap();

		store.load().await.unwrap();
		let current = store.current();
		assert_eq!(current.category("正方形").unwrap().len(), 1);
		assert_eq!(current.categories().len(), CATEGORY_ORDER.len());
		// The stored document is not rewritten by the merge.
		assert_eq!(store.load_raw().await.unwrap(), partial);
		store.shutdown().await;
	}

	#[tokio::test]
	async fn test_external_write_is_followed() {
		let (store, storage) = store();
		store.load().await.unwrap();
		let mut stream = store.subscribe();
		tokio_stream::StreamExt::next(&mut stream).await.unwrap();

		let mut edited = default_catalog().clone();
		edited.set_category("圓形", Vec::new());
		storage
			.store("product_options", "singleton", &edited)
			.await
			.unwrap();

		let next = tokio_stream::StreamExt::next(&mut stream).await.unwrap();
		assert!(next.category("圓形").unwrap().is_empty());
		store.shutdown().await;
	}
}
