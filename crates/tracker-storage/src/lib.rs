//! Storage module for the commission tracker.
//!
//! Backends implement a small document-collection byte store. Keys have the
//! form `collection:id`. `StorageService` layers typed JSON access on top,
//! broadcasts a change for every successful write and serializes first-run
//! seeding so an empty collection is filled exactly once.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracker_types::ImplementationRegistry;

pub mod implementations {
	pub mod file;
	pub mod memory;
	pub mod rest;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("Not found")]
	NotFound,
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// The backend's access rules refused the operation.
	#[error("Permission denied: {0}. Check the access rules of the remote database")]
	PermissionDenied(String),
	/// The backend could not be reached.
	#[error("Storage unavailable: {0}")]
	Unavailable(String),
	#[error("Backend error: {0}")]
	Backend(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl StorageError {
	/// True for failures where falling back to built-in data keeps the
	/// service usable.
	pub fn is_connectivity(&self) -> bool {
		matches!(self, StorageError::Unavailable(_))
	}
}

/// Low-level interface for document storage backends.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Reads the document stored under `key`.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Writes the whole document under `key`, replacing any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the document. Deleting a missing key is not an error.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns `(id, bytes)` for every document in `namespace`.
	async fn list(&self, namespace: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError>;
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory, rest};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
		(rest::Registry::NAME, rest::Registry::factory()),
	]
}

pub(crate) fn storage_key(namespace: &str, id: &str) -> String {
	format!("{}:{}", namespace, id)
}

/// Kind of a document change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
	Upserted,
	Removed,
}

/// Notification emitted after a successful write through the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
	pub namespace: String,
	pub id: String,
	pub kind: ChangeKind,
}

/// High-level storage service that provides typed operations.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
	changes: broadcast::Sender<StorageChange>,
	/// Held across the emptiness check and the seed writes.
	seed_lock: Mutex<()>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		let (changes, _) = broadcast::channel(256);
		Self {
			backend,
			changes,
			seed_lock: Mutex::new(()),
		}
	}

	/// Subscribes to changes written through this service.
	pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
		self.changes.subscribe()
	}

	fn notify(&self, namespace: &str, id: &str, kind: ChangeKind) {
		// No receivers is fine.
		let _ = self.changes.send(StorageChange {
			namespace: namespace.to_string(),
			id: id.to_string(),
			kind,
		});
	}

	/// Serializes and stores a value, creating or overwriting it.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend
			.set_bytes(&storage_key(namespace, id), bytes)
			.await?;
		self.notify(namespace, id, ChangeKind::Upserted);
		Ok(())
	}

	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&storage_key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Overwrites an existing value. Fails with `NotFound` if the document
	/// is absent, unlike [`store`](Self::store).
	pub async fn update<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		if !self.backend.exists(&storage_key(namespace, id)).await? {
			return Err(StorageError::NotFound);
		}
		self.store(namespace, id, data).await
	}

	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&storage_key(namespace, id)).await?;
		self.notify(namespace, id, ChangeKind::Removed);
		Ok(())
	}

	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&storage_key(namespace, id)).await
	}

	/// Reads every document in a collection. Documents that no longer match
	/// the expected shape are logged and skipped.
	pub async fn list<T: DeserializeOwned>(&self, namespace: &str) -> Result<Vec<T>, StorageError> {
		let entries = self.backend.list(namespace).await?;
		let mut out = Vec::with_capacity(entries.len());
		for (id, bytes) in entries {
			match serde_json::from_slice(&bytes) {
				Ok(value) => out.push(value),
				Err(e) => {
					tracing::warn!(namespace, id = %id, error = %e, "Skipping malformed document");
				},
			}
		}
		Ok(out)
	}

	/// Writes `items` if the collection is empty. Returns whether seeding
	/// happened.
	pub async fn seed_if_empty<T: Serialize>(
		&self,
		namespace: &str,
		items: &[(String, T)],
	) -> Result<bool, StorageError> {
		let _guard = self.seed_lock.lock().await;
		if !self.backend.list(namespace).await?.is_empty() {
			return Ok(false);
		}
		for (id, item) in items {
			self.store(namespace, id, item).await?;
		}
		tracing::info!(namespace, count = items.len(), "Seeded empty collection");
		Ok(true)
	}

	/// Writes a single document if it does not exist yet. Returns whether
	/// it was written.
	pub async fn seed_document_if_absent<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<bool, StorageError> {
		let _guard = self.seed_lock.lock().await;
		if self.exists(namespace, id).await? {
			return Ok(false);
		}
		self.store(namespace, id, data).await?;
		tracing::info!(namespace, id, "Seeded missing document");
		Ok(true)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryStorage;
	use serde::Deserialize;
	use std::sync::Arc;

	#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
	struct Doc {
		name: String,
	}

	fn doc(name: &str) -> Doc {
		Doc { name: name.into() }
	}

	fn service() -> StorageService {
		StorageService::new(Box::new(MemoryStorage::new()))
	}

	#[tokio::test]
	async fn test_typed_round_trip_and_update() {
		let storage = service();
		assert!(matches!(
			storage.update("commissions", "c-1", &doc("a")).await,
			Err(StorageError::NotFound)
		));

		storage.store("commissions", "c-1", &doc("a")).await.unwrap();
		storage.update("commissions", "c-1", &doc("b")).await.unwrap();
		let got: Doc = storage.retrieve("commissions", "c-1").await.unwrap();
		assert_eq!(got, doc("b"));

		storage.remove("commissions", "c-1").await.unwrap();
		assert!(!storage.exists("commissions", "c-1").await.unwrap());
	}

	#[tokio::test]
	async fn test_writes_are_broadcast() {
		let storage = service();
		let mut rx = storage.subscribe();

		storage.store("commissions", "c-1", &doc("a")).await.unwrap();
		storage.remove("commissions", "c-1").await.unwrap();

		let first = rx.recv().await.unwrap();
		assert_eq!(first.kind, ChangeKind::Upserted);
		assert_eq!(first.id, "c-1");
		assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Removed);
	}

	#[tokio::test]
	async fn test_list_skips_malformed_documents() {
		let backend = MemoryStorage::new();
		backend
			.set_bytes("commissions:bad", b"not json".to_vec())
			.await
			.unwrap();
		let storage = StorageService::new(Box::new(backend));
		storage.store("commissions", "c-1", &doc("a")).await.unwrap();
		storage
			.store("product_options", "singleton", &doc("x"))
			.await
			.unwrap();

		let docs: Vec<Doc> = storage.list("commissions").await.unwrap();
		assert_eq!(docs, vec![doc("a")]);
	}

	#[tokio::test]
	async fn test_concurrent_seeding_happens_once() {
		let storage = Arc::new(service());
		let items = vec![("c-1".to_string(), doc("a")), ("c-2".to_string(), doc("b"))];

		let handles: Vec<_> = (0..4)
			.map(|_| {
				let storage = storage.clone();
				let items = items.clone();
				tokio::spawn(async move { storage.seed_if_empty("commissions", &items).await })
			})
			.collect();

		let mut seeded = 0;
		for handle in handles {
			if handle.await.unwrap().unwrap() {
				seeded += 1;
			}
		}
		assert_eq!(seeded, 1);
		let docs: Vec<Doc> = storage.list("commissions").await.unwrap();
		assert_eq!(docs.len(), 2);
	}

	#[tokio::test]
	async fn test_seed_document_if_absent() {
		let storage = service();
		assert!(storage
			.seed_document_if_absent("product_options", "singleton", &doc("a"))
			.await
			.unwrap());
		assert!(!storage
			.seed_document_if_absent("product_options", "singleton", &doc("b"))
			.await
			.unwrap());
		let got: Doc = storage.retrieve("product_options", "singleton").await.unwrap();
		assert_eq!(got, doc("a"));
	}
}
