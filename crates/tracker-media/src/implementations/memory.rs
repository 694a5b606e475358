//! In-memory object store for tests and local runs.

use crate::{MediaError, ObjectStoreFactory, ObjectStoreInterface, ObjectStoreRegistry};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracker_types::ImplementationRegistry;

#[derive(Default)]
pub struct MemoryObjectStore {
	objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn get(&self, name: &str) -> Option<Vec<u8>> {
		self.objects.read().await.get(name).cloned()
	}

	pub async fn names(&self) -> Vec<String> {
		self.objects.read().await.keys().cloned().collect()
	}
}

#[async_trait]
impl ObjectStoreInterface for MemoryObjectStore {
	async fn put(
		&self,
		name: &str,
		bytes: Vec<u8>,
		_content_type: &str,
	) -> Result<String, MediaError> {
		self.objects.write().await.insert(name.to_string(), bytes);
		Ok(format!("memory://{}", name))
	}
}

pub fn create_store(_config: &toml::Value) -> Result<Box<dyn ObjectStoreInterface>, MediaError> {
	Ok(Box::new(MemoryObjectStore::new()))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = ObjectStoreFactory;

	fn factory() -> Self::Factory {
		create_store
	}
}

impl ObjectStoreRegistry for Registry {}
