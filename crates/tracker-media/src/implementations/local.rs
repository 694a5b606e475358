//! Object store on the local filesystem.
//!
//! Objects are written below `directory` using their name as a relative
//! path. The returned URL is `public_base_url` joined with the name, so the
//! directory must be served by something at that address.

use crate::{MediaError, ObjectStoreFactory, ObjectStoreInterface, ObjectStoreRegistry};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use tracker_types::ImplementationRegistry;

#[derive(Debug, Deserialize)]
struct LocalStoreConfig {
	#[serde(default = "default_directory")]
	directory: String,
	public_base_url: String,
}

fn default_directory() -> String {
	"./data/media".to_string()
}

pub struct LocalObjectStore {
	directory: PathBuf,
	public_base_url: String,
}

impl LocalObjectStore {
	pub fn new(directory: impl Into<PathBuf>, public_base_url: &str) -> Self {
		Self {
			directory: directory.into(),
			public_base_url: public_base_url.trim_end_matches('/').to_string(),
		}
	}

	/// Resolves `name` below the base directory, refusing anything that
	/// would step outside it.
	fn object_path(&self, name: &str) -> Result<PathBuf, MediaError> {
		let relative = Path::new(name);
		if relative
			.components()
			.any(|c| !matches!(c, Component::Normal(_)))
		{
			return Err(MediaError::Store(format!("Invalid object name: {}", name)));
		}
		Ok(self.directory.join(relative))
	}
}

#[async_trait]
impl ObjectStoreInterface for LocalObjectStore {
	async fn put(
		&self,
		name: &str,
		bytes: Vec<u8>,
		_content_type: &str,
	) -> Result<String, MediaError> {
		let path = self.object_path(name)?;
		if let Some(parent) = path.parent() {
			tokio::fs::create_dir_all(parent)
				.await
				.map_err(|e| MediaError::Store(e.to_string()))?;
		}

		let tmp = path.with_extension("tmp");
		tokio::fs::write(&tmp, &bytes)
			.await
			.map_err(|e| MediaError::Store(e.to_string()))?;
		tokio::fs::rename(&tmp, &path)
			.await
			.map_err(|e| MediaError::Store(e.to_string()))?;

		Ok(format!("{}/{}", self.public_base_url, name))
	}
}

/// Factory function to create a local object store.
///
/// Configuration parameters:
/// - `directory`: base directory (default: ./data/media)
/// - `public_base_url`: URL prefix the directory is served under (required)
pub fn create_store(config: &toml::Value) -> Result<Box<dyn ObjectStoreInterface>, MediaError> {
	let config: LocalStoreConfig = config
		.clone()
		.try_into()
		.map_err(|e: toml::de::Error| MediaError::Configuration(e.message().to_string()))?;
	Ok(Box::new(LocalObjectStore::new(
		config.directory,
		&config.public_base_url,
	)))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = ObjectStoreFactory;

	fn factory() -> Self::Factory {
		create_store
	}
}

impl ObjectStoreRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_put_writes_file_and_returns_url() {
		let dir = TempDir::new().unwrap();
		let store = LocalObjectStore::new(dir.path(), "http://localhost:3000/media/");

		let url = store
			.put("uploads/1_cat.jpg", vec![1, 2, 3], "image/jpeg")
			.await
			.unwrap();
		assert_eq!(url, "http://localhost:3000/media/uploads/1_cat.jpg");
		let written = std::fs::read(dir.path().join("uploads/1_cat.jpg")).unwrap();
		assert_eq!(written, vec![1, 2, 3]);
	}

	#[tokio::test]
	async fn test_rejects_escaping_names() {
		let dir = TempDir::new().unwrap();
		let store = LocalObjectStore::new(dir.path(), "http://x");
		assert!(store.put("../evil.jpg", vec![], "image/jpeg").await.is_err());
		assert!(store.put("/abs.jpg", vec![], "image/jpeg").await.is_err());
	}

	#[test]
	fn test_factory_requires_public_url() {
		let missing = toml::Value::Table(toml::Table::new());
		assert!(matches!(
			create_store(&missing),
			Err(MediaError::Configuration(_))
		));
	}
}
