//! Local file storage backend.
//!
//! Each document is a JSON file at `<storage_path>/<collection>/<id>.json`.
//! This is the local persisted variant of the tracker: it replaces the remote
//! database entirely and is never combined with it.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracker_types::ImplementationRegistry;

const EXTENSION: &str = "json";

#[derive(Debug, Deserialize)]
struct FileStorageConfig {
	#[serde(default = "default_storage_path")]
	storage_path: String,
}

fn default_storage_path() -> String {
	"./data/storage".to_string()
}

pub struct FileStorage {
	base_path: PathBuf,
}

impl FileStorage {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Maps `collection:id` to its file, keeping both parts inside the base
	/// directory.
	fn file_path(&self, key: &str) -> Result<PathBuf, StorageError> {
		let (namespace, id) = key
			.split_once(':')
			.ok_or_else(|| StorageError::Backend(format!("Malformed key: {}", key)))?;
		Ok(self
			.namespace_dir(namespace)
			.join(format!("{}.{}", sanitize(id), EXTENSION)))
	}

	fn namespace_dir(&self, namespace: &str) -> PathBuf {
		self.base_path.join(sanitize(namespace))
	}
}

fn sanitize(part: &str) -> String {
	let cleaned: String = part
		.chars()
		.map(|c| match c {
			'/' | '\\' | ':' | '\0' => '_',
			c => c,
		})
		.collect();
	if cleaned.starts_with('.') {
		cleaned.replacen('.', "_", 1)
	} else {
		cleaned
	}
}

fn io_error(path: &Path, e: std::io::Error) -> StorageError {
	match e.kind() {
		std::io::ErrorKind::PermissionDenied => {
			StorageError::PermissionDenied(format!("{}: {}", path.display(), e))
		},
		_ => StorageError::Backend(format!("{}: {}", path.display(), e)),
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.file_path(key)?;
		match fs::read(&path).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(io_error(&path, e)),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.file_path(key)?;
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| io_error(parent, e))?;
		}

		// Write to a sibling temp file and rename so readers never see a
		// partially written document.
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, value)
			.await
			.map_err(|e| io_error(&temp_path, e))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| io_error(&path, e))
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.file_path(key)?;
		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(io_error(&path, e)),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let path = self.file_path(key)?;
		fs::try_exists(&path).await.map_err(|e| io_error(&path, e))
	}

	async fn list(&self, namespace: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
		let dir = self.namespace_dir(namespace);
		let mut entries = match fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(io_error(&dir, e)),
		};

		let mut out = Vec::new();
		while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
			let path = entry.path();
			if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
				continue;
			}
			let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
				continue;
			};
			let id = id.to_string();
			match fs::read(&path).await {
				Ok(data) => out.push((id, data)),
				// Removed between listing and reading.
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
				Err(e) => return Err(io_error(&path, e)),
			}
		}
		out.sort_by(|a, b| a.0.cmp(&b.0));
		Ok(out)
	}
}

/// Factory function to create a file storage backend.
///
/// Configuration parameters:
/// - `storage_path`: base directory (default: "./data/storage")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	let config: FileStorageConfig = config
		.clone()
		.try_into()
		.map_err(|e: toml::de::Error| StorageError::Configuration(e.message().to_string()))?;
	if config.storage_path.trim().is_empty() {
		return Err(StorageError::Configuration(
			"storage_path cannot be empty".into(),
		));
	}
	Ok(Box::new(FileStorage::new(PathBuf::from(config.storage_path))))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_documents_persist_as_json_files() {
		let temp_dir = TempDir::new().unwrap();
		let storage = FileStorage::new(temp_dir.path().to_path_buf());

		storage
			.set_bytes("commissions:c-101", br#"{"id":"c-101"}"#.to_vec())
			.await
			.unwrap();
		let on_disk = temp_dir.path().join("commissions").join("c-101.json");
		assert!(on_disk.exists());
		assert!(!on_disk.with_extension("tmp").exists());

		// A fresh instance over the same directory sees the document.
		let reopened = FileStorage::new(temp_dir.path().to_path_buf());
		assert_eq!(
			reopened.get_bytes("commissions:c-101").await.unwrap(),
			br#"{"id":"c-101"}"#.to_vec()
		);
	}

	#[tokio::test]
	async fn test_list_and_delete() {
		let temp_dir = TempDir::new().unwrap();
		let storage = FileStorage::new(temp_dir.path().to_path_buf());
		assert!(storage.list("commissions").await.unwrap().is_empty());

		storage.set_bytes("commissions:c-2", b"2".to_vec()).await.unwrap();
		storage.set_bytes("commissions:c-1", b"1".to_vec()).await.unwrap();
		let listed = storage.list("commissions").await.unwrap();
		assert_eq!(listed[0], ("c-1".to_string(), b"1".to_vec()));
		assert_eq!(listed.len(), 2);

		storage.delete("commissions:c-1").await.unwrap();
		storage.delete("commissions:c-1").await.unwrap();
		assert!(!storage.exists("commissions:c-1").await.unwrap());
		assert!(matches!(
			storage.get_bytes("commissions:c-1").await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_ids_cannot_escape_base_directory() {
		let temp_dir = TempDir::new().unwrap();
		let storage = FileStorage::new(temp_dir.path().join("store"));
		storage
			.set_bytes("commissions:../../escape", b"x".to_vec())
			.await
			.unwrap();
		assert!(!temp_dir.path().join("escape.json").exists());
		assert_eq!(storage.list("commissions").await.unwrap().len(), 1);
	}

	#[test]
	fn test_factory_reads_storage_path() {
		let config: toml::Value = toml::from_str("storage_path = \"/tmp/tracker\"").unwrap();
		assert!(create_storage(&config).is_ok());

		let empty: toml::Value = toml::from_str("storage_path = \"\"").unwrap();
		assert!(matches!(
			create_storage(&empty),
			Err(StorageError::Configuration(_))
		));
	}
}
