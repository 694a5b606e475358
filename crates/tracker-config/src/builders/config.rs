//! Fluent builder for `Config` values used in tests and local runs.

use crate::{
	ApiConfig, AssistConfig, AuthConfig, Config, MediaConfig, StorageConfig, TrackerConfig,
};
use std::collections::HashMap;
use tracker_types::SecretString;

/// Builds a `Config` backed by in-memory implementations unless told otherwise.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	tracker_id: String,
	artist_id: String,
	admin_password: String,
	session_ttl_minutes: u64,
	storage_primary: String,
	storage_implementations: HashMap<String, toml::Value>,
	assist: Option<AssistConfig>,
	media: Option<MediaConfig>,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			tracker_id: "test-tracker".to_string(),
			artist_id: "肉圓".to_string(),
			admin_password: "test-password".to_string(),
			session_ttl_minutes: 60,
			storage_primary: "memory".to_string(),
			storage_implementations: HashMap::from([(
				"memory".to_string(),
				toml::Value::Table(toml::Table::new()),
			)]),
			assist: None,
			media: None,
			api: None,
		}
	}

	pub fn tracker_id(mut self, id: impl Into<String>) -> Self {
		self.tracker_id = id.into();
		self
	}

	pub fn artist_id(mut self, artist_id: impl Into<String>) -> Self {
		self.artist_id = artist_id.into();
		self
	}

	pub fn admin_password(mut self, password: impl Into<String>) -> Self {
		self.admin_password = password.into();
		self
	}

	pub fn session_ttl_minutes(mut self, minutes: u64) -> Self {
		self.session_ttl_minutes = minutes;
		self
	}

	/// Uses `name` as the primary storage with the given raw settings.
	pub fn storage(mut self, name: impl Into<String>, settings: toml::Value) -> Self {
		let name = name.into();
		self.storage_implementations.insert(name.clone(), settings);
		self.storage_primary = name;
		self
	}

	/// Enables the mock assist backend.
	pub fn with_mock_assist(mut self) -> Self {
		self.assist = Some(AssistConfig {
			primary: "mock".to_string(),
			implementations: HashMap::from([(
				"mock".to_string(),
				toml::Value::Table(toml::Table::new()),
			)]),
		});
		self
	}

	/// Enables the in-memory object store with default image limits.
	pub fn with_memory_media(mut self) -> Self {
		self.media = Some(MediaConfig {
			primary: "memory".to_string(),
			max_dimension: 800,
			jpeg_quality: 70,
			path_prefix: "uploads".to_string(),
			processing_timeout_seconds: 30,
			implementations: HashMap::from([(
				"memory".to_string(),
				toml::Value::Table(toml::Table::new()),
			)]),
		});
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	pub fn build(self) -> Config {
		Config {
			tracker: TrackerConfig {
				id: self.tracker_id,
				artist_id: self.artist_id,
			},
			auth: AuthConfig {
				admin_password: SecretString::new(self.admin_password),
				session_ttl_minutes: self.session_ttl_minutes,
			},
			storage: StorageConfig {
				primary: self.storage_primary,
				implementations: self.storage_implementations,
				poll_interval_seconds: None,
			},
			assist: self.assist,
			media: self.media,
			api: self.api,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_builder_output_passes_validation() {
		let config = ConfigBuilder::new()
			.with_mock_assist()
			.with_memory_media()
			.build();
		config.validate().unwrap();
		assert_eq!(config.storage.primary, "memory");
	}

	#[test]
	fn test_storage_override_becomes_primary() {
		let config = ConfigBuilder::new()
			.storage("file", toml::Value::Table(toml::Table::new()))
			.build();
		assert_eq!(config.storage.primary, "file");
		assert_eq!(config.storage.implementations.len(), 2);
	}
}
