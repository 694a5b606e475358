//! Factory registry for tracker backends.
//!
//! Every backend crate lists its implementations through
//! `get_all_implementations`. The registry collects them once so the
//! configuration can pick backends by name.

use std::collections::HashMap;
use std::sync::OnceLock;
use tracker_assist::AssistFactory;
use tracker_config::Config;
use tracker_core::{TrackerBuilder, TrackerEngine, TrackerFactories};
use tracker_media::ObjectStoreFactory;
use tracker_storage::StorageFactory;

/// Every known factory, keyed by implementation name.
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub assist: HashMap<String, AssistFactory>,
	pub media: HashMap<String, ObjectStoreFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			storage: HashMap::new(),
			assist: HashMap::new(),
			media: HashMap::new(),
		}
	}
}

impl Default for FactoryRegistry {
	fn default() -> Self {
		Self::new()
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the registry, filling it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in tracker_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.storage.insert(name.to_string(), factory);
		}
		for (name, factory) in tracker_assist::get_all_implementations() {
			tracing::debug!("Registering assist implementation: {}", name);
			registry.assist.insert(name.to_string(), factory);
		}
		for (name, factory) in tracker_media::get_all_implementations() {
			tracing::debug!("Registering media implementation: {}", name);
			registry.media.insert(name.to_string(), factory);
		}

		registry
	})
}

/// Picks the factories named in a config section, failing on unknown names.
macro_rules! build_factories {
	($registry:expr, $config_impls:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

/// Builds the engine from configuration using the registered factories.
pub fn build_tracker_from_config(
	config: Config,
) -> Result<TrackerEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let storage_factories =
		build_factories!(registry, config.storage.implementations, storage, "storage");
	let assist_factories = match &config.assist {
		Some(assist) => build_factories!(registry, assist.implementations, assist, "assist"),
		None => HashMap::new(),
	};
	let media_factories = match &config.media {
		Some(media) => build_factories!(registry, media.implementations, media, "media"),
		None => HashMap::new(),
	};

	let factories = TrackerFactories {
		storage_factories,
		assist_factories,
		media_factories,
	};

	Ok(TrackerBuilder::new(config).build(factories)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use tracker_config::builders::ConfigBuilder;

	#[test]
	fn test_registry_lists_every_backend() {
		let registry = get_registry();
		for name in ["memory", "file", "rest"] {
			assert!(registry.storage.contains_key(name), "missing storage {}", name);
		}
		assert!(registry.assist.contains_key("gemini"));
		assert!(registry.assist.contains_key("mock"));
		for name in ["memory", "local", "http"] {
			assert!(registry.media.contains_key(name), "missing media {}", name);
		}
	}

	#[test]
	fn test_unknown_implementation_is_reported() {
		let config = ConfigBuilder::new()
			.storage("redis", toml::Value::Table(toml::Table::new()))
			.build();
		let err = build_tracker_from_config(config).err().unwrap();
		let message = err.to_string();
		assert!(message.contains("Unknown storage implementation 'redis'"));
		assert!(message.contains("memory"));
	}

	#[test]
	fn test_builds_from_test_config() {
		let config = ConfigBuilder::new().with_mock_assist().build();
		let engine = build_tracker_from_config(config).unwrap();
		assert!(engine.assist().is_some());
		assert!(engine.media().is_none());
	}
}
