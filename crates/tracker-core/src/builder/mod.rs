//! Builder pattern for constructing tracker engines.
//!
//! Composes a `TrackerEngine` from configuration and factory maps for each
//! pluggable backend: document storage, the drafting assistant and the
//! image object store. Assist and media are optional; when their section is
//! missing from the configuration the engine runs without them.

use crate::engine::{event_bus::EventBus, TrackerEngine};
use crate::session::AdminAuth;
use crate::stores::{CatalogStore, OrderStore};
use crate::view::DeleteConfirmation;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracker_assist::{AssistError, AssistInterface, AssistService};
use tracker_config::Config;
use tracker_media::{
	ImageOptions, MediaError, MediaService, MediaSettings, ObjectStoreInterface,
};
use tracker_storage::{StorageError, StorageInterface, StorageService};

/// Capacity of the engine's event channel.
const EVENT_BUS_CAPACITY: usize = 1000;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every backend kind, keyed by implementation name.
pub struct TrackerFactories<SF, AF, MF> {
	pub storage_factories: HashMap<String, SF>,
	pub assist_factories: HashMap<String, AF>,
	pub media_factories: HashMap<String, MF>,
}

/// Instantiates every configured implementation that has a factory.
/// Implementations without a factory are skipped; a failing factory aborts.
fn load_implementations<F, T, E>(
	component: &'static str,
	primary: &str,
	configs: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<HashMap<String, T>, BuilderError>
where
	F: Fn(&toml::Value) -> Result<T, E>,
	E: std::fmt::Display,
{
	let mut loaded = HashMap::new();
	for (name, config) in configs {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(component, implementation = %name, "No factory registered, skipping");
			continue;
		};
		match factory(config) {
			Ok(implementation) => {
				let is_primary = primary == name;
				tracing::info!(component, implementation = %name, enabled = %is_primary, "Loaded");
				loaded.insert(name.clone(), implementation);
			},
			Err(e) => {
				tracing::error!(
					component,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					component, name, e
				)));
			},
		}
	}
	Ok(loaded)
}

/// Builder for constructing a `TrackerEngine` with pluggable implementations.
pub struct TrackerBuilder {
	config: Config,
}

impl TrackerBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine. Stores are created but not connected; call
	/// `TrackerEngine::initialize` before serving.
	pub fn build<SF, AF, MF>(
		self,
		factories: TrackerFactories<SF, AF, MF>,
	) -> Result<TrackerEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		AF: Fn(&toml::Value) -> Result<Box<dyn AssistInterface>, AssistError>,
		MF: Fn(&toml::Value) -> Result<Box<dyn ObjectStoreInterface>, MediaError>,
	{
		let config = self.config;

		// Storage
		let mut storage_impls = load_implementations(
			"storage",
			&config.storage.primary,
			&config.storage.implementations,
			&factories.storage_factories,
		)?;
		if storage_impls.is_empty() {
			return Err(BuilderError::Config(
				"No valid storage implementations available".into(),
			));
		}
		let primary_storage = &config.storage.primary;
		let storage_backend = storage_impls.remove(primary_storage).ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary storage '{}' failed to load or has invalid configuration",
				primary_storage
			))
		})?;
		let storage = Arc::new(StorageService::new(storage_backend));

		// Assist
		let assist = match &config.assist {
			Some(assist_config) => {
				let implementations: HashMap<String, Arc<dyn AssistInterface>> =
					load_implementations(
						"assist",
						&assist_config.primary,
						&assist_config.implementations,
						&factories.assist_factories,
					)?
					.into_iter()
					.map(|(name, implementation)| (name, Arc::from(implementation)))
					.collect();
				let service = AssistService::new(implementations, assist_config.primary.clone())
					.map_err(|e| BuilderError::Config(e.to_string()))?;
				Some(Arc::new(service))
			},
			None => {
				tracing::info!(component = "assist", "Not configured, drafting disabled");
				None
			},
		};

		// Media
		let media = match &config.media {
			Some(media_config) => {
				let implementations: HashMap<String, Arc<dyn ObjectStoreInterface>> =
					load_implementations(
						"media",
						&media_config.primary,
						&media_config.implementations,
						&factories.media_factories,
					)?
					.into_iter()
					.map(|(name, implementation)| (name, Arc::from(implementation)))
					.collect();
				let settings = MediaSettings {
					image: ImageOptions {
						max_dimension: media_config.max_dimension,
						jpeg_quality: media_config.jpeg_quality,
					},
					path_prefix: media_config.path_prefix.clone(),
					processing_timeout: Duration::from_secs(media_config.processing_timeout_seconds),
				};
				let service =
					MediaService::new(implementations, media_config.primary.clone(), settings)
						.map_err(|e| BuilderError::Config(e.to_string()))?;
				Some(Arc::new(service))
			},
			None => {
				tracing::info!(component = "media", "Not configured, uploads disabled");
				None
			},
		};

		let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
		let poll_interval = config.storage.poll_interval_seconds.map(Duration::from_secs);
		let orders = Arc::new(OrderStore::new(
			storage.clone(),
			event_bus.clone(),
			poll_interval,
		));
		let catalog = Arc::new(CatalogStore::new(
			storage.clone(),
			event_bus.clone(),
			poll_interval,
		));
		let auth = Arc::new(AdminAuth::new(
			config.auth.admin_password.clone(),
			config.session_ttl(),
			config.tracker.artist_id.clone(),
		));

		Ok(TrackerEngine::new(
			config,
			storage,
			orders,
			catalog,
			auth,
			Arc::new(DeleteConfirmation::default()),
			assist,
			media,
			event_bus,
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tracker_config::builders::ConfigBuilder;

	fn factories() -> TrackerFactories<
		tracker_storage::StorageFactory,
		tracker_assist::AssistFactory,
		tracker_media::ObjectStoreFactory,
	> {
		TrackerFactories {
			storage_factories: tracker_storage::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			assist_factories: tracker_assist::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			media_factories: tracker_media::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}

	#[test]
	fn test_builds_with_optional_services() {
		let config = ConfigBuilder::new()
			.with_mock_assist()
			.with_memory_media()
			.build();
		let engine = TrackerBuilder::new(config).build(factories()).unwrap();
		assert!(engine.assist().is_some());
		assert!(engine.media().is_some());

		let bare = TrackerBuilder::new(ConfigBuilder::new().build())
			.build(factories())
			.unwrap();
		assert!(bare.assist().is_none());
		assert!(bare.media().is_none());
	}

	#[test]
	fn test_failing_factory_aborts_build() {
		// The rest backend requires a base_url.
		let config = ConfigBuilder::new()
			.storage("rest", toml::Value::Table(toml::Table::new()))
			.build();
		assert!(matches!(
			TrackerBuilder::new(config).build(factories()),
			Err(BuilderError::Config(_))
		));
	}

	#[test]
	fn test_missing_primary_factory_is_reported() {
		let config = ConfigBuilder::new()
			.storage("nosuch", toml::Value::Table(toml::Table::new()))
			.build();
		let Err(err) = TrackerBuilder::new(config).build(factories()) else {
			panic!("build should fail without a primary storage factory");
		};
		assert!(err.to_string().contains("nosuch"));
	}
}
