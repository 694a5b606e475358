//! Configuration module for the commission tracker.
//!
//! Configuration is read from TOML. Values may reference environment
//! variables with `${VAR}` or `${VAR:-default}`, which keeps the admin
//! password and API keys out of the file itself.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["storage.toml", "media.toml"]` to pull in other files
//! - Each top-level section must be unique across all files (no duplicates allowed)

#[cfg(any(test, feature = "testing"))]
pub mod builders;
mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracker_types::SecretString;

/// Placeholder shipped in sample configs; refused at load time.
const PASSWORD_PLACEHOLDER: &str = "CHANGE_ME";

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep only the message; the default rendering dumps the whole input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the tracker service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this tracker instance.
	pub tracker: TrackerConfig,
	/// Admin authentication.
	pub auth: AuthConfig,
	/// Document storage backend.
	pub storage: StorageConfig,
	/// Generative-text drafting. Assist routes are unavailable when absent.
	pub assist: Option<AssistConfig>,
	/// Image uploads. Upload routes are unavailable when absent.
	pub media: Option<MediaConfig>,
	/// HTTP API server.
	pub api: Option<ApiConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerConfig {
	/// Unique identifier for this tracker instance.
	pub id: String,
	/// Artist tag stamped on orders created through this instance.
	#[serde(default = "default_artist_id")]
	pub artist_id: String,
}

fn default_artist_id() -> String {
	"肉圓".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
	/// Password that unlocks the admin view.
	pub admin_password: SecretString,
	/// Lifetime of an admin session token.
	#[serde(default = "default_session_ttl_minutes")]
	pub session_ttl_minutes: u64,
}

/// Returns the default session lifetime of 12 hours.
fn default_session_ttl_minutes() -> u64 {
	720
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Re-read interval for picking up writes made by other clients of a
	/// shared backend. Unset means only local writes are observed.
	#[serde(default)]
	pub poll_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// Image processing and object storage.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
	pub primary: String,
	/// Longest edge after resizing, in pixels.
	#[serde(default = "default_max_dimension")]
	pub max_dimension: u32,
	/// JPEG quality, 1 to 100.
	#[serde(default = "default_jpeg_quality")]
	pub jpeg_quality: u8,
	/// Object name prefix for uploads.
	#[serde(default = "default_path_prefix")]
	pub path_prefix: String,
	/// Upper bound for decoding and re-encoding one image.
	#[serde(default = "default_processing_timeout_seconds")]
	pub processing_timeout_seconds: u64,
	pub implementations: HashMap<String, toml::Value>,
}

fn default_max_dimension() -> u32 {
	800
}

fn default_jpeg_quality() -> u8 {
	70
}

fn default_path_prefix() -> String {
	"uploads".to_string()
}

fn default_processing_timeout_seconds() -> u64 {
	30
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request size in bytes. Uploads carry raw images, so this is
	/// larger than a JSON-only API would need.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
	pub cors: Option<CorsConfig>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	pub allowed_origins: Vec<String>,
	#[serde(default)]
	pub allowed_headers: Vec<String>,
	#[serde(default)]
	pub allowed_methods: Vec<String>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_api_timeout() -> u64 {
	30
}

fn default_max_request_size() -> usize {
	10 * 1024 * 1024 // 10MB
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of the environment variable and
/// supports defaults with `${VAR_NAME:-default_value}`.
///
/// Input is limited to 1MB to bound regex work.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut missing = None;
	let resolved = re.replace_all(input, |cap: &regex::Captures<'_>| {
		let var_name = &cap[1];
		match (std::env::var(var_name), cap.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				missing.get_or_insert_with(|| var_name.to_string());
				String::new()
			},
		}
	});

	match missing {
		Some(var_name) => Err(ConfigError::Validation(format!(
			"Environment variable '{}' not found",
			var_name
		))),
		None => Ok(resolved.into_owned()),
	}
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Deserializes and validates an already env-resolved TOML tree.
	pub(crate) fn from_value(value: toml::Value) -> Result<Self, ConfigError> {
		let config: Config = value.try_into()?;
		config.validate()?;
		Ok(config)
	}

	/// Session lifetime as a `Duration`.
	pub fn session_ttl(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.auth.session_ttl_minutes * 60)
	}

	/// Validates the configuration:
	/// - tracker id is not empty
	/// - admin password is set and not the shipped placeholder
	/// - every `primary` names a configured implementation
	/// - media limits are usable
	fn validate(&self) -> Result<(), ConfigError> {
		if self.tracker.id.trim().is_empty() {
			return Err(ConfigError::Validation("Tracker ID cannot be empty".into()));
		}
		if self.tracker.artist_id.trim().is_empty() {
			return Err(ConfigError::Validation("Artist ID cannot be empty".into()));
		}

		let password = &self.auth.admin_password;
		if password.is_empty() || password.matches(PASSWORD_PLACEHOLDER) {
			return Err(ConfigError::Validation(
				"auth.admin_password must be set to a real password".into(),
			));
		}
		if self.auth.session_ttl_minutes == 0 {
			return Err(ConfigError::Validation(
				"auth.session_ttl_minutes must be greater than 0".into(),
			));
		}

		validate_primary("storage", &self.storage.primary, &self.storage.implementations)?;
		if self.storage.poll_interval_seconds == Some(0) {
			return Err(ConfigError::Validation(
				"storage.poll_interval_seconds must be greater than 0".into(),
			));
		}

		if let Some(assist) = &self.assist {
			validate_primary("assist", &assist.primary, &assist.implementations)?;
		}

		if let Some(media) = &self.media {
			validate_primary("media", &media.primary, &media.implementations)?;
			if media.max_dimension == 0 {
				return Err(ConfigError::Validation(
					"media.max_dimension must be greater than 0".into(),
				));
			}
			if !(1..=100).contains(&media.jpeg_quality) {
				return Err(ConfigError::Validation(format!(
					"media.jpeg_quality must be between 1 and 100, got {}",
					media.jpeg_quality
				)));
			}
			if media.path_prefix.trim_matches('/').is_empty() {
				return Err(ConfigError::Validation(
					"media.path_prefix cannot be empty".into(),
				));
			}
		}

		if let Some(api) = &self.api {
			if api.enabled && api.port == 0 {
				return Err(ConfigError::Validation("api.port cannot be 0".into()));
			}
		}

		Ok(())
	}
}

fn validate_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		let mut available: Vec<_> = implementations.keys().cloned().collect();
		available.sort();
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations. Available: {:?}",
			section, primary, available
		)));
	}
	Ok(())
}

/// Parses configuration from a TOML string. Environment variables are
/// resolved first and the result is validated.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		Config::from_value(toml::from_str(&resolved)?)
	}
}
