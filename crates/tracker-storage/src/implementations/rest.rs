//! Remote document database over HTTP.
//!
//! Documents are addressed as `<base_url>/<collection>/<id>`:
//! - `GET` returns the document body, `404` when absent
//! - `PUT` replaces the whole document
//! - `DELETE` removes it
//! - `GET <base_url>/<collection>` returns `{"documents": [{"id", "data"}]}`
//!
//! Access-rule rejections (401/403) surface as `PermissionDenied` and
//! transport failures as `Unavailable`, so the stores can tell a
//! misconfigured database from an offline one.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracker_types::{ImplementationRegistry, SecretString};

#[derive(Debug, Deserialize)]
struct RestStorageConfig {
	base_url: String,
	#[serde(default)]
	api_key: Option<SecretString>,
	#[serde(default = "default_timeout_seconds")]
	timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
	10
}

#[derive(Debug, Deserialize)]
struct ListResponse {
	documents: Vec<ListedDocument>,
}

#[derive(Debug, Deserialize)]
struct ListedDocument {
	id: String,
	data: serde_json::Value,
}

pub struct RestStorage {
	client: reqwest::Client,
	base_url: Url,
	api_key: Option<SecretString>,
}

impl RestStorage {
	pub fn new(
		base_url: &str,
		api_key: Option<SecretString>,
		timeout: Duration,
	) -> Result<Self, StorageError> {
		let base_url = Url::parse(base_url)
			.map_err(|e| StorageError::Configuration(format!("base_url '{}': {}", base_url, e)))?;
		if base_url.cannot_be_a_base() {
			return Err(StorageError::Configuration(format!(
				"base_url '{}' cannot hold a path",
				base_url
			)));
		}
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| StorageError::Configuration(format!("HTTP client: {}", e)))?;
		Ok(Self {
			client,
			base_url,
			api_key,
		})
	}

	/// `base_url` with `segments` appended, each percent-encoded as one
	/// path segment.
	fn url_for(&self, segments: &[&str]) -> Url {
		let mut url = self.base_url.clone();
		if let Ok(mut path) = url.path_segments_mut() {
			path.pop_if_empty().extend(segments);
		}
		url
	}

	fn document_url(&self, key: &str) -> Result<Url, StorageError> {
		let (namespace, id) = key
			.split_once(':')
			.ok_or_else(|| StorageError::Backend(format!("Malformed key: {}", key)))?;
		Ok(self.url_for(&[namespace, id]))
	}

	fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
		let builder = self.client.request(method, url);
		match &self.api_key {
			Some(key) => key.with_exposed(|k| builder.bearer_auth(k)),
			None => builder,
		}
	}

	async fn send(
		&self,
		builder: reqwest::RequestBuilder,
	) -> Result<reqwest::Response, StorageError> {
		let response = builder.send().await.map_err(transport_error)?;
		match response.status() {
			StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
				let status = response.status();
				let body = response.text().await.unwrap_or_default();
				Err(StorageError::PermissionDenied(format!("{} {}", status, body.trim())))
			},
			StatusCode::NOT_FOUND => Err(StorageError::NotFound),
			StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
				Err(StorageError::Unavailable(response.status().to_string()))
			},
			status if !status.is_success() => {
				let body = response.text().await.unwrap_or_default();
				Err(StorageError::Backend(format!("{} {}", status, body.trim())))
			},
			_ => Ok(response),
		}
	}
}

fn transport_error(e: reqwest::Error) -> StorageError {
	if e.is_connect() || e.is_timeout() {
		StorageError::Unavailable(e.to_string())
	} else {
		StorageError::Backend(e.to_string())
	}
}

#[async_trait]
impl StorageInterface for RestStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let url = self.document_url(key)?;
		let response = self.send(self.request(reqwest::Method::GET, url)).await?;
		let bytes = response.bytes().await.map_err(transport_error)?;
		Ok(bytes.to_vec())
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let url = self.document_url(key)?;
		let builder = self
			.request(reqwest::Method::PUT, url)
			.header(reqwest::header::CONTENT_TYPE, "application/json")
			.body(value);
		self.send(builder).await.map(|_| ())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let url = self.document_url(key)?;
		match self.send(self.request(reqwest::Method::DELETE, url)).await {
			Ok(_) | Err(StorageError::NotFound) => Ok(()),
			Err(e) => Err(e),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let url = self.document_url(key)?;
		match self.send(self.request(reqwest::Method::HEAD, url)).await {
			Ok(_) => Ok(true),
			Err(StorageError::NotFound) => Ok(false),
			Err(e) => Err(e),
		}
	}

	async fn list(&self, namespace: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
		let url = self.url_for(&[namespace]);
		let response = match self.send(self.request(reqwest::Method::GET, url)).await {
			Ok(response) => response,
			// A collection that was never written is empty.
			Err(StorageError::NotFound) => return Ok(Vec::new()),
			Err(e) => return Err(e),
		};
		let listing: ListResponse = response
			.json()
			.await
			.map_err(|e| StorageError::Serialization(e.to_string()))?;

		listing
			.documents
			.into_iter()
			.map(|doc| {
				serde_json::to_vec(&doc.data)
					.map(|bytes| (doc.id, bytes))
					.map_err(|e| StorageError::Serialization(e.to_string()))
			})
			.collect()
	}
}

/// Factory function to create a REST storage backend.
///
/// Configuration parameters:
/// - `base_url`: database endpoint (required)
/// - `api_key`: bearer token presented on every request (optional)
/// - `timeout_seconds`: per-request timeout (default: 10)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	let config: RestStorageConfig = config
		.clone()
		.try_into()
		.map_err(|e: toml::de::Error| StorageError::Configuration(e.message().to_string()))?;
	if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
		return Err(StorageError::Configuration(format!(
			"base_url must be an http(s) URL, got '{}'",
			config.base_url
		)));
	}
	if config.api_key.as_ref().is_some_and(SecretString::is_empty) {
		return Err(StorageError::Configuration(
			"api_key is set but empty".into(),
		));
	}
	Ok(Box::new(RestStorage::new(
		&config.base_url,
		config.api_key,
		Duration::from_secs(config.timeout_seconds),
	)?))
}

/// Registry for the REST storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "rest";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
