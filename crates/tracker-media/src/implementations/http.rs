//! Anonymous image host upload (Imgur-compatible API).
//!
//! The image is posted as the `image` field of a multipart form with a
//! `Client-ID` authorization header. A successful reply carries the public
//! link at `data.link`.

use crate::{MediaError, ObjectStoreFactory, ObjectStoreInterface, ObjectStoreRegistry};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracker_types::{ImplementationRegistry, SecretString};

const DEFAULT_UPLOAD_URL: &str = "https://api.imgur.com/3/image";
/// Value shipped in sample configs.
const CLIENT_ID_PLACEHOLDER: &str = "YOUR_IMGUR_CLIENT_ID_HERE";

#[derive(Debug, Deserialize)]
struct HttpStoreConfig {
	#[serde(default = "default_upload_url")]
	upload_url: String,
	client_id: SecretString,
	#[serde(default = "default_timeout_seconds")]
	timeout_seconds: u64,
}

fn default_upload_url() -> String {
	DEFAULT_UPLOAD_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
	30
}

#[derive(Debug, Deserialize)]
struct UploadReply {
	#[serde(default)]
	success: bool,
	data: UploadData,
}

#[derive(Debug, Deserialize)]
struct UploadData {
	#[serde(default)]
	link: Option<String>,
	#[serde(default)]
	error: Option<serde_json::Value>,
}

pub struct HttpObjectStore {
	client: reqwest::Client,
	upload_url: String,
	client_id: SecretString,
}

impl HttpObjectStore {
	pub fn new(
		upload_url: &str,
		client_id: SecretString,
		timeout: Duration,
	) -> Result<Self, MediaError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| MediaError::Configuration(format!("HTTP client: {}", e)))?;
		Ok(Self {
			client,
			upload_url: upload_url.to_string(),
			client_id,
		})
	}
}

fn parse_reply(body: &[u8]) -> Result<String, MediaError> {
	let reply: UploadReply = serde_json::from_slice(body)
		.map_err(|e| MediaError::Store(format!("Malformed upload reply: {}", e)))?;
	match (reply.success, reply.data.link) {
		(true, Some(link)) => Ok(link),
		_ => Err(MediaError::Store(match reply.data.error {
			Some(error) => format!("Image host error: {}", error),
			None => "Image host reported failure".to_string(),
		})),
	}
}

#[async_trait]
impl ObjectStoreInterface for HttpObjectStore {
	async fn put(
		&self,
		name: &str,
		bytes: Vec<u8>,
		content_type: &str,
	) -> Result<String, MediaError> {
		let file_name = name.rsplit('/').next().unwrap_or(name).to_string();
		let part = reqwest::multipart::Part::bytes(bytes)
			.file_name(file_name)
			.mime_str(content_type)
			.map_err(|e| MediaError::Store(e.to_string()))?;
		let form = reqwest::multipart::Form::new().part("image", part);

		let request = self.client_id.with_exposed(|id| {
			self.client
				.post(&self.upload_url)
				.header(reqwest::header::AUTHORIZATION, format!("Client-ID {}", id))
		});
		let response = request
			.multipart(form)
			.send()
			.await
			.map_err(|e| MediaError::Store(e.to_string()))?;

		let status = response.status();
		let body = response
			.bytes()
			.await
			.map_err(|e| MediaError::Store(e.to_string()))?;
		if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
			return Err(MediaError::Configuration(format!(
				"Image host rejected the client id ({})",
				status
			)));
		}
		parse_reply(&body)
	}
}

/// Factory function to create the image host backend.
///
/// Configuration parameters:
/// - `client_id`: API client id (required)
/// - `upload_url`: upload endpoint (default: Imgur)
/// - `timeout_seconds`: request timeout (default: 30)
pub fn create_store(config: &toml::Value) -> Result<Box<dyn ObjectStoreInterface>, MediaError> {
	let config: HttpStoreConfig = config
		.clone()
		.try_into()
		.map_err(|e: toml::de::Error| MediaError::Configuration(e.message().to_string()))?;
	if config.client_id.is_empty() || config.client_id.matches(CLIENT_ID_PLACEHOLDER) {
		return Err(MediaError::Configuration(
			"client_id is not set; register an application with the image host and configure its client id".into(),
		));
	}
	Ok(Box::new(HttpObjectStore::new(
		&config.upload_url,
		config.client_id,
		Duration::from_secs(config.timeout_seconds),
	)?))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = ObjectStoreFactory;

	fn factory() -> Self::Factory {
		create_store
	}
}

impl ObjectStoreRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_placeholder_client_id_is_rejected() {
		let placeholder: toml::Value =
			toml::from_str("client_id = \"YOUR_IMGUR_CLIENT_ID_HERE\"").unwrap();
		assert!(matches!(
			create_store(&placeholder),
			Err(MediaError::Configuration(_))
		));

		let ok: toml::Value = toml::from_str("client_id = \"abc123\"").unwrap();
		assert!(create_store(&ok).is_ok());
	}

	#[test]
	fn test_parse_reply() {
		assert_eq!(
			parse_reply(br#"{"success":true,"data":{"link":"https://i.imgur.com/x.jpg"}}"#)
				.unwrap(),
			"https://i.imgur.com/x.jpg"
		);
		let err = parse_reply(br#"{"success":false,"data":{"error":"Bad image"}}"#).unwrap_err();
		assert!(err.to_string().contains("Bad image"));
		assert!(parse_reply(b"<html>").is_err());
	}
}
