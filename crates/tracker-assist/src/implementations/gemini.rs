//! Gemini `generateContent` backend.

use crate::{AssistError, AssistFactory, AssistInterface, AssistRegistry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracker_types::{ImplementationRegistry, SecretString};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Deserialize)]
struct GeminiConfig {
	#[serde(default)]
	api_key: Option<SecretString>,
	#[serde(default = "default_model")]
	model: String,
	#[serde(default = "default_endpoint")]
	endpoint: String,
	#[serde(default = "default_timeout_seconds")]
	timeout_seconds: u64,
}

fn default_model() -> String {
	"gemini-3-flash-preview".to_string()
}

fn default_endpoint() -> String {
	DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_seconds() -> u64 {
	30
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
	contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
	parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
	text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
	#[serde(default)]
	candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
	content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
	#[serde(default)]
	parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
	#[serde(default)]
	text: Option<String>,
}

impl GenerateResponse {
	/// Concatenated text parts of the first candidate.
	fn text(&self) -> String {
		self.candidates
			.first()
			.and_then(|c| c.content.as_ref())
			.map(|content| {
				content
					.parts
					.iter()
					.filter_map(|p| p.text.as_deref())
					.collect::<String>()
			})
			.unwrap_or_default()
	}
}

pub struct GeminiAssist {
	client: reqwest::Client,
	url: String,
	api_key: SecretString,
}

impl GeminiAssist {
	pub fn new(
		endpoint: &str,
		model: &str,
		api_key: SecretString,
		timeout: Duration,
	) -> Result<Self, AssistError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| AssistError::Configuration(format!("HTTP client: {}", e)))?;
		Ok(Self {
			client,
			url: format!(
				"{}/models/{}:generateContent",
				endpoint.trim_end_matches('/'),
				model
			),
			api_key,
		})
	}
}

#[async_trait]
impl AssistInterface for GeminiAssist {
	async fn complete(&self, prompt: &str) -> Result<String, AssistError> {
		let body = GenerateRequest {
			contents: [Content {
				parts: [Part { text: prompt }],
			}],
		};
		let request = self
			.api_key
			.with_exposed(|key| self.client.post(&self.url).header("x-goog-api-key", key))
			.json(&body);

		let response = request
			.send()
			.await
			.map_err(|e| AssistError::Network(e.to_string()))?;
		let status = response.status();
		if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
			return Err(AssistError::Configuration(format!(
				"API key rejected ({})",
				status
			)));
		}
		if !status.is_success() {
			let text = response.text().await.unwrap_or_default();
			return Err(AssistError::Network(format!("{} {}", status, text.trim())));
		}

		let parsed: GenerateResponse = response
			.json()
			.await
			.map_err(|e| AssistError::Network(format!("Malformed response: {}", e)))?;
		Ok(parsed.text())
	}
}

/// Factory function to create the Gemini backend.
///
/// Configuration parameters:
/// - `api_key`: API key (required, usually `${GEMINI_API_KEY}`)
/// - `model`: model name (default: gemini-3-flash-preview)
/// - `endpoint`: API base URL
/// - `timeout_seconds`: per-request timeout (default: 30)
pub fn create_assist(config: &toml::Value) -> Result<Box<dyn AssistInterface>, AssistError> {
	let config: GeminiConfig = config
		.clone()
		.try_into()
		.map_err(|e: toml::de::Error| AssistError::Configuration(e.message().to_string()))?;

	let api_key = config
		.api_key
		.filter(|key| !key.is_empty())
		.ok_or_else(|| AssistError::Configuration("Missing API key".into()))?;

	Ok(Box::new(GeminiAssist::new(
		&config.endpoint,
		&config.model,
		api_key,
		Duration::from_secs(config.timeout_seconds),
	)?))
}

/// Registry for the Gemini implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "gemini";
	type Factory = AssistFactory;

	fn factory() -> Self::Factory {
		create_assist
	}
}

impl AssistRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_missing_key_is_configuration_error() {
		let empty = toml::Value::Table(toml::Table::new());
		assert!(matches!(
			create_assist(&empty),
			Err(AssistError::Configuration(_))
		));

		let blank: toml::Value = toml::from_str("api_key = \"\"").unwrap();
		assert!(matches!(
			create_assist(&blank),
			Err(AssistError::Configuration(_))
		));

		let ok: toml::Value = toml::from_str("api_key = \"k\"").unwrap();
		assert!(create_assist(&ok).is_ok());
	}

	#[test]
	fn test_url_uses_model() {
		let assist = GeminiAssist::new(
			"https://example.com/v1beta/",
			"gemini-test",
			SecretString::from("k"),
			Duration::from_secs(1),
		)
		.unwrap();
		assert_eq!(
			assist.url,
			"https://example.com/v1beta/models/gemini-test:generateContent"
		);
	}

	#[test]
	fn test_response_text_joins_parts() {
		let parsed: GenerateResponse = serde_json::from_str(
			r#"{"candidates":[{"content":{"parts":[{"text":"一、"},{"text":"二"}]}}]}"#,
		)
		.unwrap();
		assert_eq!(parsed.text(), "一、二");

		let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
		assert_eq!(empty.text(), "");
	}
}
