//! Canned-reply backend for development and tests.

use crate::{AssistError, AssistFactory, AssistInterface, AssistRegistry};
use async_trait::async_trait;
use serde::Deserialize;
use tracker_types::ImplementationRegistry;

#[derive(Debug, Deserialize)]
struct MockAssistConfig {
	#[serde(default = "default_reply")]
	reply: String,
}

fn default_reply() -> String {
	"您好，您的訂單進度順利，感謝耐心等候！".to_string()
}

/// Returns the same reply for every prompt.
pub struct MockAssist {
	reply: String,
}

impl MockAssist {
	pub fn new(reply: impl Into<String>) -> Self {
		Self {
			reply: reply.into(),
		}
	}
}

#[async_trait]
impl AssistInterface for MockAssist {
	async fn complete(&self, prompt: &str) -> Result<String, AssistError> {
		tracing::debug!(prompt_chars = prompt.chars().count(), "Mock completion");
		Ok(self.reply.clone())
	}
}

pub fn create_assist(config: &toml::Value) -> Result<Box<dyn AssistInterface>, AssistError> {
	let config: MockAssistConfig = config
		.clone()
		.try_into()
		.map_err(|e: toml::de::Error| AssistError::Configuration(e.message().to_string()))?;
	Ok(Box::new(MockAssist::new(config.reply)))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "mock";
	type Factory = AssistFactory;

	fn factory() -> Self::Factory {
		create_assist
	}
}

impl AssistRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_configured_reply() {
		let config: toml::Value = toml::from_str("reply = \"好的\"").unwrap();
		let assist = create_assist(&config).unwrap();
		assert_eq!(assist.complete("anything").await.unwrap(), "好的");

		let default = create_assist(&toml::Value::Table(toml::Table::new())).unwrap();
		assert_eq!(default.complete("x").await.unwrap(), default_reply());
	}
}
