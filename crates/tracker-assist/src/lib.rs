//! Drafting assistant for the commission tracker.
//!
//! Turns an order into a prompt for a generative-text backend and returns
//! the free text it produces: a short progress message for the client, or
//! a list of next steps for the artist. Backends follow the same
//! trait-and-registry pattern as storage.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracker_types::{truncate_id, ImplementationRegistry, Order};

pub mod prompts;

/// Re-export implementations
pub mod implementations {
	pub mod gemini;
	pub mod mock;
}

/// Errors that can occur while drafting text.
#[derive(Debug, Error)]
pub enum AssistError {
	/// The backend could not be reached or answered with an error.
	#[error("Network error: {0}")]
	Network(String),
	/// Missing or invalid credentials and settings.
	#[error("Configuration error: {0}")]
	Configuration(String),
	/// The backend answered without any usable text.
	#[error("No text produced: {0}")]
	Unavailable(String),
	#[error("Internal error: {0}")]
	Internal(String),
}

/// Interface for generative-text backends.
#[async_trait]
pub trait AssistInterface: Send + Sync {
	/// Sends `prompt` and returns the generated text.
	async fn complete(&self, prompt: &str) -> Result<String, AssistError>;
}

/// Type alias for assist factory functions.
pub type AssistFactory = fn(&toml::Value) -> Result<Box<dyn AssistInterface>, AssistError>;

/// Registry trait for assist implementations.
pub trait AssistRegistry: ImplementationRegistry<Factory = AssistFactory> {}

/// Get all registered assist implementations.
pub fn get_all_implementations() -> Vec<(&'static str, AssistFactory)> {
	use implementations::{gemini, mock};

	vec![
		(gemini::Registry::NAME, gemini::Registry::factory()),
		(mock::Registry::NAME, mock::Registry::factory()),
	]
}

/// Drafts order texts through the primary backend.
pub struct AssistService {
	implementations: HashMap<String, Arc<dyn AssistInterface>>,
	primary_implementation: String,
}

impl AssistService {
	pub fn new(
		implementations: HashMap<String, Arc<dyn AssistInterface>>,
		primary_implementation: String,
	) -> Result<Self, AssistError> {
		if !implementations.contains_key(&primary_implementation) {
			return Err(AssistError::Configuration(format!(
				"Primary implementation '{}' not found in available implementations",
				primary_implementation
			)));
		}

		Ok(Self {
			implementations,
			primary_implementation,
		})
	}

	fn primary(&self) -> Result<&Arc<dyn AssistInterface>, AssistError> {
		self.implementations
			.get(&self.primary_implementation)
			.ok_or_else(|| {
				AssistError::Internal(format!(
					"Primary implementation '{}' not available",
					self.primary_implementation
				))
			})
	}

	async fn run(&self, order: &Order, prompt: String, fallback: &str) -> Result<String, AssistError> {
		let text = self.primary()?.complete(&prompt).await.map_err(|e| {
			tracing::warn!(order_id = %truncate_id(&order.id), error = %e, "Drafting failed");
			e
		})?;
		let text = text.trim();
		if text.is_empty() {
			return Ok(fallback.to_string());
		}
		Ok(text.to_string())
	}

	/// Short, polite progress message addressed to the client.
	pub async fn draft_client_update(&self, order: &Order) -> Result<String, AssistError> {
		self.run(
			order,
			prompts::client_update(order),
			prompts::NO_UPDATE_FALLBACK,
		)
		.await
	}

	/// Three concrete next steps for the artist.
	pub async fn suggest_work_plan(&self, order: &Order) -> Result<String, AssistError> {
		self.run(order, prompts::work_plan(order), prompts::NO_PLAN_FALLBACK)
			.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::mock::MockAssist;
	use tracker_types::{NewOrder, OrderStatus, OrderType};

	fn order() -> Order {
		Order::from_new(
			"c-101",
			NewOrder {
				artist_id: "肉圓".into(),
				client_name: "小星".into(),
				contact: None,
				title: "OC 吊飾".into(),
				description: "雙層雙面".into(),
				order_type: OrderType::Charm,
				price: 850,
				status: OrderStatus::Queued,
				notes: None,
				thumbnail_url: None,
			},
			tracker_types::today(),
		)
	}

	fn service(reply: &str) -> AssistService {
		let mock: Arc<dyn AssistInterface> = Arc::new(MockAssist::new(reply));
		AssistService::new(HashMap::from([("mock".to_string(), mock)]), "mock".into()).unwrap()
	}

	#[test]
	fn test_unknown_primary_is_rejected() {
		assert!(matches!(
			AssistService::new(HashMap::new(), "gemini".into()),
			Err(AssistError::Configuration(_))
		));
	}

	#[tokio::test]
	async fn test_drafts_use_primary_backend() {
		let svc = service("  感謝您的耐心等待！ ");
		assert_eq!(
			svc.draft_client_update(&order()).await.unwrap(),
			"感謝您的耐心等待！"
		);
	}

	#[tokio::test]
	async fn test_empty_reply_uses_fallback_text() {
		let svc = service("");
		assert_eq!(
			svc.suggest_work_plan(&order()).await.unwrap(),
			prompts::NO_PLAN_FALLBACK
		);
		assert_eq!(
			svc.draft_client_update(&order()).await.unwrap(),
			prompts::NO_UPDATE_FALLBACK
		);
	}
}
