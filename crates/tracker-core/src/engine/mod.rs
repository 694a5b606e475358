//! Tracker engine that fronts every order, catalog and admin operation.
//!
//! `TrackerEngine` owns the live stores, the admin session authority and
//! the optional drafting and media services. The HTTP layer holds one clone
//! and calls into it; nothing here knows about requests or status codes.

pub mod event_bus;
pub mod lifecycle;

use crate::handlers::{OrderHandler, SubmissionError};
use crate::session::{AdminAuth, AdminSession, AuthError};
use crate::state::progress;
use crate::stores::{CatalogStore, CatalogStoreError, OrderStore, OrderStoreError};
use crate::view::{order_stats, visible_orders, DeleteConfirmation, DeleteDecision};
use std::sync::Arc;
use thiserror::Error;
use tracker_assist::{AssistError, AssistService};
use tracker_config::Config;
use tracker_media::{MediaError, MediaService};
use tracker_storage::StorageService;
use tracker_types::{
	truncate_id, Catalog, CatalogError, DeleteResponse, IntakeRequest, ManualOrderRequest, Order,
	OrderPatch, OrderProgress, OrderQuery, OrderStats, SessionEvent, TrackerEvent,
};

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum TrackerError {
	#[error(transparent)]
	Orders(#[from] OrderStoreError),
	#[error(transparent)]
	Catalog(#[from] CatalogStoreError),
	#[error(transparent)]
	CatalogEdit(#[from] CatalogError),
	#[error(transparent)]
	Auth(#[from] AuthError),
	#[error(transparent)]
	Submission(#[from] SubmissionError),
	#[error(transparent)]
	Assist(#[from] AssistError),
	#[error(transparent)]
	Media(#[from] MediaError),
	#[error("Invalid request: {0}")]
	Invalid(String),
	#[error("{0} is not configured")]
	NotConfigured(&'static str),
}

/// Commission tracker engine.
#[derive(Clone)]
pub struct TrackerEngine {
	pub(crate) config: Config,
	pub(crate) storage: Arc<StorageService>,
	pub(crate) orders: Arc<OrderStore>,
	pub(crate) catalog: Arc<CatalogStore>,
	pub(crate) auth: Arc<AdminAuth>,
	deletes: Arc<DeleteConfirmation>,
	order_handler: Arc<OrderHandler>,
	assist: Option<Arc<AssistService>>,
	media: Option<Arc<MediaService>>,
	pub(crate) event_bus: event_bus::EventBus,
}

impl TrackerEngine {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		orders: Arc<OrderStore>,
		catalog: Arc<CatalogStore>,
		auth: Arc<AdminAuth>,
		deletes: Arc<DeleteConfirmation>,
		assist: Option<Arc<AssistService>>,
		media: Option<Arc<MediaService>>,
		event_bus: event_bus::EventBus,
	) -> Self {
		let order_handler = Arc::new(OrderHandler::new(
			orders.clone(),
			catalog.clone(),
			config.tracker.artist_id.clone(),
		));
		Self {
			config,
			storage,
			orders,
			catalog,
			auth,
			deletes,
			order_handler,
			assist,
			media,
			event_bus,
		}
	}

	/// Merged catalog as currently offered.
	pub fn catalog(&self) -> Arc<Catalog> {
		self.catalog.current()
	}

	/// Replaces the stored catalog document.
	pub async fn save_catalog(&self, catalog: Catalog) -> Result<(), TrackerError> {
		self.catalog.save(catalog).await?;
		Ok(())
	}

	/// Applies one edit to the offered catalog and saves the result whole.
	pub async fn edit_catalog<F>(&self, edit: F) -> Result<Arc<Catalog>, TrackerError>
	where
		F: FnOnce(&mut Catalog) -> Result<(), CatalogError>,
	{
		let mut catalog = self
			.catalog
			.load_merged()
			.await
			.map_err(CatalogStoreError::from)?;
		edit(&mut catalog)?;
		self.catalog.save(catalog).await?;
		Ok(self.catalog.current())
	}

	pub async fn submit_intake(&self, request: &IntakeRequest) -> Result<(), TrackerError> {
		self.order_handler.submit_intake(request).await?;
		Ok(())
	}

	pub async fn create_manual(
		&self,
		artist_id: &str,
		request: &ManualOrderRequest,
	) -> Result<(), TrackerError> {
		self.order_handler.create_manual(artist_id, request).await?;
		Ok(())
	}

	/// Orders matching the query, newest first.
	pub fn list_orders(&self, query: &OrderQuery, is_admin: bool) -> Result<Vec<Order>, TrackerError> {
		let filter = query.status_filter().map_err(TrackerError::Invalid)?;
		let snapshot = self.orders.list();
		Ok(visible_orders(&snapshot, is_admin, query.search_term(), filter)
			.into_iter()
			.cloned()
			.collect())
	}

	pub fn stats(&self) -> OrderStats {
		order_stats(&self.orders.list())
	}

	pub fn progress(&self, order_id: &str) -> Result<OrderProgress, TrackerError> {
		let order = self.find(order_id)?;
		Ok(progress(&order))
	}

	pub async fn update_order(&self, order_id: &str, patch: &OrderPatch) -> Result<Order, TrackerError> {
		if patch.is_empty() {
			return Err(TrackerError::Invalid("No fields to update".into()));
		}
		Ok(self.orders.update_fields(order_id, patch).await?)
	}

	pub async fn advance(&self, order_id: &str) -> Result<Order, TrackerError> {
		Ok(self.orders.advance(order_id).await?)
	}

	pub async fn retreat(&self, order_id: &str) -> Result<Order, TrackerError> {
		Ok(self.orders.retreat(order_id).await?)
	}

	/// First call arms the confirmation; a second call inside the window
	/// deletes the order permanently.
	pub async fn request_delete(&self, order_id: &str) -> Result<DeleteResponse, TrackerError> {
		self.find(order_id)?;
		match self.deletes.request(order_id).await {
			DeleteDecision::Armed { expires_in } => {
				tracing::debug!(order_id = %truncate_id(order_id), "Delete armed");
				Ok(DeleteResponse::Armed {
					order_id: order_id.to_string(),
					expires_in_ms: expires_in.as_millis() as u64,
				})
			},
			DeleteDecision::Confirmed => {
				self.orders.delete(order_id).await?;
				Ok(DeleteResponse::Deleted {
					order_id: order_id.to_string(),
				})
			},
		}
	}

	pub async fn login(&self, password: &str) -> Result<AdminSession, TrackerError> {
		match self.auth.login(password).await {
			Ok(session) => {
				self.event_bus
					.publish(TrackerEvent::Session(SessionEvent::LoggedIn))
					.ok();
				Ok(session)
			},
			Err(e) => {
				self.event_bus
					.publish(TrackerEvent::Session(SessionEvent::Rejected))
					.ok();
				Err(e.into())
			},
		}
	}

	/// Returns the artist bound to a live admin session.
	pub async fn verify(&self, token: &str) -> Result<String, TrackerError> {
		Ok(self.auth.verify(token).await?)
	}

	pub async fn logout(&self, token: &str) -> bool {
		let removed = self.auth.logout(token).await;
		if removed {
			self.event_bus
				.publish(TrackerEvent::Session(SessionEvent::LoggedOut))
				.ok();
		}
		removed
	}

	pub async fn draft_client_update(&self, order_id: &str) -> Result<String, TrackerError> {
		let assist = self.assist.as_ref().ok_or(TrackerError::NotConfigured("assist"))?;
		let order = self.find(order_id)?;
		Ok(assist.draft_client_update(&order).await?)
	}

	pub async fn suggest_work_plan(&self, order_id: &str) -> Result<String, TrackerError> {
		let assist = self.assist.as_ref().ok_or(TrackerError::NotConfigured("assist"))?;
		let order = self.find(order_id)?;
		Ok(assist.suggest_work_plan(&order).await?)
	}

	/// Processes and stores an image, returning its public URL.
	pub async fn upload_image(&self, filename: &str, bytes: Vec<u8>) -> Result<String, TrackerError> {
		let media = self.media.as_ref().ok_or(TrackerError::NotConfigured("media"))?;
		Ok(media.upload(filename, bytes).await?)
	}

	fn find(&self, order_id: &str) -> Result<Order, TrackerError> {
		self.orders
			.get(order_id)
			.ok_or_else(|| OrderStoreError::NotFound(order_id.to_string()).into())
	}

	pub fn event_bus(&self) -> &event_bus::EventBus {
		&self.event_bus
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	pub fn orders(&self) -> &Arc<OrderStore> {
		&self.orders
	}

	pub fn catalog_store(&self) -> &Arc<CatalogStore> {
		&self.catalog
	}

	pub fn assist(&self) -> Option<&Arc<AssistService>> {
		self.assist.as_ref()
	}

	pub fn media(&self) -> Option<&Arc<MediaService>> {
		self.media.as_ref()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::builder::{TrackerBuilder, TrackerFactories};
	use tracker_config::builders::ConfigBuilder;
	use tracker_types::{Addon, OrderStatus, ProductVariant, StatusFilter, VariantSelection};

	async fn engine() -> TrackerEngine {
		let config = ConfigBuilder::new()
			.admin_password("hunter2")
			.with_mock_assist()
			.with_memory_media()
			.build();
		let factories = TrackerFactories {
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
		};
		let engine = TrackerBuilder::new(config).build(factories).unwrap();
		engine.initialize().await.unwrap();
		engine
	}

	fn query(search: &str, status: Option<&str>) -> OrderQuery {
		OrderQuery {
			search: Some(search.to_string()),
			status: status.map(String::from),
		}
	}

	#[tokio::test]
	async fn test_intake_appears_in_admin_feed() {
		let engine = engine().await;
		let request = IntakeRequest {
			selection: VariantSelection {
				category: "正方形".into(),
				variant: "10x10cm正方形".into(),
				addons: Vec::new(),
			},
			client_name: "阿月".into(),
			contact: Some("@moon".into()),
			notes: None,
		};
		engine.submit_intake(&request).await.unwrap();

		let hits = engine.list_orders(&query("阿月", None), false).unwrap();
		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].status, OrderStatus::Queued);
		let before = order_stats(&crate::samples::sample_orders());
		assert_eq!(engine.stats().queue, before.queue + 1);
		engine.shutdown().await.unwrap();
	}

	#[tokio::test]
	async fn test_public_listing_needs_search_term() {
		let engine = engine().await;
		assert!(engine.list_orders(&OrderQuery::default(), false).unwrap().is_empty());
		assert_eq!(engine.list_orders(&OrderQuery::default(), true).unwrap().len(), 4);
		assert!(matches!(
			engine.list_orders(&query("", Some("lost")), true),
			Err(TrackerError::Invalid(_))
		));
		assert_eq!(
			query("", Some("queued")).status_filter(),
			Ok(StatusFilter::Only(OrderStatus::Queued))
		);
		engine.shutdown().await.unwrap();
	}

	#[tokio::test]
	async fn test_delete_requires_confirmation() {
		let engine = engine().await;
		assert!(matches!(
			engine.request_delete("c-101").await.unwrap(),
			DeleteResponse::Armed { expires_in_ms: 3000, .. }
		));
		assert!(engine.orders().get("c-101").is_some());
		assert!(matches!(
			engine.request_delete("c-101").await.unwrap(),
			DeleteResponse::Deleted { .. }
		));
		assert!(engine.orders().get("c-101").is_none());
		assert!(matches!(
			engine.request_delete("c-101").await,
			Err(TrackerError::Orders(OrderStoreError::NotFound(_)))
		));
		engine.shutdown().await.unwrap();
	}

	#[tokio::test]
	async fn test_session_round_trip() {
		let engine = engine().await;
		let mut events = engine.event_bus().subscribe();
		assert!(matches!(
			engine.login("nope").await,
			Err(TrackerError::Auth(AuthError::InvalidPassword))
		));
		let session = engine.login("hunter2").await.unwrap();
		assert_eq!(engine.verify(&session.token).await.unwrap(), session.artist_id);
		assert!(engine.logout(&session.token).await);
		assert!(engine.verify(&session.token).await.is_err());

		assert!(matches!(
			events.recv().await.unwrap(),
			TrackerEvent::Session(SessionEvent::Rejected)
		));
		engine.shutdown().await.unwrap();
	}

	#[tokio::test]
	async fn test_catalog_edit_is_saved_whole() {
		let engine = engine().await;
		let catalog = engine
			.edit_catalog(|c| {
				c.add_variant(
					"圓形",
					ProductVariant::new("直徑12cm圓形", 400).with_addons(vec![Addon::new("特殊亮片", 50)]),
				)
			})
			.await
			.unwrap();
		assert!(catalog.variant("圓形", "直徑12cm圓形").is_some());

		let duplicate = engine
			.edit_catalog(|c| c.add_variant("圓形", ProductVariant::new("直徑12cm圓形", 1)))
			.await;
		assert!(matches!(
			duplicate,
			Err(TrackerError::CatalogEdit(CatalogError::DuplicateVariant { .. }))
		));
		engine.shutdown().await.unwrap();
	}

	#[tokio::test]
	async fn test_catalog_edit_keeps_default_categories() {
		let engine = engine().await;
		let mut stored = Catalog::new();
		stored.set_category("正方形", vec![ProductVariant::new("10x10cm正方形", 120)]);
		engine.save_catalog(stored).await.unwrap();
		let offered = engine.catalog().category("圓形").unwrap().len();
		assert_eq!(offered, 4);

		let catalog = engine
			.edit_catalog(|c| {
				c.update_variant("圓形", "5cm圓形", ProductVariant::new("5cm圓形", 130))
			})
			.await
			.unwrap();
		assert_eq!(catalog.variant("圓形", "5cm圓形").unwrap().price, 130);

		let catalog = engine
			.edit_catalog(|c| c.add_variant("圓形", ProductVariant::new("12cm圓形", 260)))
			.await
			.unwrap();
		let names: Vec<_> = catalog
			.category("圓形")
			.unwrap()
			.iter()
			.map(|v| v.name.as_str())
			.collect();
		assert_eq!(names, ["5cm圓形", "6cm圓形", "8cm圓形", "10cm圓形", "12cm圓形"]);
		engine.shutdown().await.unwrap();
	}

	#[tokio::test]
	async fn test_assist_and_progress() {
		let engine = engine().await;
		let progress = engine.progress("c-101").unwrap();
		assert_eq!(progress.status, OrderStatus::InProduction);
		assert!(progress.can_advance);

		let draft = engine.draft_client_update("c-101").await.unwrap();
		assert!(!draft.is_empty());
		assert!(matches!(
			engine.suggest_work_plan("missing").await,
			Err(TrackerError::Orders(OrderStoreError::NotFound(_)))
		));
		engine.shutdown().await.unwrap();
	}

	#[tokio::test]
	async fn test_empty_patch_is_rejected() {
		let engine = engine().await;
		assert!(matches!(
			engine.update_order("c-101", &OrderPatch::default()).await,
			Err(TrackerError::Invalid(_))
		));
		let moved = engine.advance("c-101").await.unwrap();
		assert_eq!(moved.status, OrderStatus::Completed);
		engine.shutdown().await.unwrap();
	}
}
