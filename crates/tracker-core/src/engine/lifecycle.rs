//! Startup and shutdown of the tracker engine.

use super::{TrackerEngine, TrackerError};
use crate::stores::SyncStatus;

impl TrackerEngine {
	/// Connects both stores to storage. A failing backend leaves the engine
	/// serving fallback data, so this only errors on programming mistakes.
	pub async fn initialize(&self) -> Result<(), TrackerError> {
		tracing::info!(tracker_id = %self.config.tracker.id, "Initializing tracker engine");

		match self.orders.connect().await {
			SyncStatus::Live { seeded, orders } => {
				tracing::info!(orders, seeded, "Orders loaded")
			},
			SyncStatus::Fallback { reason } => {
				tracing::warn!(%reason, "Serving sample orders until storage recovers")
			},
		}

		if let Err(e) = self.catalog.load().await {
			tracing::warn!(error = %e, "Serving default catalog until storage recovers");
		}
		Ok(())
	}

	/// Stops the background sync tasks.
	pub async fn shutdown(&self) -> Result<(), TrackerError> {
		tracing::info!("Shutting down tracker engine");
		self.orders.shutdown().await;
		self.catalog.shutdown().await;
		Ok(())
	}
}
