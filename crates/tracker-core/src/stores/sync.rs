//! Background re-read task shared by the stores.

use async_trait::async_trait;
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracker_storage::StorageChange;
use tracker_types::StorageKey;

/// A store whose snapshot can be rebuilt from storage.
#[async_trait]
pub(crate) trait Reload: Send + Sync + 'static {
	/// Collection whose changes trigger a reload.
	const COLLECTION: StorageKey;

	async fn reload(&self);
}

async fn tick(ticker: &mut Option<Interval>) {
	match ticker {
		Some(interval) => {
			interval.tick().await;
		},
		None => std::future::pending().await,
	}
}

/// Spawns the reload loop. It ends when the store is dropped or the change
/// channel closes.
pub(crate) fn spawn_sync<S: Reload>(
	store: Weak<S>,
	mut changes: broadcast::Receiver<StorageChange>,
	poll_interval: Option<Duration>,
) -> JoinHandle<()> {
	let mut ticker = poll_interval.map(|period| {
		let mut interval = tokio::time::interval(period);
		interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
		interval
	});

	tokio::spawn(async move {
		// The first tick fires immediately and the store has just loaded.
		if let Some(interval) = ticker.as_mut() {
			interval.tick().await;
		}
		loop {
			let reload = tokio::select! {
				change = changes.recv() => match change {
					Ok(change) => change.namespace == S::COLLECTION.as_str(),
					Err(RecvError::Lagged(skipped)) => {
						tracing::debug!(collection = S::COLLECTION.as_str(), skipped, "Sync lagged, reloading");
						true
					},
					Err(RecvError::Closed) => break,
				},
				_ = tick(&mut ticker) => true,
			};
			if !reload {
				continue;
			}
			let Some(store) = store.upgrade() else {
				break;
			};
			store.reload().await;
		}
	})
}
