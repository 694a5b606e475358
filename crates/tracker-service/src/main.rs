//! Main entry point for the commission tracker service.
//!
//! Loads the configuration, builds the tracker engine from the configured
//! backends and serves the HTTP API until interrupted.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracker_config::Config;
use tracker_core::EventBus;
use tracker_types::{OrderEvent, TrackerEvent};

mod apis;
mod factory_registry;
mod server;

/// Command-line arguments for the tracker service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/tracker.toml", env = "TRACKER_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started commission tracker");

	let config = Config::from_file(&args.config.to_string_lossy()).await?;
	tracing::info!("Loaded configuration [{}]", config.tracker.id);

	let engine = Arc::new(factory_registry::build_tracker_from_config(config.clone())?);
	let event_logger = spawn_event_logger(engine.event_bus());
	engine.initialize().await?;

	match config.api.clone().filter(|api| api.enabled) {
		Some(api_config) => {
			tokio::select! {
				result = server::start_server(api_config, Arc::clone(&engine)) => {
					tracing::info!("API server finished");
					result?;
				}
				_ = tokio::signal::ctrl_c() => {
					tracing::info!("Received shutdown signal");
				}
			}
		},
		None => {
			tracing::warn!("API disabled; keeping stores in sync until interrupted");
			tokio::signal::ctrl_c().await?;
		},
	}

	engine.shutdown().await?;
	event_logger.abort();
	tracing::info!("Stopped commission tracker");
	Ok(())
}

/// Logs engine events as they happen.
fn spawn_event_logger(event_bus: &EventBus) -> tokio::task::JoinHandle<()> {
	let mut events = event_bus.subscribe();
	tokio::spawn(async move {
		loop {
			match events.recv().await {
				Ok(TrackerEvent::StorageDegraded { collection, reason }) => {
					tracing::warn!(%collection, %reason, "Storage degraded")
				},
				Ok(TrackerEvent::Order(OrderEvent::Seeded { count })) => {
					tracing::info!(count, "Seeded sample orders")
				},
				Ok(event) => tracing::debug!(?event, "Event"),
				Err(RecvError::Lagged(skipped)) => {
					tracing::debug!(skipped, "Event logger lagged")
				},
				Err(RecvError::Closed) => break,
			}
		}
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_args_default_values() {
		let args = Args::parse_from(["tracker"]);
		assert_eq!(args.config, PathBuf::from("config/tracker.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_args_custom_values() {
		let args = Args::parse_from(["tracker", "-c", "custom.toml", "-l", "debug"]);
		assert_eq!(args.config, PathBuf::from("custom.toml"));
		assert_eq!(args.log_level, "debug");
	}

	#[tokio::test]
	async fn test_sample_config_builds() {
		let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/tracker.toml");
		std::env::set_var("TRACKER_ADMIN_PASSWORD", "test-password");
		let config = Config::from_file(path).await.unwrap();
		let engine = factory_registry::build_tracker_from_config(config).unwrap();
		assert_eq!(engine.config().tracker.id, "commission-tracker");
	}
}
