use std::sync::Arc;

use anyhow::Context;
use motion::{EventStore, Monitor};
use stores::{FirestoreStore, TelegramStore};
use tracing::{debug, info, warn};

use crate::{
	config::{Config, StoreConfig},
	feed::SensorFeed,
};

mod config;
mod feed;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.init();

	info!("✅ Starting pothole scanner");

	let config = Config::load("config.toml").context("Failed to load configuration")?;
	info!("✅ Configuration loaded");

	let store = build_store(&config.store).await?;
	info!("✅ {} store initialized", store.name());

	let feed = SensorFeed::new(config.sensor.clone());
	let mut monitor = Monitor::start(config.monitor_config(), &feed, &feed, store).await?;
	info!("✅ Monitoring {}", config.sensor.ws_url);

	let shutdown = tokio::signal::ctrl_c();
	tokio::pin!(shutdown);

	loop {
		tokio::select! {
			result = &mut shutdown => {
				result.context("Failed to listen for shutdown signal")?;
				info!("Shutdown requested");
				break;
			},
			outcome = monitor.next_outcome() => match outcome {
				Some(Ok(record)) => debug!(?record, "Report stored"),
				Some(Err(e)) => warn!("Pothole went unreported: {e:#}"),
				None => {
					warn!("Monitoring ended on its own");
					break;
				},
			},
		}
	}

	monitor.stop().await
}

async fn build_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn EventStore>> {
	match config {
		StoreConfig::Firestore(firestore) => Ok(Arc::new(FirestoreStore::new(firestore.clone()))),
		StoreConfig::Telegram(telegram) => {
			let store = TelegramStore::new(telegram.clone());
			store.test_connection().await.context("Please verify your bot token and chat ID in config.toml")?;
			Ok(Arc::new(store))
		},
	}
}
