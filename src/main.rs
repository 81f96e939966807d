use alias_indexer::alias::AliasAddress;
use alias_indexer::config::{CONFIG_PATH_ENV, IndexerConfig};
use alias_indexer::indexer::{AvalancheRpcClient, BlockEvent, ChronikIndexerClient};
use alias_indexer::store::FileStateStore;
use alias_indexer::sync::{LoggingEventHandler, SyncEngine, SyncError, SyncTrigger};

use futures_util::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	info!("Starting alias indexer");

	let config_path = std::env::args()
		.nth(1)
		.or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
		.map(PathBuf::from);

	let config = match IndexerConfig::load(config_path.as_deref()) {
		Ok(config) => config,
		Err(e) => {
			error!("Failed to load configuration: {}", e);
			std::process::exit(1);
		}
	};

	if let Err(e) = run(config).await {
		error!("Alias indexer stopped: {}", e);
		std::process::exit(1);
	}
}

async fn run(config: IndexerConfig) -> Result<(), SyncError> {
	let indexer_client = Arc::new(ChronikIndexerClient::new(
		config.chronik_url.clone(),
		config.chronik_ws_url.clone(),
	)?);
	let finality_client = Arc::new(AvalancheRpcClient::new(config.avalanche_rpc.clone())?);
	let store = Arc::new(FileStateStore::new(config.data_dir.clone()));

	info!("Created indexer and finality clients");

	let mut engine = SyncEngine::new(indexer_client.clone(), finality_client, store, &config)?;
	engine.register_handler(Box::new(LoggingEventHandler));
	engine.restore().await?;

	info!(
		"Indexing alias registrations paid to {}",
		config.registration_address.to_cashaddr(&config.address_prefix)
	);

	let trigger = SyncTrigger::new();
	trigger.trigger();

	let subscription = tokio::spawn(follow_events(
		indexer_client,
		config.registration_address,
		config.ws_reconnect_delay(),
		trigger.clone(),
	));
	let poller = tokio::spawn(poll(config.poll_interval(), trigger.clone()));

	engine.run(trigger, shutdown_signal()).await;

	subscription.abort();
	poller.abort();
	Ok(())
}

/// Trigger a cycle on every block and mempool event, reconnecting when the stream drops.
async fn follow_events(
	client: Arc<ChronikIndexerClient>,
	address: AliasAddress,
	reconnect_delay: Duration,
	trigger: SyncTrigger,
) {
	loop {
		match client.subscribe_events(&address).await {
			Ok(mut events) => {
				while let Some(event) = events.next().await {
					match event {
						Ok(BlockEvent::BlockConnected {
							block_hash,
							block_height,
						}) => {
							debug!("Block {} connected at height {}", block_hash, block_height);
							trigger.trigger();
						}
						Ok(BlockEvent::AddedToMempool { txid }) => {
							debug!("Registration address tx {} entered the mempool", txid);
							trigger.trigger();
						}
						Ok(BlockEvent::RemovedFromMempool { txid }) => {
							debug!("Registration address tx {} left the mempool", txid);
							trigger.trigger();
						}
						Err(e) => {
							warn!("Event subscription error: {}", e);
							break;
						}
					}
				}
				warn!("Event stream ended, reconnecting in {:?}", reconnect_delay);
			}
			Err(e) => {
				warn!(
					"Failed to subscribe to indexer events, retrying in {:?}: {}",
					reconnect_delay, e
				);
			}
		}
		tokio::time::sleep(reconnect_delay).await;
	}
}

/// Trigger a cycle every `period` in case events are missed.
async fn poll(period: Duration, trigger: SyncTrigger) {
	let mut interval = tokio::time::interval(period);
	interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
	// the first tick completes immediately and startup already triggered
	interval.tick().await;
	loop {
		interval.tick().await;
		trigger.trigger();
	}
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		error!("Failed to listen for shutdown signal: {}", e);
		std::future::pending::<()>().await;
	}
	info!("Received shutdown signal");
}
