//! Sync engine: the single writer of alias state.
//!
//! The `SyncEngine` runs fetch, extract, resolve and persist cycles against the
//! registration address. Each cycle works on a copy of the candidate pool and only
//! replaces the engine's state once the new snapshot is saved, so an aborted or
//! cancelled cycle leaves both the store and the published snapshot untouched.
//!
//! Cycles are started through a `SyncTrigger`. Triggers that arrive while a cycle runs
//! collapse into a single follow-up cycle.

use super::events::{EventDispatcher, SyncEvent, SyncEventHandler};
use super::fetcher::HistoryFetcher;
use super::pool::CandidatePool;
use super::progress_tracker::{SyncProgressTracker, SyncStats};
use super::retry::with_retry;
use super::types::{AliasSnapshot, ServerState, SyncError, SyncState};
use crate::alias::{CandidateExtractor, ReservedAliases, resolve};
use crate::config::{ConfigError, IndexerConfig, RetryPolicy};
use crate::directory::AliasDirectory;
use crate::indexer::{BlockchainInfo, FinalityOracle, LedgerIndexer};
use crate::store::StateStore;

use std::sync::Arc;
use tokio::sync::{Notify, watch};
use tracing::{debug, info};

/// Wakes the engine for another cycle.
///
/// Cloneable; any number of clones may fire concurrently. At most one wake-up is
/// stored while a cycle runs.
#[derive(Debug, Clone, Default)]
pub struct SyncTrigger {
	notify: Arc<Notify>,
}

impl SyncTrigger {
	pub fn new() -> Self {
		Self::default()
	}

	/// Request a cycle.
	pub fn trigger(&self) {
		self.notify.notify_one();
	}

	/// Wait for the next request.
	pub async fn notified(&self) {
		self.notify.notified().await;
	}
}

/// Outcome of a successful cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
	pub server_state: ServerState,
	pub stats: SyncStats,
	/// Aliases that entered the Valid map this cycle.
	pub newly_registered: Vec<String>,
	/// Aliases that entered the Pending map this cycle.
	pub newly_pending: Vec<String>,
}

pub struct SyncEngine {
	fetcher: HistoryFetcher,
	finality: Arc<dyn FinalityOracle>,
	store: Arc<dyn StateStore>,
	extractor: CandidateExtractor,
	reserved: ReservedAliases,
	retry: RetryPolicy,
	pending_expiration_blocks: u64,

	pool: CandidatePool,
	server_state: ServerState,
	state: SyncState,
	dispatcher: EventDispatcher,
	snapshot_tx: watch::Sender<Arc<AliasSnapshot>>,
}

impl SyncEngine {
	pub fn new(
		indexer: Arc<dyn LedgerIndexer>,
		finality: Arc<dyn FinalityOracle>,
		store: Arc<dyn StateStore>,
		config: &IndexerConfig,
	) -> Result<Self, SyncError> {
		let prices = config.price_table().map_err(ConfigError::from)?;
		let extractor =
			CandidateExtractor::new(&config.registration_address, prices, config.address_prefix.clone());
		let fetcher = HistoryFetcher::new(
			indexer,
			config.registration_address,
			config.history_page_size,
			config.retry.clone(),
		);
		let server_state = config.initial_server_state;
		let (snapshot_tx, _) = watch::channel(Arc::new(AliasSnapshot::empty(server_state)));

		Ok(Self {
			fetcher,
			finality,
			store,
			extractor,
			reserved: config.reserved_aliases.clone(),
			retry: config.retry.clone(),
			pending_expiration_blocks: config.pending_expiration_blocks,
			pool: CandidatePool::new(),
			server_state,
			state: SyncState::Idle,
			dispatcher: EventDispatcher::new(),
			snapshot_tx,
		})
	}

	pub fn register_handler(&mut self, handler: Box<dyn SyncEventHandler>) {
		self.dispatcher.register_handler(handler);
	}

	pub fn state(&self) -> SyncState {
		self.state
	}

	pub fn server_state(&self) -> ServerState {
		self.server_state
	}

	/// Read handle over the last published snapshot.
	pub fn directory(&self) -> AliasDirectory {
		AliasDirectory::new(self.snapshot_tx.subscribe())
	}

	/// Load the persisted snapshot, if any, and publish it.
	pub async fn restore(&mut self) -> Result<(), SyncError> {
		let loaded = with_retry(&self.retry, "Loading alias state", || self.store.load_state()).await?;

		let snapshot = match loaded {
			Some(snapshot) => {
				info!(
					"Restored {} valid and {} pending aliases, continuing from height {}",
					snapshot.valid.len(),
					snapshot.pending.len(),
					snapshot.server_state.processed_blockheight
				);
				self.pool = CandidatePool::from_snapshot(&snapshot);
				self.server_state = snapshot.server_state;
				snapshot
			}
			None => {
				info!(
					"No persisted alias state, starting from height {}",
					self.server_state.processed_blockheight
				);
				AliasSnapshot::empty(self.server_state)
			}
		};
		self.snapshot_tx.send_replace(Arc::new(snapshot));
		Ok(())
	}

	/// Run one fetch, resolve and persist cycle.
	///
	/// On error nothing is persisted or published and the cursor stays where it was.
	pub async fn run_cycle(&mut self) -> Result<CycleReport, SyncError> {
		let cursor = self.server_state.processed_blockheight;
		self.dispatcher
			.dispatch(&SyncEvent::CycleStarted {
				processed_blockheight: cursor,
			})
			.await;

		let (snapshot, previous, stats) = match self.try_cycle(cursor).await {
			Ok(outcome) => outcome,
			Err(e) => {
				let retryable = e.is_retryable();
				self.state = SyncState::Failed { retryable };
				debug!("Sync cycle from height {} aborted: {}", cursor, e);
				self.dispatcher
					.dispatch(&SyncEvent::CycleFailed {
						error: e.to_string(),
						retryable,
					})
					.await;
				return Err(e);
			}
		};
		self.state = SyncState::Idle;

		let mut newly_registered = Vec::new();
		for (alias, valid) in &snapshot.valid {
			if previous.valid.get(alias).is_none_or(|old| old.txid != valid.txid) {
				newly_registered.push(alias.clone());
				self.dispatcher
					.dispatch(&SyncEvent::AliasRegistered(valid.clone()))
					.await;
			}
		}
		let mut newly_pending = Vec::new();
		for (alias, pending) in &snapshot.pending {
			if previous.pending.get(alias).is_none_or(|old| old.txid != pending.txid) {
				newly_pending.push(alias.clone());
				self.dispatcher
					.dispatch(&SyncEvent::AliasPending(pending.clone()))
					.await;
			}
		}

		self.dispatcher
			.dispatch(&SyncEvent::CycleCompleted {
				server_state: snapshot.server_state,
				stats: stats.clone(),
			})
			.await;

		Ok(CycleReport {
			server_state: snapshot.server_state,
			stats,
			newly_registered,
			newly_pending,
		})
	}

	async fn try_cycle(
		&mut self,
		cursor: u64,
	) -> Result<(Arc<AliasSnapshot>, Arc<AliasSnapshot>, SyncStats), SyncError> {
		self.state = SyncState::Fetching;
		let mut tracker = SyncProgressTracker::new(cursor);

		let tip = self.fetcher.tip().await?;
		let finalized_height = self.finalized_height(&tip, cursor).await?;
		tracker.record_tip(tip.tip_height, finalized_height);

		let txs = self.fetcher.fetch_since(cursor).await?;
		tracker.record_fetched(txs.len());

		self.state = SyncState::Resolving;
		let mut pool = self.pool.clone();
		let outcome = pool.ingest(&txs, &self.extractor, cursor, tip.tip_height, finalized_height);
		tracker.record_ingested(outcome.confirmed_transactions, outcome.candidates);
		tracker.record_expired(pool.expire_stale(tip.tip_height, self.pending_expiration_blocks));
		tracker.log_progress();

		let resolution = resolve(&pool.candidates(), &self.reserved);
		let server_state = ServerState {
			processed_blockheight: finalized_height,
			processed_confirmed_tx_count: self.server_state.processed_confirmed_tx_count
				+ outcome.confirmed_transactions,
		};
		let snapshot = AliasSnapshot {
			valid: resolution.valid,
			pending: resolution.pending,
			server_state,
			first_seen: pool.first_seen_heights(),
		};

		self.state = SyncState::Persisting;
		with_retry(&self.retry, "Saving alias state", || self.store.save_state(&snapshot)).await?;

		self.pool = pool;
		self.server_state = server_state;
		let snapshot = Arc::new(snapshot);
		let previous = self.snapshot_tx.send_replace(snapshot.clone());
		let stats = tracker.finish(snapshot.valid.len(), snapshot.pending.len());
		Ok((snapshot, previous, stats))
	}

	/// Highest height whose candidates may be treated as permanent.
	///
	/// Only the tip is checked: a final tip finalizes everything below it, otherwise the
	/// cursor stays put until a later tip is final.
	async fn finalized_height(&self, tip: &BlockchainInfo, cursor: u64) -> Result<u64, SyncError> {
		if tip.tip_height <= cursor {
			return Ok(cursor);
		}
		let is_final = with_retry(&self.retry, "Checking block finality", || {
			self.finality.is_final(&tip.tip_hash)
		})
		.await?;
		if !is_final {
			debug!(
				"Tip {} at height {} is not final yet",
				tip.tip_hash, tip.tip_height
			);
			return Ok(cursor);
		}
		Ok(tip.tip_height)
	}

	/// Run cycles on every trigger until `shutdown` completes.
	///
	/// A cycle still running at shutdown is dropped; nothing from it is persisted and
	/// the engine is left `Idle`.
	pub async fn run<F>(&mut self, trigger: SyncTrigger, shutdown: F)
	where
		F: Future<Output = ()>,
	{
		tokio::pin!(shutdown);
		info!(
			"Sync engine running from height {}",
			self.server_state.processed_blockheight
		);

		loop {
			tokio::select! {
				_ = &mut shutdown => break,
				_ = trigger.notified() => {}
			}

			tokio::select! {
				_ = &mut shutdown => {
					info!("Shutdown requested, cancelling in-flight sync cycle");
					break;
				}
				result = self.run_cycle() => {
					if let Err(e) = result {
						debug!("Waiting for next trigger after failed cycle: {}", e);
					}
				}
			}
		}

		if self.state.is_active() {
			self.state = SyncState::Idle;
		}
		info!("Sync engine stopped");
	}
}
