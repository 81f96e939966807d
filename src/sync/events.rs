//! Event system for alias synchronization.
//!
//! The engine reports what each cycle did through `SyncEvent`s. Handlers registered on the
//! `EventDispatcher` receive every event; they are how notification and monitoring hook
//! into the sync loop without the engine knowing about them.

use super::progress_tracker::SyncStats;
use super::types::{ServerState, SyncError};
use crate::alias::{PendingAlias, ValidAlias};

use tracing::{info, warn};

/// Events that occur during alias synchronization
#[derive(Debug, Clone)]
pub enum SyncEvent {
	/// A cycle started from the given cursor
	CycleStarted { processed_blockheight: u64 },
	/// An alias entered the Valid map
	AliasRegistered(ValidAlias),
	/// An alias entered the Pending map
	AliasPending(PendingAlias),
	/// A cycle was persisted and published
	CycleCompleted {
		server_state: ServerState,
		stats: SyncStats,
	},
	/// A cycle aborted without changing any state
	CycleFailed { error: String, retryable: bool },
}

/// Trait for handling sync events.
#[async_trait::async_trait]
pub trait SyncEventHandler: Send + Sync {
	/// Handle a sync event.
	///
	/// Called for every event the engine dispatches. A failure is logged and does not
	/// affect the cycle or other handlers.
	async fn handle(&mut self, event: &SyncEvent) -> Result<(), SyncError>;

	/// Get the name of this handler for logging and diagnostics.
	fn name(&self) -> &'static str;
}

/// Event dispatcher that manages multiple event handlers.
#[derive(Default)]
pub struct EventDispatcher {
	handlers: Vec<Box<dyn SyncEventHandler>>,
}

impl EventDispatcher {
	/// Create a new, empty event dispatcher.
	pub fn new() -> Self {
		Self {
			handlers: Vec::new(),
		}
	}

	/// Register a new event handler.
	///
	/// Handlers are called in the order they are registered.
	pub fn register_handler(&mut self, handler: Box<dyn SyncEventHandler>) {
		self.handlers.push(handler);
	}

	pub fn handler_count(&self) -> usize {
		self.handlers.len()
	}

	/// Dispatch an event to all registered handlers.
	pub async fn dispatch(&mut self, event: &SyncEvent) {
		for handler in &mut self.handlers {
			if let Err(e) = handler.handle(event).await {
				tracing::error!("Handler {} failed to process event: {}", handler.name(), e);
			}
		}
	}
}

/// Logs every event.
pub struct LoggingEventHandler;

#[async_trait::async_trait]
impl SyncEventHandler for LoggingEventHandler {
	async fn handle(&mut self, event: &SyncEvent) -> Result<(), SyncError> {
		match event {
			SyncEvent::CycleStarted {
				processed_blockheight,
			} => {
				tracing::debug!("Sync cycle started from height {}", processed_blockheight);
			}
			SyncEvent::AliasRegistered(alias) => {
				info!(
					"Alias registered: {} -> {} (tx {} at height {})",
					alias.alias, alias.address, alias.txid, alias.blockheight
				);
			}
			SyncEvent::AliasPending(alias) => {
				info!(
					"Alias pending: {} -> {} (tx {})",
					alias.alias, alias.address, alias.txid
				);
			}
			SyncEvent::CycleCompleted {
				server_state,
				stats,
			} => {
				info!(
					"{}; {} confirmed transactions processed in total",
					stats.summary(),
					server_state.processed_confirmed_tx_count
				);
			}
			SyncEvent::CycleFailed { error, retryable } => {
				if *retryable {
					warn!("Sync cycle failed, will retry on next trigger: {}", error);
				} else {
					tracing::error!("Sync cycle failed: {}", error);
				}
			}
		}
		Ok(())
	}

	fn name(&self) -> &'static str {
		"logging"
	}
}
