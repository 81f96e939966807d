use crate::alias::{PendingAlias, ValidAlias, prices::ALIAS_ACTIVATION_HEIGHT};
use crate::config::ConfigError;
use crate::indexer::IndexerError;
use crate::store::StoreError;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sync cursor.
///
/// All confirmed history at heights up to `processed_blockheight` is reflected in the
/// persisted alias state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerState {
	pub processed_blockheight: u64,
	pub processed_confirmed_tx_count: u64,
}

impl Default for ServerState {
	fn default() -> Self {
		Self {
			processed_blockheight: ALIAS_ACTIVATION_HEIGHT - 1,
			processed_confirmed_tx_count: 0,
		}
	}
}

/// One published view of the alias state. Stored and served as a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasSnapshot {
	pub valid: BTreeMap<String, ValidAlias>,
	pub pending: BTreeMap<String, PendingAlias>,
	pub server_state: ServerState,
	/// Tip height at which each outstanding unconfirmed txid was first seen, expired
	/// ones included.
	#[serde(default)]
	pub first_seen: BTreeMap<String, u64>,
}

impl AliasSnapshot {
	pub fn empty(server_state: ServerState) -> Self {
		Self {
			valid: BTreeMap::new(),
			pending: BTreeMap::new(),
			server_state,
			first_seen: BTreeMap::new(),
		}
	}
}

/// Where the engine is in its cycle.
///
/// `Idle` and `Failed` are both resting states: the engine waits for the next
/// trigger in either, and the next cycle starts from the same cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
	Idle,
	Fetching,
	Resolving,
	Persisting,
	/// Idle after an aborted cycle; the cursor was not advanced.
	Failed { retryable: bool },
}

impl SyncState {
	/// Whether a cycle is currently in flight.
	pub fn is_active(&self) -> bool {
		matches!(
			self,
			SyncState::Fetching | SyncState::Resolving | SyncState::Persisting
		)
	}
}

#[allow(clippy::enum_variant_names)]
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
	#[error("Indexer error: {0}")]
	IndexerError(#[from] IndexerError),

	#[error("Store error: {0}")]
	StoreError(#[from] StoreError),

	#[error("Config error: {0}")]
	ConfigError(#[from] ConfigError),
}

impl SyncError {
	/// Transient infrastructure failures worth another attempt on the next trigger.
	pub fn is_retryable(&self) -> bool {
		match self {
			SyncError::IndexerError(e) => e.is_transient(),
			SyncError::StoreError(e) => e.is_transient(),
			SyncError::ConfigError(_) => false,
		}
	}
}
