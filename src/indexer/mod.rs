//! Ledger indexer integration module
//!
//! This module provides the clients and types for reading the registration address
//! history from a chronik-style indexer and for asking an avalanche node whether a
//! block is final. The sync engine only sees the two traits below, so tests and
//! alternative backends can stand in for the network clients.

/// HTTP and WebSocket client for the indexer
mod client;
/// JSON-RPC client for block finality
mod finality;
/// Type definitions for indexer data structures
mod types;

pub use client::ChronikIndexerClient;
pub use finality::AvalancheRpcClient;
pub use types::*;

use crate::alias::AliasAddress;

/// Read access to address history and the chain tip.
#[async_trait::async_trait]
pub trait LedgerIndexer: Send + Sync {
	/// Fetch the current chain tip.
	async fn blockchain_info(&self) -> Result<BlockchainInfo, IndexerError>;

	/// Fetch one page of history for `address`, newest transactions first.
	async fn history_page(
		&self,
		address: &AliasAddress,
		page: usize,
		page_size: usize,
	) -> Result<HistoryPage, IndexerError>;
}

/// Reports whether a block can no longer be reorganized.
#[async_trait::async_trait]
pub trait FinalityOracle: Send + Sync {
	async fn is_final(&self, block_hash: &str) -> Result<bool, IndexerError>;
}
