//! Paginated retrieval of the registration address history.

use super::retry::with_retry;
use super::types::SyncError;
use crate::alias::AliasAddress;
use crate::config::RetryPolicy;
use crate::indexer::{BlockchainInfo, LedgerIndexer, RawTx};

use std::sync::Arc;
use tracing::debug;

/// Walks address history newest first, down to the sync cursor.
#[derive(Clone)]
pub struct HistoryFetcher {
	indexer: Arc<dyn LedgerIndexer>,
	address: AliasAddress,
	page_size: usize,
	retry: RetryPolicy,
}

impl HistoryFetcher {
	pub fn new(indexer: Arc<dyn LedgerIndexer>, address: AliasAddress, page_size: usize, retry: RetryPolicy) -> Self {
		Self {
			indexer,
			address,
			page_size,
			retry,
		}
	}

	/// Current chain tip.
	pub async fn tip(&self) -> Result<BlockchainInfo, SyncError> {
		with_retry(&self.retry, "Fetching chain tip", || self.indexer.blockchain_info()).await
	}

	/// Every unconfirmed transaction and every confirmed one mined above `cursor`.
	///
	/// Pages are requested from the newest; paging stops after the first page that
	/// reaches back to `cursor`, since everything older is already processed. Each
	/// page is retried on its own. If any page ultimately fails the pages fetched so
	/// far are dropped with it.
	pub async fn fetch_since(&self, cursor: u64) -> Result<Vec<RawTx>, SyncError> {
		let mut txs = Vec::new();
		let mut page_number = 0;

		loop {
			let page = with_retry(&self.retry, "Fetching history page", || {
				self.indexer.history_page(&self.address, page_number, self.page_size)
			})
			.await?;

			let reached_cursor = page
				.txs
				.iter()
				.any(|tx| tx.block_height().is_some_and(|height| height <= cursor));

			txs.extend(
				page.txs
					.into_iter()
					.filter(|tx| tx.block_height().is_none_or(|height| height > cursor)),
			);

			page_number += 1;
			if reached_cursor || page_number >= page.num_pages {
				break;
			}
		}

		debug!(
			"Fetched {} transactions above height {} in {} pages",
			txs.len(),
			cursor,
			page_number
		);
		Ok(txs)
	}
}
