//! Progress tracking for sync cycles.
//!
//! This module provides the `SyncProgressTracker`, which records what one cycle fetched,
//! extracted, expired and resolved, and turns that into a `SyncStats` summary for logs
//! and events.

use std::time::{Duration, Instant};
use tracing::debug;

/// Per-cycle counters, created when a cycle starts.
#[derive(Debug, Clone)]
pub struct SyncProgressTracker {
	/// Cursor the cycle started from
	start_height: u64,
	tip_height: u64,
	finalized_height: u64,
	transactions_fetched: usize,
	confirmed_transactions: u64,
	candidates_extracted: usize,
	candidates_expired: usize,
	started_at: Instant,
}

impl SyncProgressTracker {
	pub fn new(start_height: u64) -> Self {
		Self {
			start_height,
			tip_height: start_height,
			finalized_height: start_height,
			transactions_fetched: 0,
			confirmed_transactions: 0,
			candidates_extracted: 0,
			candidates_expired: 0,
			started_at: Instant::now(),
		}
	}

	/// Record the tip and how much of it is final.
	pub fn record_tip(&mut self, tip_height: u64, finalized_height: u64) {
		self.tip_height = tip_height;
		self.finalized_height = finalized_height;
	}

	pub fn record_fetched(&mut self, count: usize) {
		self.transactions_fetched += count;
	}

	pub fn record_ingested(&mut self, confirmed_transactions: u64, candidates: usize) {
		self.confirmed_transactions += confirmed_transactions;
		self.candidates_extracted += candidates;
	}

	pub fn record_expired(&mut self, count: usize) {
		self.candidates_expired += count;
	}

	/// Close the cycle with the size of the resolved state.
	pub fn finish(&self, valid_aliases: usize, pending_aliases: usize) -> SyncStats {
		SyncStats {
			start_height: self.start_height,
			tip_height: self.tip_height,
			finalized_height: self.finalized_height,
			transactions_fetched: self.transactions_fetched,
			confirmed_transactions: self.confirmed_transactions,
			candidates_extracted: self.candidates_extracted,
			candidates_expired: self.candidates_expired,
			valid_aliases,
			pending_aliases,
			elapsed: self.started_at.elapsed(),
		}
	}

	/// Log what the cycle has done so far.
	pub fn log_progress(&self) {
		debug!(
			"Sync progress: {} transactions fetched, {} candidates extracted above height {}",
			self.transactions_fetched, self.candidates_extracted, self.start_height
		);
	}
}

/// Statistics about one completed cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStats {
	pub start_height: u64,
	pub tip_height: u64,
	pub finalized_height: u64,
	pub transactions_fetched: usize,
	pub confirmed_transactions: u64,
	pub candidates_extracted: usize,
	pub candidates_expired: usize,
	pub valid_aliases: usize,
	pub pending_aliases: usize,
	pub elapsed: Duration,
}

impl SyncStats {
	/// Get a human-readable summary of the sync statistics
	pub fn summary(&self) -> String {
		format!(
			"Sync from {} to {} (tip {}): {} transactions, {} confirmed, {} candidates, {} valid, {} pending{} in {:?}",
			self.start_height,
			self.finalized_height,
			self.tip_height,
			self.transactions_fetched,
			self.confirmed_transactions,
			self.candidates_extracted,
			self.valid_aliases,
			self.pending_aliases,
			if self.candidates_expired == 0 {
				String::new()
			} else {
				format!(" ({} expired)", self.candidates_expired)
			},
			self.elapsed
		)
	}
}
