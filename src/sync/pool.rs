//! The candidate set the resolver runs over.
//!
//! Confirmed candidates from final blocks only ever accumulate. Everything else (mempool
//! transactions and transactions mined above the finalized height) is rebuilt from each
//! fetch, since mempool content can vanish and non-final blocks can be reorganized.

use crate::alias::{AliasCandidate, CandidateExtractor};
use crate::indexer::RawTx;
use crate::sync::AliasSnapshot;

use std::collections::{BTreeMap, HashMap, HashSet};

/// Counts from merging one fetch into the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOutcome {
	/// Transactions newly processed from final blocks.
	pub confirmed_transactions: u64,
	/// Candidates extracted from the fetch, in any state.
	pub candidates: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
	/// Keyed by (txid, alias); a transaction may register several aliases.
	confirmed: BTreeMap<(String, String), AliasCandidate>,
	/// Mined but not yet final. Treated as unconfirmed and never expired.
	awaiting_finality: Vec<AliasCandidate>,
	mempool: Vec<AliasCandidate>,
	/// Tip height when each outstanding txid was first seen.
	first_seen: HashMap<String, u64>,
}

impl CandidatePool {
	pub fn new() -> Self {
		Self::default()
	}

	/// Rebuild a pool from a persisted snapshot.
	///
	/// Valid entries come back as confirmed candidates. Unconfirmed transactions only
	/// restore their first-seen height; they are fetched again on the next cycle.
	/// Snapshots written without a first-seen map fall back to the Pending entries.
	pub fn from_snapshot(snapshot: &AliasSnapshot) -> Self {
		let confirmed = snapshot
			.valid
			.values()
			.map(|valid| {
				let candidate = AliasCandidate {
					alias: valid.alias.clone(),
					address: valid.address.clone(),
					txid: valid.txid.clone(),
					blockheight: Some(valid.blockheight),
					fee_paid_sats: 0,
					first_seen_height: valid.blockheight,
				};
				((valid.txid.clone(), valid.alias.clone()), candidate)
			})
			.collect();
		let mut first_seen: HashMap<String, u64> = snapshot
			.pending
			.values()
			.map(|pending| (pending.txid.clone(), pending.first_seen_height))
			.collect();
		first_seen.extend(
			snapshot
				.first_seen
				.iter()
				.map(|(txid, height)| (txid.clone(), *height)),
		);

		Self {
			confirmed,
			awaiting_finality: Vec::new(),
			mempool: Vec::new(),
			first_seen,
		}
	}

	/// Merge a fetch of everything above `cursor` into the pool.
	///
	/// Transactions in blocks at or below `finalized_height` join the confirmed set.
	/// The rest replace the previous unconfirmed candidates wholesale. First-seen
	/// heights carry over for transactions that are still outstanding and are
	/// forgotten for the ones that vanished. A txid listed more than once, as when
	/// paging races a new transaction, is processed once.
	pub fn ingest(
		&mut self,
		txs: &[RawTx],
		extractor: &CandidateExtractor,
		cursor: u64,
		tip_height: u64,
		finalized_height: u64,
	) -> IngestOutcome {
		let mut outcome = IngestOutcome::default();
		let mut awaiting_finality = Vec::new();
		let mut mempool = Vec::new();
		let mut first_seen = HashMap::new();
		let mut processed = HashSet::new();

		for tx in txs {
			if !processed.insert(tx.txid.as_str()) {
				continue;
			}
			let seen_at = self.first_seen.get(&tx.txid).copied().unwrap_or(tip_height);
			match tx.block_height() {
				Some(height) if height <= cursor => continue,
				Some(height) if height <= finalized_height => {
					outcome.confirmed_transactions += 1;
					for candidate in extractor.extract_all(tx, seen_at) {
						outcome.candidates += 1;
						self.confirmed
							.insert((candidate.txid.clone(), candidate.alias.clone()), candidate);
					}
				}
				blockheight => {
					let candidates = extractor.extract_all(tx, seen_at);
					if candidates.is_empty() {
						continue;
					}
					outcome.candidates += candidates.len();
					first_seen.insert(tx.txid.clone(), seen_at);
					if blockheight.is_some() {
						awaiting_finality.extend(candidates.into_iter().map(AliasCandidate::into_unconfirmed));
					} else {
						mempool.extend(candidates);
					}
				}
			}
		}

		self.awaiting_finality = awaiting_finality;
		self.mempool = mempool;
		self.first_seen = first_seen;
		outcome
	}

	/// Drop mempool candidates outstanding for more than `expiration_blocks`.
	///
	/// Their first-seen heights are kept, so a transaction that lingers in the mempool
	/// stays expired on later cycles.
	pub fn expire_stale(&mut self, tip_height: u64, expiration_blocks: u64) -> usize {
		let before = self.mempool.len();
		self.mempool
			.retain(|candidate| tip_height.saturating_sub(candidate.first_seen_height) <= expiration_blocks);
		before - self.mempool.len()
	}

	/// Every candidate in the pool, in no particular order.
	pub fn candidates(&self) -> Vec<AliasCandidate> {
		self.confirmed
			.values()
			.chain(self.awaiting_finality.iter())
			.chain(self.mempool.iter())
			.cloned()
			.collect()
	}

	/// First-seen heights of every outstanding unconfirmed transaction, for persisting.
	pub fn first_seen_heights(&self) -> BTreeMap<String, u64> {
		self.first_seen
			.iter()
			.map(|(txid, height)| (txid.clone(), *height))
			.collect()
	}

	pub fn confirmed_len(&self) -> usize {
		self.confirmed.len()
	}

	pub fn unconfirmed_len(&self) -> usize {
		self.awaiting_finality.len() + self.mempool.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::alias::extractor::tests::{extractor, fee_output, op_return, registration_script, registration_tx};
	use crate::alias::{PendingAlias, ValidAlias};
	use crate::sync::ServerState;

	#[test]
	fn final_candidates_accumulate_and_mempool_is_replaced() {
		let ex = extractor();
		let mut pool = CandidatePool::new();

		let first = vec![
			registration_tx("m1", "alice", None),
			registration_tx("c1", "bob", Some(790_010)),
		];
		let outcome = pool.ingest(&first, &ex, 784_999, 790_020, 790_020);
		assert_eq!(outcome.confirmed_transactions, 1);
		assert_eq!(outcome.candidates, 2);
		assert_eq!(pool.confirmed_len(), 1);
		assert_eq!(pool.unconfirmed_len(), 1);

		// next fetch is above the new cursor; m1 dropped out of the mempool
		let second = vec![registration_tx("m2", "carol", None)];
		let outcome = pool.ingest(&second, &ex, 790_020, 790_021, 790_021);
		assert_eq!(outcome.confirmed_transactions, 0);

		let mut aliases: Vec<String> = pool.candidates().into_iter().map(|c| c.alias).collect();
		aliases.sort();
		assert_eq!(aliases, vec!["bob", "carol"]);
	}

	#[test]
	fn blocks_above_finality_are_treated_as_unconfirmed() {
		let ex = extractor();
		let mut pool = CandidatePool::new();
		let txs = vec![registration_tx("c1", "bob", Some(790_021))];

		let outcome = pool.ingest(&txs, &ex, 790_020, 790_021, 790_020);
		assert_eq!(outcome.confirmed_transactions, 0);
		assert_eq!(pool.confirmed_len(), 0);
		let candidates = pool.candidates();
		assert_eq!(candidates.len(), 1);
		assert_eq!(candidates[0].blockheight, None);

		// awaiting finality never expires
		assert_eq!(pool.expire_stale(800_000, 6), 0);
		assert_eq!(pool.unconfirmed_len(), 1);
	}

	#[test]
	fn expiration_boundary() {
		let ex = extractor();
		let mut pool = CandidatePool::new();
		let txs = vec![registration_tx("m1", "alice", None)];

		pool.ingest(&txs, &ex, 784_999, 790_100, 790_100);
		assert_eq!(pool.expire_stale(790_106, 6), 0);

		pool.ingest(&txs, &ex, 790_100, 790_107, 790_107);
		assert_eq!(pool.candidates()[0].first_seen_height, 790_100);
		assert_eq!(pool.expire_stale(790_107, 6), 1);
		assert!(pool.candidates().is_empty());

		// still in the mempool next cycle: first-seen height survives, so it stays expired
		pool.ingest(&txs, &ex, 790_107, 790_108, 790_108);
		assert_eq!(pool.expire_stale(790_108, 6), 1);
	}

	#[test]
	fn vanished_transaction_is_seen_fresh_if_it_returns() {
		let ex = extractor();
		let mut pool = CandidatePool::new();
		let txs = vec![registration_tx("m1", "alice", None)];

		pool.ingest(&txs, &ex, 784_999, 790_100, 790_100);
		pool.ingest(&[], &ex, 790_100, 790_101, 790_101);
		pool.ingest(&txs, &ex, 790_101, 790_110, 790_110);
		assert_eq!(pool.candidates()[0].first_seen_height, 790_110);
	}

	#[test]
	fn confirmed_transaction_records_all_its_aliases() {
		let ex = extractor();
		let mut pool = CandidatePool::new();
		let mut tx = registration_tx("c1", "1", Some(790_010));
		tx.outputs.push(op_return(registration_script("333")));
		tx.outputs.push(fee_output(556));

		let outcome = pool.ingest(&[tx.clone(), tx], &ex, 784_999, 790_010, 790_010);
		assert_eq!(pool.confirmed_len(), 2);
		assert_eq!(outcome.candidates, 2);
	}

	#[test]
	fn repeated_txid_in_one_fetch_is_counted_once() {
		let ex = extractor();
		let mut pool = CandidatePool::new();
		let confirmed = registration_tx("c1", "bob", Some(790_010));
		let plain = RawTx {
			txid: "p1".to_string(),
			outputs: vec![fee_output(1_000)],
			block: confirmed.block.clone(),
		};
		let mempool = registration_tx("m1", "alice", None);
		let txs = vec![
			mempool.clone(),
			confirmed.clone(),
			plain.clone(),
			mempool,
			confirmed,
			plain,
		];

		let outcome = pool.ingest(&txs, &ex, 784_999, 790_020, 790_020);
		assert_eq!(outcome.confirmed_transactions, 2);
		assert_eq!(outcome.candidates, 2);
		assert_eq!(pool.unconfirmed_len(), 1);
	}

	#[test]
	fn expired_first_seen_heights_are_exported() {
		let ex = extractor();
		let mut pool = CandidatePool::new();
		let txs = vec![registration_tx("m1", "alice", None)];
		pool.ingest(&txs, &ex, 784_999, 790_100, 790_100);
		pool.ingest(&txs, &ex, 790_100, 790_107, 790_107);
		assert_eq!(pool.expire_stale(790_107, 6), 1);

		let exported = pool.first_seen_heights();
		assert_eq!(exported.get("m1"), Some(&790_100));

		let mut snapshot = AliasSnapshot::empty(ServerState::default());
		snapshot.first_seen = exported;
		let mut restored = CandidatePool::from_snapshot(&snapshot);
		restored.ingest(&txs, &ex, 790_107, 790_108, 790_108);
		assert_eq!(restored.expire_stale(790_108, 6), 1);
		assert!(restored.candidates().is_empty());
	}

	#[test]
	fn snapshot_seeds_confirmed_set_and_first_seen() {
		let mut snapshot = AliasSnapshot::empty(ServerState {
			processed_blockheight: 790_020,
			processed_confirmed_tx_count: 1,
		});
		snapshot.valid.insert(
			"bob".to_string(),
			ValidAlias {
				alias: "bob".to_string(),
				address: "ecash:qp".to_string(),
				txid: "c1".to_string(),
				blockheight: 790_010,
			},
		);
		snapshot.pending.insert(
			"alice".to_string(),
			PendingAlias {
				alias: "alice".to_string(),
				address: "ecash:qp".to_string(),
				txid: "m1".to_string(),
				first_seen_height: 790_015,
			},
		);

		let mut pool = CandidatePool::from_snapshot(&snapshot);
		assert_eq!(pool.confirmed_len(), 1);
		assert_eq!(pool.unconfirmed_len(), 0);

		pool.ingest(&[registration_tx("m1", "alice", None)], &extractor(), 790_020, 790_030, 790_030);
		assert_eq!(pool.candidates().iter().find(|c| c.txid == "m1").unwrap().first_seen_height, 790_015);
	}
}
