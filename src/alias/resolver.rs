//! First-claim-wins conflict resolution.
//!
//! `resolve` recomputes the whole alias state from the whole candidate set. It is pure:
//! the output depends only on the set of candidates and the reserved list, never on the
//! order candidates are passed in.

use super::types::{AliasCandidate, PendingAlias, ReservedAliases, ValidAlias};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Canonical alias state derived from a candidate set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
	pub valid: BTreeMap<String, ValidAlias>,
	pub pending: BTreeMap<String, PendingAlias>,
}

/// Assign every alias to its earliest claim.
///
/// Candidates are walked in `(height, txid)` order with unconfirmed claims after every
/// confirmed one. The first claim for an alias that is not reserved wins: a confirmed
/// winner becomes a [`ValidAlias`], an unconfirmed winner a [`PendingAlias`]. Every later
/// claim for the same alias is dropped.
pub fn resolve(candidates: &[AliasCandidate], reserved: &ReservedAliases) -> Resolution {
	let mut ordered: Vec<&AliasCandidate> = candidates.iter().collect();
	// Trailing keys only matter for exact duplicates of (position, txid), which can only
	// differ in alias or metadata; they keep the walk total.
	ordered.sort_by(|a, b| {
		a.ordering_key()
			.cmp(&b.ordering_key())
			.then_with(|| a.alias.cmp(&b.alias))
			.then_with(|| a.address.cmp(&b.address))
			.then_with(|| a.first_seen_height.cmp(&b.first_seen_height))
	});

	let mut claimed: HashSet<&str> = reserved.iter().collect();
	let mut resolution = Resolution::default();

	for candidate in ordered {
		if !claimed.insert(candidate.alias.as_str()) {
			continue;
		}
		match candidate.blockheight {
			Some(blockheight) => {
				resolution.valid.insert(
					candidate.alias.clone(),
					ValidAlias {
						alias: candidate.alias.clone(),
						address: candidate.address.clone(),
						txid: candidate.txid.clone(),
						blockheight,
					},
				);
			}
			None => {
				resolution.pending.insert(
					candidate.alias.clone(),
					PendingAlias {
						alias: candidate.alias.clone(),
						address: candidate.address.clone(),
						txid: candidate.txid.clone(),
						first_seen_height: candidate.first_seen_height,
					},
				);
			}
		}
	}

	resolution
}
