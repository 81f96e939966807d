//! Read-side queries over the last published alias snapshot.

use crate::alias::{AddressRegistrations, AliasLookup, is_valid_alias};
use crate::sync::{AliasSnapshot, ServerState};

use std::sync::Arc;
use tokio::sync::watch;

/// Cheap, cloneable read handle.
///
/// Every query reads one snapshot, so results never mix state from two cycles.
#[derive(Debug, Clone)]
pub struct AliasDirectory {
	snapshot_rx: watch::Receiver<Arc<AliasSnapshot>>,
}

impl AliasDirectory {
	pub fn new(snapshot_rx: watch::Receiver<Arc<AliasSnapshot>>) -> Self {
		Self { snapshot_rx }
	}

	/// The snapshot currently published.
	pub fn snapshot(&self) -> Arc<AliasSnapshot> {
		self.snapshot_rx.borrow().clone()
	}

	/// Look up a single alias. Strings that are not valid aliases are `NotFound`.
	pub fn lookup_alias(&self, alias: &str) -> AliasLookup {
		if !is_valid_alias(alias) {
			return AliasLookup::NotFound;
		}
		let snapshot = self.snapshot();
		if let Some(valid) = snapshot.valid.get(alias) {
			return AliasLookup::Registered(valid.clone());
		}
		if let Some(pending) = snapshot.pending.get(alias) {
			return AliasLookup::Pending(pending.clone());
		}
		AliasLookup::NotFound
	}

	/// Every alias pointing at `address`.
	///
	/// Registered aliases are ordered by registration (height, then txid), pending ones
	/// by alias.
	pub fn list_by_address(&self, address: &str) -> AddressRegistrations {
		let snapshot = self.snapshot();
		let mut registered: Vec<_> = snapshot
			.valid
			.values()
			.filter(|valid| valid.address == address)
			.cloned()
			.collect();
		registered.sort_by(|a, b| {
			a.blockheight
				.cmp(&b.blockheight)
				.then_with(|| a.txid.cmp(&b.txid))
		});
		let pending = snapshot
			.pending
			.values()
			.filter(|pending| pending.address == address)
			.cloned()
			.collect();

		AddressRegistrations {
			registered,
			pending,
		}
	}

	pub fn server_state(&self) -> ServerState {
		self.snapshot_rx.borrow().server_state
	}

	/// Wait until a new snapshot is published. Returns `false` once the engine is gone.
	pub async fn changed(&mut self) -> bool {
		self.snapshot_rx.changed().await.is_ok()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::alias::{PendingAlias, ValidAlias};

	const OWNER: &str = "ecash:qphlhe78677sz227k83hrh542qeehh8el5lcjwk72y";
	const OTHER: &str = "ecash:prfhcnyqnl5cgrnmlfmms675w93ld7mvvqd0y8lz07";

	fn valid(alias: &str, address: &str, txid: &str, blockheight: u64) -> (String, ValidAlias) {
		(
			alias.to_string(),
			ValidAlias {
				alias: alias.to_string(),
				address: address.to_string(),
				txid: txid.to_string(),
				blockheight,
			},
		)
	}

	fn pending(alias: &str, address: &str, txid: &str) -> (String, PendingAlias) {
		(
			alias.to_string(),
			PendingAlias {
				alias: alias.to_string(),
				address: address.to_string(),
				txid: txid.to_string(),
				first_seen_height: 790_050,
			},
		)
	}

	fn snapshot() -> AliasSnapshot {
		AliasSnapshot {
			valid: [
				valid("zed", OWNER, "b2", 790_001),
				valid("amy", OWNER, "f1", 790_020),
				valid("bob", OWNER, "a1", 790_001),
				valid("eve", OTHER, "c3", 790_005),
			]
			.into_iter()
			.collect(),
			pending: [pending("carl", OWNER, "m1"), pending("ann", OWNER, "m2")]
				.into_iter()
				.collect(),
			server_state: ServerState {
				processed_blockheight: 790_050,
				processed_confirmed_tx_count: 4,
			},
			first_seen: [("m1".to_string(), 790_050), ("m2".to_string(), 790_050)]
				.into_iter()
				.collect(),
		}
	}

	fn directory() -> (watch::Sender<Arc<AliasSnapshot>>, AliasDirectory) {
		let (tx, rx) = watch::channel(Arc::new(snapshot()));
		(tx, AliasDirectory::new(rx))
	}

	#[test]
	fn lookup_distinguishes_registered_pending_and_missing() {
		let (_tx, directory) = directory();
		assert!(matches!(directory.lookup_alias("bob"), AliasLookup::Registered(v) if v.txid == "a1"));
		assert!(matches!(directory.lookup_alias("carl"), AliasLookup::Pending(p) if p.txid == "m1"));
		assert_eq!(directory.lookup_alias("nobody"), AliasLookup::NotFound);
		assert_eq!(directory.lookup_alias("Bob"), AliasLookup::NotFound);
		assert_eq!(directory.lookup_alias(""), AliasLookup::NotFound);
	}

	#[test]
	fn lists_by_address_in_registration_order() {
		let (_tx, directory) = directory();
		let listed = directory.list_by_address(OWNER);
		let registered: Vec<&str> = listed.registered.iter().map(|v| v.alias.as_str()).collect();
		assert_eq!(registered, vec!["bob", "zed", "amy"]);
		let pending: Vec<&str> = listed.pending.iter().map(|p| p.alias.as_str()).collect();
		assert_eq!(pending, vec!["ann", "carl"]);

		assert_eq!(directory.list_by_address(OTHER).registered.len(), 1);
		assert_eq!(directory.list_by_address("ecash:unknown"), AddressRegistrations::default());
	}

	#[tokio::test]
	async fn sees_newly_published_snapshot() {
		let (tx, mut directory) = directory();
		let reader = directory.clone();
		tx.send_replace(Arc::new(AliasSnapshot::empty(ServerState::default())));

		assert!(directory.changed().await);
		assert_eq!(reader.lookup_alias("bob"), AliasLookup::NotFound);
		assert_eq!(reader.server_state(), ServerState::default());

		drop(tx);
		assert!(!directory.changed().await);
	}
}
