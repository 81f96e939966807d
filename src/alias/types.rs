use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Longest registrable alias, in bytes.
pub const MAX_ALIAS_LENGTH: usize = 21;

/// Whether `alias` is registrable: 1 to 21 bytes of `a-z` and `0-9`.
pub fn is_valid_alias(alias: &str) -> bool {
	!alias.is_empty()
		&& alias.len() <= MAX_ALIAS_LENGTH
		&& alias
			.bytes()
			.all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

/// Position of a transaction in the total registration order.
///
/// Mined transactions sort by height; every unconfirmed transaction sorts after every
/// mined one. Variant order carries that rule, so the derived `Ord` is the ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockPosition {
	Confirmed(u64),
	Unconfirmed,
}

impl From<Option<u64>> for BlockPosition {
	fn from(blockheight: Option<u64>) -> Self {
		match blockheight {
			Some(height) => BlockPosition::Confirmed(height),
			None => BlockPosition::Unconfirmed,
		}
	}
}

/// A decoded claim, not yet adjudicated against competing claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasCandidate {
	pub alias: String,
	/// Cashaddr the alias should resolve to.
	pub address: String,
	pub txid: String,
	/// `None` while the transaction is unconfirmed.
	pub blockheight: Option<u64>,
	/// Total value the transaction paid to the registration address.
	pub fee_paid_sats: u64,
	/// Chain tip height when this claim was first observed.
	pub first_seen_height: u64,
}

impl AliasCandidate {
	pub fn is_confirmed(&self) -> bool {
		self.blockheight.is_some()
	}

	pub fn position(&self) -> BlockPosition {
		self.blockheight.into()
	}

	/// Key of the resolution order: position, then txid.
	pub fn ordering_key(&self) -> (BlockPosition, &str) {
		(self.position(), self.txid.as_str())
	}

	/// The same claim, treated as not yet mined.
	pub fn into_unconfirmed(mut self) -> Self {
		self.blockheight = None;
		self
	}
}

/// A settled registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidAlias {
	pub alias: String,
	pub address: String,
	pub txid: String,
	pub blockheight: u64,
}

/// A provisional registration still waiting on confirmation or finality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAlias {
	pub alias: String,
	pub address: String,
	pub txid: String,
	pub first_seen_height: u64,
}

/// Aliases claimed by the protocol itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservedAliases(BTreeSet<String>);

impl ReservedAliases {
	pub fn contains(&self, alias: &str) -> bool {
		self.0.contains(alias)
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl<S: Into<String>> FromIterator<S> for ReservedAliases {
	fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
		Self(iter.into_iter().map(Into::into).collect())
	}
}

/// Brand and infrastructure names held back at launch.
pub const DEFAULT_RESERVED_ALIASES: &[&str] = &[
	"abc",
	"admin",
	"avalanche",
	"binance",
	"bitcoin",
	"bitcoinabc",
	"cashfusion",
	"cashtab",
	"coinbase",
	"ecash",
	"ecashofficial",
	"electrum",
	"electrumabc",
	"etoken",
	"helpdesk",
	"official",
	"support",
	"token",
	"xec",
	"xecwallet",
];

/// Result of looking up a single alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AliasLookup {
	Registered(ValidAlias),
	Pending(PendingAlias),
	NotFound,
}

/// Every alias an address holds or is waiting on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRegistrations {
	pub registered: Vec<ValidAlias>,
	pub pending: Vec<PendingAlias>,
}
