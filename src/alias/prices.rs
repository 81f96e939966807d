//! Registration price schedule.
//!
//! Prices are grouped into epochs. Each epoch starts at a block height and fixes a fee
//! for every alias length; a registration is priced by the epoch in force at the height
//! it was mined, and a mempool registration by the newest epoch.

use super::types::MAX_ALIAS_LENGTH;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Height at which alias registrations activated on mainnet.
pub const ALIAS_ACTIVATION_HEIGHT: u64 = 785_000;

/// Fees for one price epoch, keyed by alias length in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEpoch {
	pub start_height: u64,
	pub fees: BTreeMap<usize, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceTableError {
	#[error("alias price table has no epochs")]
	Empty,

	#[error("alias price epochs must be sorted by startHeight, highest to lowest")]
	Unsorted,

	#[error("fees[{length}] is undefined for epoch starting at {start_height}")]
	MissingLength { start_height: u64, length: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceLookupError {
	#[error("{0} precedes alias protocol activation height")]
	PrecedesActivation(u64),

	#[error("no price for alias length {0}")]
	UnpricedLength(usize),
}

/// Validated price schedule, newest epoch first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasPriceTable {
	epochs: Vec<PriceEpoch>,
}

impl AliasPriceTable {
	/// Build a table from epochs sorted by `start_height` descending.
	///
	/// Every epoch must price every registrable length.
	pub fn new(epochs: Vec<PriceEpoch>) -> Result<Self, PriceTableError> {
		if epochs.is_empty() {
			return Err(PriceTableError::Empty);
		}
		if epochs
			.windows(2)
			.any(|pair| pair[0].start_height <= pair[1].start_height)
		{
			return Err(PriceTableError::Unsorted);
		}
		for epoch in &epochs {
			if let Some(length) = (1..=MAX_ALIAS_LENGTH).find(|len| !epoch.fees.contains_key(len)) {
				return Err(PriceTableError::MissingLength {
					start_height: epoch.start_height,
					length,
				});
			}
		}
		Ok(Self { epochs })
	}

	pub fn epochs(&self) -> &[PriceEpoch] {
		&self.epochs
	}

	/// Price in satoshis of an alias of `alias_length` bytes.
	///
	/// `blockheight = None` prices an unconfirmed registration at the newest epoch.
	pub fn price(&self, alias_length: usize, blockheight: Option<u64>) -> Result<u64, PriceLookupError> {
		let epoch = match blockheight {
			None => self.epochs.first(),
			Some(height) => self.epochs.iter().find(|epoch| epoch.start_height <= height),
		};
		let epoch = match (epoch, blockheight) {
			(Some(epoch), _) => epoch,
			(None, Some(height)) => return Err(PriceLookupError::PrecedesActivation(height)),
			(None, None) => return Err(PriceLookupError::UnpricedLength(alias_length)),
		};
		epoch
			.fees
			.get(&alias_length)
			.copied()
			.ok_or(PriceLookupError::UnpricedLength(alias_length))
	}
}

impl Default for AliasPriceTable {
	fn default() -> Self {
		Self {
			epochs: default_price_epochs(),
		}
	}
}

/// The launch price schedule: 558 sats for one character, one sat less per extra byte.
pub fn default_price_epochs() -> Vec<PriceEpoch> {
	vec![PriceEpoch {
		start_height: ALIAS_ACTIVATION_HEIGHT,
		fees: (1..=MAX_ALIAS_LENGTH)
			.map(|len| (len, 559 - len as u64))
			.collect(),
	}]
}
