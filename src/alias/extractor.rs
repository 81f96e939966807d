//! Turns raw transactions sent to the registration address into alias candidates.
//!
//! Extraction never fails: anything that is not a well-formed, fully paid registration
//! is noise and yields no candidate.

use super::address::AliasAddress;
use super::prices::AliasPriceTable;
use super::script::parse_registration;
use super::types::{AliasCandidate, is_valid_alias};
use crate::indexer::RawTx;
use crate::utils::format_xec_amount;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CandidateExtractor {
	registration_script: Vec<u8>,
	prices: AliasPriceTable,
	address_prefix: String,
}

impl CandidateExtractor {
	pub fn new(registration: &AliasAddress, prices: AliasPriceTable, address_prefix: impl Into<String>) -> Self {
		Self {
			registration_script: registration.output_script(),
			prices,
			address_prefix: address_prefix.into(),
		}
	}

	/// Extract the registration carried by `tx`, if any.
	///
	/// For a transaction carrying several registrations this is the first one in
	/// output order; see [`Self::extract_all`].
	pub fn extract(&self, tx: &RawTx, seen_at_height: u64) -> Option<AliasCandidate> {
		self.extract_all(tx, seen_at_height).into_iter().next()
	}

	/// Extract every registration carried by `tx`.
	///
	/// Outputs that do not decode as valid registrations are skipped. The whole
	/// transaction is discarded if it registers the same alias twice, or if the value it
	/// pays to the registration address does not cover the summed price of its
	/// registrations.
	pub fn extract_all(&self, tx: &RawTx, seen_at_height: u64) -> Vec<AliasCandidate> {
		let blockheight = tx.block_height();
		let mut fee_paid_sats: u64 = 0;
		let mut required_sats: u64 = 0;
		let mut seen_aliases = HashSet::new();
		let mut registrations = Vec::new();

		for output in &tx.outputs {
			let Ok(script) = hex::decode(&output.output_script) else {
				continue;
			};

			if script == self.registration_script {
				fee_paid_sats = fee_paid_sats.saturating_add(output.value);
				continue;
			}

			let Some(payload) = parse_registration(&script) else {
				continue;
			};
			let Ok(alias) = String::from_utf8(payload.alias) else {
				debug!("Skipping non-utf8 alias in {}", tx.txid);
				continue;
			};
			if !is_valid_alias(&alias) {
				debug!("Skipping invalid alias {:?} in {}", alias, tx.txid);
				continue;
			}
			let price = match self.prices.price(alias.len(), blockheight) {
				Ok(price) => price,
				Err(e) => {
					debug!("Skipping alias {} in {}: {}", alias, tx.txid, e);
					continue;
				}
			};
			if !seen_aliases.insert(alias.clone()) {
				debug!("Discarding {}: registers alias {} twice", tx.txid, alias);
				return Vec::new();
			}

			required_sats = required_sats.saturating_add(price);
			registrations.push((alias, payload.address));
		}

		if registrations.is_empty() {
			return Vec::new();
		}

		if fee_paid_sats < required_sats {
			debug!(
				"Discarding {}: paid {} for registrations costing {}",
				tx.txid,
				format_xec_amount(fee_paid_sats),
				format_xec_amount(required_sats)
			);
			return Vec::new();
		}

		registrations
			.into_iter()
			.map(|(alias, address)| AliasCandidate {
				alias,
				address: address.to_cashaddr(&self.address_prefix),
				txid: tx.txid.clone(),
				blockheight,
				fee_paid_sats,
				first_seen_height: seen_at_height,
			})
			.collect()
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::alias::AddressKind;
	use crate::indexer::{BlockMetadata, TxOutput};

	pub(crate) const REGISTRATION_HASH: &str = "d37c4c809fe9840e7bfa77b86bd47163f6fb6c60";
	const OWNER_HASH: &str = "76458db0ed96fe9863fc1ccec9fa2cfab884b0f6";

	pub(crate) fn registration_address() -> AliasAddress {
		AliasAddress::new(
			AddressKind::P2sh,
			hex::decode(REGISTRATION_HASH).unwrap().try_into().unwrap(),
		)
	}

	pub(crate) fn extractor() -> CandidateExtractor {
		CandidateExtractor::new(&registration_address(), AliasPriceTable::default(), "ecash")
	}

	/// OP_RETURN registration of `alias` to a fixed p2pkh owner.
	pub(crate) fn registration_script(alias: &str) -> String {
		format!(
			"6a042e78656300{:02x}{}1500{}",
			alias.len(),
			hex::encode(alias),
			OWNER_HASH
		)
	}

	pub(crate) fn fee_output(value: u64) -> TxOutput {
		TxOutput {
			value,
			output_script: format!("a914{}87", REGISTRATION_HASH),
		}
	}

	pub(crate) fn op_return(script: String) -> TxOutput {
		TxOutput {
			value: 0,
			output_script: script,
		}
	}

	pub(crate) fn registration_tx(txid: &str, alias: &str, height: Option<u64>) -> RawTx {
		RawTx {
			txid: txid.to_string(),
			outputs: vec![
				op_return(registration_script(alias)),
				fee_output(559 - alias.len() as u64),
			],
			block: height.map(|height| BlockMetadata {
				height,
				hash: format!("block{}", height),
			}),
		}
	}

	#[test]
	fn extracts_paid_registration() {
		let tx = registration_tx("aa", "bob", Some(790_000));
		let candidate = extractor().extract(&tx, 790_001).unwrap();
		assert_eq!(candidate.alias, "bob");
		assert_eq!(candidate.txid, "aa");
		assert_eq!(candidate.blockheight, Some(790_000));
		assert_eq!(candidate.fee_paid_sats, 556);
		assert_eq!(candidate.first_seen_height, 790_001);
		assert!(candidate.address.starts_with("ecash:qp"));
	}

	#[test]
	fn mempool_registration_has_no_height() {
		let tx = registration_tx("aa", "bob", None);
		let candidate = extractor().extract(&tx, 800_000).unwrap();
		assert_eq!(candidate.blockheight, None);
	}

	#[test]
	fn overpaid_fee_is_accepted() {
		let mut tx = registration_tx("aa", "bob", Some(790_000));
		tx.outputs.push(fee_output(558));
		let candidate = extractor().extract(&tx, 790_000).unwrap();
		assert_eq!(candidate.fee_paid_sats, 556 + 558);
	}

	#[test]
	fn underpaid_fee_is_discarded() {
		let mut tx = registration_tx("aa", "bob", Some(790_000));
		tx.outputs[1] = fee_output(555);
		assert!(extractor().extract(&tx, 790_000).is_none());
	}

	#[test]
	fn invalid_aliases_are_discarded() {
		let ex = extractor();
		for alias in ["Bob", "twentytwocharactertest", "a_b"] {
			let tx = registration_tx("aa", alias, Some(790_000));
			assert!(ex.extract(&tx, 790_000).is_none(), "{} should be rejected", alias);
		}
		// empty alias is pushed as OP_0 and fails to parse
		let mut tx = registration_tx("aa", "x", Some(790_000));
		tx.outputs[0] = op_return(format!("6a042e786563000015{}", "00".repeat(21)));
		assert!(ex.extract(&tx, 790_000).is_none());
	}

	#[test]
	fn registration_before_activation_is_discarded() {
		let tx = registration_tx("aa", "bob", Some(784_999));
		assert!(extractor().extract(&tx, 784_999).is_none());
	}

	#[test]
	fn tx_without_op_return_yields_nothing() {
		let tx = RawTx {
			txid: "aa".to_string(),
			outputs: vec![fee_output(100_000)],
			block: None,
		};
		assert!(extractor().extract_all(&tx, 0).is_empty());
	}

	#[test]
	fn two_registrations_paid_for_both() {
		let mut tx = registration_tx("aa", "1", Some(790_000));
		tx.outputs.push(op_return(registration_script("333")));
		tx.outputs.push(fee_output(556));
		// first fee output was sized for "1" (558)
		let candidates = extractor().extract_all(&tx, 790_000);
		assert_eq!(candidates.len(), 2);
		assert_eq!(candidates[0].alias, "1");
		assert_eq!(candidates[1].alias, "333");
		assert!(candidates.iter().all(|c| c.txid == "aa" && c.fee_paid_sats == 558 + 556));
	}

	#[test]
	fn two_registrations_paid_for_one_are_discarded() {
		let mut tx = registration_tx("aa", "1", Some(790_000));
		tx.outputs.push(op_return(registration_script("333")));
		tx.outputs.push(fee_output(555));
		assert!(extractor().extract_all(&tx, 790_000).is_empty());
	}

	#[test]
	fn duplicate_alias_in_one_tx_is_discarded() {
		let mut tx = registration_tx("aa", "1", Some(790_000));
		tx.outputs.push(op_return(registration_script("1")));
		tx.outputs.push(fee_output(558));
		assert!(extractor().extract_all(&tx, 790_000).is_empty());
	}

	#[test]
	fn invalid_registration_does_not_consume_fee() {
		let mut tx = registration_tx("aa", "1", Some(790_000));
		// unknown address version, skipped
		tx.outputs.push(op_return(format!(
			"6a042e78656300033333331501{}",
			OWNER_HASH
		)));
		let candidates = extractor().extract_all(&tx, 790_000);
		assert_eq!(candidates.len(), 1);
		assert_eq!(candidates[0].alias, "1");
	}

	#[test]
	fn unrelated_op_return_is_ignored() {
		let mut tx = registration_tx("aa", "bob", Some(790_000));
		tx.outputs.push(op_return("6a04007461620474657374".to_string()));
		assert_eq!(extractor().extract_all(&tx, 790_000).len(), 1);
	}
}
