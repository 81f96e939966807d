//! Wire types for the ledger indexer integration

use serde::{Deserialize, Deserializer, Serialize};

/// Block a transaction was mined in, as reported by the indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMetadata {
	/// Height of the containing block.
	pub height: u64,
	/// Hash of the containing block.
	pub hash: String,
}

/// A single transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutput {
	/// Output value in satoshis. The indexer sends these as decimal strings.
	#[serde(deserialize_with = "deserialize_sats")]
	pub value: u64,
	/// Raw output script, hex encoded.
	pub output_script: String,
}

/// Transaction as returned by the indexer's address history endpoint.
///
/// Confirmed and mempool transactions share this shape; mempool transactions
/// simply lack the `block` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTx {
	/// The transaction id.
	pub txid: String,
	/// Outputs in transaction order.
	pub outputs: Vec<TxOutput>,
	/// Containing block, absent for mempool transactions.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub block: Option<BlockMetadata>,
}

impl RawTx {
	/// Height of the containing block, if mined.
	pub fn block_height(&self) -> Option<u64> {
		self.block.as_ref().map(|block| block.height)
	}
}

/// One page of address history, newest transactions first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
	pub txs: Vec<RawTx>,
	pub num_pages: usize,
}

/// Current chain tip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainInfo {
	pub tip_hash: String,
	pub tip_height: u64,
}

/// Events pushed by the indexer over its WebSocket endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BlockEvent {
	/// A new block extended the chain.
	BlockConnected {
		#[serde(rename = "blockHash")]
		block_hash: String,
		#[serde(rename = "blockHeight", default)]
		block_height: u64,
	},
	/// A transaction touching the subscribed script entered the mempool.
	AddedToMempool { txid: String },
	/// A transaction touching the subscribed script left the mempool unmined.
	RemovedFromMempool { txid: String },
}

fn deserialize_sats<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Sats {
		Number(u64),
		Text(String),
	}

	match Sats::deserialize(deserializer)? {
		Sats::Number(value) => Ok(value),
		Sats::Text(text) => text.parse::<u64>().map_err(serde::de::Error::custom),
	}
}

/// Error types for indexer and finality operations
#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
	#[error("RPC error: {0}")]
	RpcError(String),

	#[error("No data returned")]
	NoData,

	#[error("WebSocket error: {0}")]
	WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("JSON parse error: {0}")]
	JsonError(#[from] serde_json::Error),

	#[error("Subscription error: {0}")]
	SubscriptionError(String),
}

impl IndexerError {
	/// Whether retrying the same request may succeed.
	///
	/// A body that does not decode is a protocol mismatch, not a network hiccup.
	pub fn is_transient(&self) -> bool {
		!matches!(self, IndexerError::JsonError(_))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn raw_tx_accepts_string_values_and_missing_block() {
		let json = r#"{
			"txid": "aa",
			"outputs": [
				{ "value": "0", "outputScript": "6a04" },
				{ "value": "558", "outputScript": "a914d37c4c809fe9840e7bfa77b86bd47163f6fb6c6087" }
			],
			"timeFirstSeen": "1674738494"
		}"#;
		let tx: RawTx = serde_json::from_str(json).unwrap();
		assert_eq!(tx.outputs[1].value, 558);
		assert_eq!(tx.block_height(), None);
	}

	#[test]
	fn raw_tx_reads_block_height() {
		let json = r#"{
			"txid": "bb",
			"outputs": [{ "value": 554, "outputScript": "6a" }],
			"block": { "height": 776585, "hash": "0000", "timestamp": "1674738897" }
		}"#;
		let tx: RawTx = serde_json::from_str(json).unwrap();
		assert_eq!(tx.block_height(), Some(776585));
		assert_eq!(tx.outputs[0].value, 554);
	}

	#[test]
	fn block_event_is_tagged_by_type() {
		let json = r#"{ "type": "BlockConnected", "blockHash": "00ab", "blockHeight": 800000 }"#;
		let event: BlockEvent = serde_json::from_str(json).unwrap();
		assert_eq!(
			event,
			BlockEvent::BlockConnected {
				block_hash: "00ab".to_string(),
				block_height: 800000,
			}
		);
	}
}
