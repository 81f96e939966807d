//! Avalanche finality checks over node JSON-RPC.

use super::FinalityOracle;
use super::types::IndexerError;
use crate::config::AvalancheRpcConfig;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RpcResponse {
	result: Option<bool>,
	error: Option<serde_json::Value>,
}

/// Client for the node's `isfinalblock` RPC method.
#[derive(Clone)]
pub struct AvalancheRpcClient {
	http_client: Client,
	config: AvalancheRpcConfig,
}

impl AvalancheRpcClient {
	pub fn new(config: AvalancheRpcConfig) -> Result<Self, IndexerError> {
		let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;
		Ok(Self {
			http_client,
			config,
		})
	}
}

#[async_trait::async_trait]
impl FinalityOracle for AvalancheRpcClient {
	async fn is_final(&self, block_hash: &str) -> Result<bool, IndexerError> {
		let request_body = json!({
			"jsonrpc": "1.0",
			"id": "isfinalblock",
			"method": "isfinalblock",
			"params": [block_hash],
		});

		let response = self
			.http_client
			.post(&self.config.url)
			.basic_auth(&self.config.username, Some(&self.config.password))
			.json(&request_body)
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(IndexerError::RpcError(format!(
				"HTTP error: {}",
				response.status()
			)));
		}

		let rpc: RpcResponse = response.json().await?;
		if let Some(error) = rpc.error.filter(|e| !e.is_null()) {
			return Err(IndexerError::RpcError(format!("isfinalblock: {}", error)));
		}

		let is_final = rpc.result.ok_or(IndexerError::NoData)?;
		debug!("Block {} final: {}", block_hash, is_final);
		Ok(is_final)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_successful_response() {
		let rpc: RpcResponse =
			serde_json::from_str(r#"{"result": true, "error": null, "id": "isfinalblock"}"#).unwrap();
		assert_eq!(rpc.result, Some(true));
		assert!(rpc.error.filter(|e| !e.is_null()).is_none());
	}

	#[test]
	fn parses_error_response() {
		let rpc: RpcResponse = serde_json::from_str(
			r#"{"result": null, "error": {"code": -5, "message": "Block not found"}, "id": "isfinalblock"}"#,
		)
		.unwrap();
		assert_eq!(rpc.result, None);
		assert!(rpc.error.filter(|e| !e.is_null()).is_some());
	}

	#[test]
	fn builds_client_from_default_config() {
		assert!(AvalancheRpcClient::new(AvalancheRpcConfig::default()).is_ok());
	}
}
