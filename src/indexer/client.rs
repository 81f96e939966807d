//!
//! HTTP and WebSocket client for the chronik-style ledger indexer.
//!
//! This module provides an async client for reading paginated address history and the
//! chain tip over HTTP, and for subscribing to block and mempool events for the
//! registration address over a WebSocket. All methods are async and designed for use
//! with Tokio.

use super::LedgerIndexer;
use super::types::*;
use crate::alias::AliasAddress;
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tokio_tungstenite::{
	connect_async,
	tungstenite::{Message, client::IntoClientRequest},
};
use tracing::{debug, info};

/// Chronik-style indexer client
#[derive(Clone)]
pub struct ChronikIndexerClient {
	/// The underlying HTTP client for REST queries.
	http_client: Client,
	/// The base URL for the indexer HTTP endpoint.
	indexer_url: String,
	/// The WebSocket URL for real-time block and mempool events.
	ws_url: String,
}

impl ChronikIndexerClient {
	/// Create a new indexer client.
	///
	/// # Arguments
	/// * `indexer_url` - The HTTP endpoint for history and tip queries.
	/// * `ws_url` - The WebSocket endpoint for event subscriptions.
	///
	/// # Errors
	/// Returns `IndexerError::HttpError` if the HTTP client cannot be built.
	pub fn new(indexer_url: String, ws_url: String) -> Result<Self, IndexerError> {
		let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;

		Ok(Self {
			http_client,
			indexer_url: indexer_url.trim_end_matches('/').to_string(),
			ws_url,
		})
	}

	/// Subscribe to block and mempool events for a script.
	///
	/// # Arguments
	/// * `address` - The script whose mempool activity should be reported.
	///
	/// # Returns
	/// A pinned async stream of `BlockEvent` results. Each item is either an event or an error.
	/// Unknown message types and keep-alive frames are skipped.
	///
	/// # Errors
	/// Returns `IndexerError` if the WebSocket connection or subscription fails.
	pub async fn subscribe_events(
		&self,
		address: &AliasAddress,
	) -> Result<
		std::pin::Pin<
			Box<dyn futures_util::Stream<Item = Result<BlockEvent, IndexerError>> + Send>,
		>,
		IndexerError,
	> {
		debug!("Attempting WebSocket connection to: {}", self.ws_url);

		let request = self.ws_url.clone().into_client_request()?;
		let (ws_stream, response) = connect_async(request).await?;
		debug!(
			"WebSocket connection established, response status: {}",
			response.status()
		);
		let (mut ws_sender, ws_receiver) = ws_stream.split();

		let subscribe_message = json!({
			"type": "subscribe",
			"payload": {
				"blocks": true,
				"scripts": [{
					"type": address.kind.as_str(),
					"payload": address.hash_hex(),
				}],
			}
		});

		ws_sender
			.send(Message::Text(subscribe_message.to_string()))
			.await?;

		info!(
			"Subscribed to block and mempool events for {} script {}",
			address.kind.as_str(),
			address.hash_hex()
		);

		let stream = ws_receiver.filter_map(|msg| async move {
			match msg {
				Ok(Message::Text(text)) => {
					match serde_json::from_str::<serde_json::Value>(&text) {
						Ok(parsed) => match parsed.get("type").and_then(|t| t.as_str()) {
							Some("BlockConnected" | "AddedToMempool" | "RemovedFromMempool") => {
								Some(serde_json::from_value::<BlockEvent>(parsed).map_err(IndexerError::from))
							}
							Some("error") => {
								let error_msg = parsed
									.get("message")
									.and_then(|m| m.as_str())
									.unwrap_or("Unknown subscription error");
								Some(Err(IndexerError::SubscriptionError(error_msg.to_string())))
							}
							Some(other) => {
								debug!("Ignoring message type: {}", other);
								None
							}
							None => Some(Err(IndexerError::SubscriptionError(
								"Message missing type field".to_string(),
							))),
						},
						Err(e) => Some(Err(IndexerError::JsonError(e))),
					}
				}
				Ok(Message::Close(_)) => Some(Err(IndexerError::SubscriptionError(
					"Connection closed by indexer".to_string(),
				))),
				Ok(_) => None,
				Err(e) => Some(Err(IndexerError::WebSocketError(e))),
			}
		});

		Ok(Box::pin(stream))
	}

	/// Execute a GET request and decode the JSON body.
	///
	/// # Arguments
	/// * `url` - The full request URL.
	///
	/// # Returns
	/// The decoded response, or an `IndexerError` if the request fails or returns a non-success status.
	async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, IndexerError> {
		let response = self.http_client.get(url).send().await?;

		if !response.status().is_success() {
			return Err(IndexerError::RpcError(format!(
				"HTTP error: {} for {}",
				response.status(),
				url
			)));
		}

		Ok(response.json::<T>().await?)
	}
}

#[async_trait::async_trait]
impl LedgerIndexer for ChronikIndexerClient {
	async fn blockchain_info(&self) -> Result<BlockchainInfo, IndexerError> {
		let url = format!("{}/blockchain-info", self.indexer_url);
		self.get_json(&url).await
	}

	async fn history_page(
		&self,
		address: &AliasAddress,
		page: usize,
		page_size: usize,
	) -> Result<HistoryPage, IndexerError> {
		let url = format!(
			"{}/script/{}/{}/history?page={}&page_size={}",
			self.indexer_url,
			address.kind.as_str(),
			address.hash_hex(),
			page,
			page_size
		);
		debug!("Fetching history page {} ({} per page)", page, page_size);
		self.get_json(&url).await
	}
}
