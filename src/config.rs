//! Service configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all) yields a
//! configuration that indexes mainnet from alias activation.

use crate::alias::{
	AddressKind, AliasAddress, AliasPriceTable, DEFAULT_RESERVED_ALIASES, PriceEpoch, PriceTableError,
	ReservedAliases, is_valid_alias, prices::default_price_epochs,
};
use crate::sync::ServerState;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the config file when no path argument is given.
pub const CONFIG_PATH_ENV: &str = "ALIAS_INDEXER_CONFIG";

/// Hash160 of the mainnet registration p2sh address.
const REGISTRATION_ADDRESS_HASH: [u8; 20] = [
	0xd3, 0x7c, 0x4c, 0x80, 0x9f, 0xe9, 0x84, 0x0e, 0x7b, 0xfa, 0x77, 0xb8, 0x6b, 0xd4, 0x71, 0x63, 0xf6,
	0xfb, 0x6c, 0x60,
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Failed to read config file: {0}")]
	Io(#[from] std::io::Error),

	#[error("Failed to parse config file: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Invalid price table: {0}")]
	Prices(#[from] PriceTableError),

	#[error("Invalid configuration: {0}")]
	Invalid(String),
}

/// Credentials and endpoint of the node answering finality queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvalancheRpcConfig {
	pub url: String,
	pub username: String,
	pub password: String,
}

impl Default for AvalancheRpcConfig {
	fn default() -> Self {
		Self {
			url: "http://127.0.0.1:8332".to_string(),
			username: "avalanche".to_string(),
			password: String::new(),
		}
	}
}

/// Bounded exponential backoff for transient failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryPolicy {
	/// Total attempts including the first one.
	pub max_attempts: u32,
	pub initial_interval_ms: u64,
	pub max_interval_ms: u64,
}

impl RetryPolicy {
	pub fn initial_interval(&self) -> Duration {
		Duration::from_millis(self.initial_interval_ms)
	}

	pub fn max_interval(&self) -> Duration {
		Duration::from_millis(self.max_interval_ms)
	}
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 5,
			initial_interval_ms: 500,
			max_interval_ms: 30_000,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexerConfig {
	/// Base URL of the chronik HTTP API.
	pub chronik_url: String,
	/// WebSocket endpoint for block and mempool events.
	pub chronik_ws_url: String,
	pub avalanche_rpc: AvalancheRpcConfig,
	/// Address registrations pay their fee to.
	pub registration_address: AliasAddress,
	/// Cashaddr prefix used to render aliased addresses.
	pub address_prefix: String,
	/// Directory holding the persisted alias state.
	pub data_dir: PathBuf,
	pub history_page_size: usize,
	/// Blocks an unconfirmed registration may wait before it is dropped.
	pub pending_expiration_blocks: u64,
	pub poll_interval_secs: u64,
	/// Seconds to wait before reopening a dropped event subscription.
	pub ws_reconnect_secs: u64,
	pub retry: RetryPolicy,
	pub reserved_aliases: ReservedAliases,
	/// Price epochs, newest first.
	pub prices: Vec<PriceEpoch>,
	/// Cursor used when no state has been persisted yet.
	pub initial_server_state: ServerState,
}

impl Default for IndexerConfig {
	fn default() -> Self {
		Self {
			chronik_url: "https://chronik.e.cash".to_string(),
			chronik_ws_url: "wss://chronik.e.cash/ws".to_string(),
			avalanche_rpc: AvalancheRpcConfig::default(),
			registration_address: AliasAddress::new(AddressKind::P2sh, REGISTRATION_ADDRESS_HASH),
			address_prefix: "ecash".to_string(),
			data_dir: PathBuf::from("./data"),
			history_page_size: 200,
			pending_expiration_blocks: 6,
			poll_interval_secs: 60,
			ws_reconnect_secs: 5,
			retry: RetryPolicy::default(),
			reserved_aliases: DEFAULT_RESERVED_ALIASES.iter().copied().collect(),
			prices: default_price_epochs(),
			initial_server_state: ServerState::default(),
		}
	}
}

impl IndexerConfig {
	/// Load from `path` if given, defaults otherwise.
	pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
		let config = match path {
			Some(path) => Self::from_file(path)?,
			None => Self::default(),
		};
		config.validate()?;
		Ok(config)
	}

	pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path)?;
		Ok(serde_json::from_str(&content)?)
	}

	/// Check the settings that would otherwise only fail mid-sync.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.price_table()?;

		if let Some(alias) = self.reserved_aliases.iter().find(|alias| !is_valid_alias(alias)) {
			return Err(ConfigError::Invalid(format!(
				"reserved alias {:?} is not a valid alias",
				alias
			)));
		}
		if self.history_page_size == 0 {
			return Err(ConfigError::Invalid("historyPageSize must be positive".to_string()));
		}
		if self.retry.max_attempts == 0 {
			return Err(ConfigError::Invalid("retry.maxAttempts must be positive".to_string()));
		}
		if self.poll_interval_secs == 0 {
			return Err(ConfigError::Invalid("pollIntervalSecs must be positive".to_string()));
		}
		if self.address_prefix.is_empty() {
			return Err(ConfigError::Invalid("addressPrefix must not be empty".to_string()));
		}
		Ok(())
	}

	pub fn price_table(&self) -> Result<AliasPriceTable, PriceTableError> {
		AliasPriceTable::new(self.prices.clone())
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_secs)
	}

	pub fn ws_reconnect_delay(&self) -> Duration {
		Duration::from_secs(self.ws_reconnect_secs)
	}
}
