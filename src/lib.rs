//! Indexer for on-chain alias registrations.
//!
//! Aliases are claimed by paying a registration address with an OP_RETURN naming the
//! alias and the address it should resolve to. This crate follows that address's
//! history, decides which claim owns each alias and serves the result:
//! - `indexer` talks to the ledger indexer and the finality oracle
//! - `alias` decodes claims and resolves conflicts between them
//! - `sync` runs the fetch and resolve cycles
//! - `store` persists the resolved state
//! - `directory` answers lookups against the last published state

pub mod alias;
pub mod config;
pub mod directory;
pub mod indexer;
pub mod store;
pub mod sync;
pub mod utils;

pub use config::{ConfigError, IndexerConfig};
pub use directory::AliasDirectory;
pub use sync::{SyncEngine, SyncError, SyncTrigger};
