//! Persistence of the published alias state.
//!
//! A store holds exactly one snapshot: the Valid and Pending maps together with the
//! sync cursor. Implementations must replace it atomically, so a reader of the store
//! never observes maps from one cycle next to a cursor from another.

/// JSON file store
mod file;
/// In-process store
mod memory;

pub use file::FileStateStore;
pub use memory::MemoryStateStore;

use crate::sync::AliasSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Serialization error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Store unavailable: {0}")]
	Unavailable(String),
}

impl StoreError {
	pub fn is_transient(&self) -> bool {
		!matches!(self, StoreError::Json(_))
	}
}

/// Repository for the alias snapshot
#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
	/// Load the last saved snapshot, `None` if nothing was saved yet.
	async fn load_state(&self) -> Result<Option<AliasSnapshot>, StoreError>;

	/// Replace the stored snapshot. Either all of `snapshot` is written or nothing is.
	async fn save_state(&self, snapshot: &AliasSnapshot) -> Result<(), StoreError>;
}
