use super::{StateStore, StoreError};
use crate::sync::AliasSnapshot;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::info;

const STATE_FILENAME: &str = "alias_state.json";

/// On-disk layout: the snapshot plus when it was written.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedState {
	#[serde(flatten)]
	snapshot: AliasSnapshot,
	saved_at: String,
}

/// File-based implementation of StateStore
///
/// The snapshot is written to a temporary sibling, synced to disk and renamed over the
/// state file, so a crash mid-write leaves the previous state in place.
pub struct FileStateStore {
	data_dir: PathBuf,
}

impl FileStateStore {
	pub fn new(data_dir: PathBuf) -> Self {
		Self { data_dir }
	}

	pub fn state_path(&self) -> PathBuf {
		self.data_dir.join(STATE_FILENAME)
	}

	fn temp_path(&self) -> PathBuf {
		self.data_dir.join(format!("{}.tmp", STATE_FILENAME))
	}

	async fn ensure_data_dir(&self) -> Result<(), StoreError> {
		if !Path::new(&self.data_dir).exists() {
			tokio::fs::create_dir_all(&self.data_dir).await?;
		}
		Ok(())
	}
}

#[async_trait::async_trait]
impl StateStore for FileStateStore {
	async fn load_state(&self) -> Result<Option<AliasSnapshot>, StoreError> {
		let filename = self.state_path();
		let content = match tokio::fs::read_to_string(&filename).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(e.into()),
		};

		let persisted: PersistedState = serde_json::from_str(&content)?;
		info!(
			"Loaded alias state from {:?} saved at {} ({} valid, {} pending, height {})",
			filename,
			persisted.saved_at,
			persisted.snapshot.valid.len(),
			persisted.snapshot.pending.len(),
			persisted.snapshot.server_state.processed_blockheight
		);
		Ok(Some(persisted.snapshot))
	}

	async fn save_state(&self, snapshot: &AliasSnapshot) -> Result<(), StoreError> {
		self.ensure_data_dir().await?;

		let persisted = PersistedState {
			snapshot: snapshot.clone(),
			saved_at: chrono::Utc::now().to_rfc3339(),
		};
		let content = serde_json::to_string_pretty(&persisted)?;

		let temp_path = self.temp_path();
		let mut file = tokio::fs::File::create(&temp_path).await?;
		file.write_all(content.as_bytes()).await?;
		file.sync_all().await?;
		drop(file);
		tokio::fs::rename(&temp_path, self.state_path()).await?;

		info!(
			"Saved alias state to {:?} at height {}",
			self.state_path(),
			snapshot.server_state.processed_blockheight
		);
		Ok(())
	}
}
