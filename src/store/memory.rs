use super::{StateStore, StoreError};
use crate::sync::AliasSnapshot;

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// In-process implementation of StateStore.
///
/// Saves can be made to fail a given number of times, which exercises retry and
/// abort paths without touching the filesystem.
#[derive(Default)]
pub struct MemoryStateStore {
	snapshot: Mutex<Option<AliasSnapshot>>,
	failures_remaining: AtomicU32,
	save_count: AtomicUsize,
}

impl MemoryStateStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// A store that already holds `snapshot`.
	pub fn with_snapshot(snapshot: AliasSnapshot) -> Self {
		Self {
			snapshot: Mutex::new(Some(snapshot)),
			..Self::default()
		}
	}

	/// Make the next `count` saves fail.
	pub fn fail_next_saves(&self, count: u32) {
		self.failures_remaining.store(count, Ordering::SeqCst);
	}

	/// Successful saves so far.
	pub fn save_count(&self) -> usize {
		self.save_count.load(Ordering::SeqCst)
	}

	pub fn snapshot(&self) -> Option<AliasSnapshot> {
		self.snapshot.lock().ok().and_then(|guard| guard.clone())
	}
}

#[async_trait::async_trait]
impl StateStore for MemoryStateStore {
	async fn load_state(&self) -> Result<Option<AliasSnapshot>, StoreError> {
		let guard = self
			.snapshot
			.lock()
			.map_err(|e| StoreError::Unavailable(format!("Failed to acquire store lock: {}", e)))?;
		Ok(guard.clone())
	}

	async fn save_state(&self, snapshot: &AliasSnapshot) -> Result<(), StoreError> {
		let injected = self
			.failures_remaining
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
			.is_ok();
		if injected {
			return Err(StoreError::Unavailable("injected save failure".to_string()));
		}

		let mut guard = self
			.snapshot
			.lock()
			.map_err(|e| StoreError::Unavailable(format!("Failed to acquire store lock: {}", e)))?;
		*guard = Some(snapshot.clone());
		self.save_count.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}
