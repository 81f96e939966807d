//! Alias synchronization.
//!
//! The sync module keeps the published alias state in step with the registration
//! address history:
//! - `HistoryFetcher` pages through history down to the sync cursor
//! - `CandidatePool` holds every claim the resolver has to consider
//! - `SyncEngine` drives cycles, persists them through a `StateStore` and publishes
//!   the result to `AliasDirectory` readers
//! - `EventDispatcher` fans cycle events out to registered handlers

pub mod engine;
pub mod events;
pub mod fetcher;
pub mod pool;
pub mod progress_tracker;
pub mod retry;
pub mod types;

pub use engine::{CycleReport, SyncEngine, SyncTrigger};
pub use events::{EventDispatcher, LoggingEventHandler, SyncEvent, SyncEventHandler};
pub use fetcher::HistoryFetcher;
pub use pool::CandidatePool;
pub use progress_tracker::{SyncProgressTracker, SyncStats};
pub use types::*;
