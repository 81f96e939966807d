//! Bounded exponential backoff around fallible async calls.

use super::types::SyncError;
use crate::config::RetryPolicy;

use backoff::ExponentialBackoffBuilder;
use backoff::future::retry;
use tracing::warn;

/// Run `operation` until it succeeds, fails with a non-transient error, or has been
/// attempted `policy.max_attempts` times.
///
/// The last error is returned unchanged when the attempts run out.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, what: &str, mut operation: F) -> Result<T, SyncError>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: Into<SyncError>,
{
	let backoff = ExponentialBackoffBuilder::new()
		.with_initial_interval(policy.initial_interval())
		.with_max_interval(policy.max_interval())
		.with_max_elapsed_time(None)
		.build();
	let max_attempts = policy.max_attempts.max(1);
	let mut attempt: u32 = 0;

	retry(backoff, || {
		attempt += 1;
		let current = attempt;
		let call = operation();
		async move {
			match call.await {
				Ok(value) => Ok(value),
				Err(e) => {
					let e: SyncError = e.into();
					if !e.is_retryable() || current >= max_attempts {
						return Err(backoff::Error::permanent(e));
					}
					warn!("{} failed (attempt {}/{}): {}", what, current, max_attempts, e);
					Err(backoff::Error::transient(e))
				}
			}
		}
	})
	.await
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::ConfigError;
	use crate::indexer::IndexerError;
	use std::sync::Arc;
	use std::sync::atomic::{AtomicU32, Ordering};

	fn fast_policy(max_attempts: u32) -> RetryPolicy {
		RetryPolicy {
			max_attempts,
			initial_interval_ms: 1,
			max_interval_ms: 2,
		}
	}

	#[tokio::test]
	async fn succeeds_after_transient_failures() {
		let calls = Arc::new(AtomicU32::new(0));
		let result = with_retry(&fast_policy(5), "test call", || {
			let calls = calls.clone();
			async move {
				if calls.fetch_add(1, Ordering::SeqCst) < 2 {
					Err(IndexerError::NoData)
				} else {
					Ok(7)
				}
			}
		})
		.await;

		assert_eq!(result.unwrap(), 7);
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn gives_up_after_max_attempts() {
		let calls = Arc::new(AtomicU32::new(0));
		let result: Result<(), _> = with_retry(&fast_policy(3), "test call", || {
			let calls = calls.clone();
			async move {
				calls.fetch_add(1, Ordering::SeqCst);
				Err(IndexerError::RpcError("timeout".to_string()))
			}
		})
		.await;

		assert!(matches!(result, Err(SyncError::IndexerError(IndexerError::RpcError(_)))));
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn permanent_errors_are_not_retried() {
		let calls = Arc::new(AtomicU32::new(0));
		let result: Result<(), _> = with_retry(&fast_policy(5), "test call", || {
			let calls = calls.clone();
			async move {
				calls.fetch_add(1, Ordering::SeqCst);
				Err(ConfigError::Invalid("bad".to_string()))
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}
}
