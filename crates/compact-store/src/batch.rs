//! Batch reads with exponential backoff for unprocessed keys.
//!
//! A store may return only part of a batch under load. The unprocessed
//! keys are retried after a growing delay; anything still outstanding after
//! the last retry is an error rather than a silently short result.

use std::time::Duration;

use crate::error::StoreError;
use crate::item::{Item, RecordKey};
use crate::store::{Consistency, RecordStore};

/// Retry schedule for unprocessed batch-get keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial request.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    /// Delays: 50ms → 100ms → 200ms.
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
        }
    }
}

/// Fetch every key, retrying unprocessed keys per `policy`.
pub fn batch_get_all(
    store: &dyn RecordStore,
    keys: &[RecordKey],
    consistency: Consistency,
    policy: RetryPolicy,
) -> Result<Vec<Item>, StoreError> {
    let mut items = Vec::with_capacity(keys.len());
    let mut pending = keys.to_vec();
    let mut attempt = 0u32;
    while !pending.is_empty() {
        let output = store.batch_get(&pending, consistency)?;
        items.extend(output.items);
        pending = output.unprocessed;
        if pending.is_empty() {
            break;
        }
        if attempt >= policy.max_retries {
            return Err(StoreError::Unprocessed {
                remaining: pending.len(),
                attempts: attempt + 1,
            });
        }
        let delay = policy.base_delay * 2u32.pow(attempt);
        tracing::warn!(
            attempt = attempt + 1,
            max_retries = policy.max_retries,
            remaining = pending.len(),
            "batch get left keys unprocessed, retrying in {delay:?}"
        );
        std::thread::sleep(delay);
        attempt += 1;
    }
    Ok(items)
}
