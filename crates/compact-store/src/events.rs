//! # Event Bus
//!
//! Engines announce cross-record consequences (license reverted,
//! privilege encumbrance lifted) on an event bus. Publishing is
//! fire-and-check: a delivery failure comes back as an [`EventError`] and
//! the caller decides whether it is fatal. Nothing here swallows it.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from publishing an event.
#[derive(Error, Debug)]
pub enum EventError {
    /// The bus rejected or failed to deliver the event.
    #[error("failed to publish {detail_type}: {reason}")]
    Delivery {
        /// Detail type of the rejected event.
        detail_type: String,
        /// Bus-reported reason.
        reason: String,
    },

    /// The event detail could not be serialized.
    #[error("event serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A published event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// Logical producer, e.g. `org.compactconnect.provider-data`.
    pub source: String,
    /// Event kind, e.g. `license.revert`.
    pub detail_type: String,
    /// Event payload.
    pub detail: Map<String, Value>,
}

/// Destination for domain events.
pub trait EventBus: Send + Sync {
    /// Publish one event.
    fn publish(
        &self,
        source: &str,
        detail_type: &str,
        detail: Map<String, Value>,
    ) -> Result<(), EventError>;
}

/// Event bus that records events in memory.
///
/// Clones share the same event log.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventBus {
    events: Arc<Mutex<Vec<EventEnvelope>>>,
    fail_next: Arc<Mutex<Option<String>>>,
}

impl InMemoryEventBus {
    /// An empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event published so far, in order.
    pub fn published(&self) -> Vec<EventEnvelope> {
        self.events.lock().clone()
    }

    /// Published events of one detail type.
    pub fn of_type(&self, detail_type: &str) -> Vec<EventEnvelope> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.detail_type == detail_type)
            .cloned()
            .collect()
    }

    /// Reject the next publish with `reason`.
    pub fn fail_next_publish(&self, reason: &str) {
        *self.fail_next.lock() = Some(reason.to_string());
    }
}

impl EventBus for InMemoryEventBus {
    fn publish(
        &self,
        source: &str,
        detail_type: &str,
        detail: Map<String, Value>,
    ) -> Result<(), EventError> {
        if let Some(reason) = self.fail_next.lock().take() {
            return Err(EventError::Delivery {
                detail_type: detail_type.to_string(),
                reason,
            });
        }
        tracing::debug!(source, detail_type, "event published");
        self.events.lock().push(EventEnvelope {
            source: source.to_string(),
            detail_type: detail_type.to_string(),
            detail,
        });
        Ok(())
    }
}
