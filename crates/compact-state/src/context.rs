//! Collaborators shared by the engines.

use std::sync::Arc;

use tracing::warn;

use compact_core::{Clock, CompactCode, ProviderId};
use compact_store::{Consistency, EventBus, RecordKey, RecordStore};

use crate::aggregate::ProviderAggregate;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::EventPublisher;
use crate::model::UpdateTierBound;
use crate::txn::TransactionPlan;

/// Store, clock, event publisher and configuration, cheaply cloneable.
#[derive(Clone)]
pub struct EngineContext {
    pub store: Arc<dyn RecordStore>,
    pub clock: Arc<dyn Clock>,
    pub events: EventPublisher,
    pub config: EngineConfig,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("events", &self.events)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EngineContext {
    pub fn new(
        store: Arc<dyn RecordStore>,
        bus: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        let events = EventPublisher::new(bus, config.event_source.clone());
        Self {
            store,
            clock,
            events,
            config,
        }
    }

    /// Strongly consistent current state, the basis of every decision.
    pub fn load_state(
        &self,
        compact: &CompactCode,
        provider_id: &ProviderId,
    ) -> Result<ProviderAggregate, EngineError> {
        ProviderAggregate::load(
            self.store.as_ref(),
            compact,
            provider_id,
            UpdateTierBound::None,
            Consistency::Strong,
        )
    }

    /// State plus configured history, eventually consistent. For display
    /// only; never decide on it.
    pub fn load_view(
        &self,
        compact: &CompactCode,
        provider_id: &ProviderId,
    ) -> Result<ProviderAggregate, EngineError> {
        ProviderAggregate::load(
            self.store.as_ref(),
            compact,
            provider_id,
            self.config.history_bound,
            Consistency::Eventual,
        )
    }

    /// Commit a plan. A failed condition on `not_found_key` means the
    /// record the operation addresses disappeared or changed state, and
    /// becomes [`EngineError::NotFound`]; any other failed condition is a
    /// lost race and becomes [`EngineError::Conflict`].
    pub(crate) fn commit(
        &self,
        plan: TransactionPlan,
        operation: &str,
        not_found_key: Option<&RecordKey>,
    ) -> Result<(), EngineError> {
        let items = plan.len();
        plan.commit(self.store.as_ref()).map_err(|err| {
            warn!(operation, items, error = %err, "transaction rejected");
            match not_found_key {
                Some(key) if err.condition_failed_for(key) => {
                    EngineError::NotFound(format!("{operation}: {key} is absent or already final"))
                }
                _ if err.is_condition_failure() => {
                    EngineError::Conflict(format!("{operation}: {err}"))
                }
                _ => EngineError::StoreTransient(err),
            }
        })
    }
}
