//! # Rollback Engine
//!
//! `VALIDATE → SCAN → (per provider: CLASSIFY → APPLY | SKIP | FAIL) →
//! (CONTINUE | COMPLETE)`.
//!
//! Each invocation is synchronous and stateless apart from the results
//! document. When the soft cutoff passes, the engine saves its results
//! and returns `IN_PROGRESS` with the next provider id; the scheduler
//! calls again with that cursor and the cumulative counters. A provider
//! is always finished (committed or recorded as failed) before the time
//! check runs.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use compact_core::{Clock, ProviderId};
use compact_state::events::{LicenseRevertDetail, LICENSE_REVERT};
use compact_state::model::keys::{license_jurisdiction_key, PROVIDER_ID_ATTRIBUTE};
use compact_state::{EngineError, EventPublisher, ProviderAggregate, UpdateTierBound};
use compact_store::{query_index_all, Consistency, IndexQuery, ObjectStore, RecordStore};

use crate::classify::{classify, Classification};
use crate::config::RollbackConfig;
use crate::error::RollbackError;
use crate::report::{FailedProvider, RollbackResults};
use crate::request::{RollbackInput, RollbackOutput, RollbackRequest, RollbackStatus};

/// Undoes the effects of a faulty license upload over a time window.
#[derive(Clone)]
pub struct RollbackEngine {
    store: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
    events: EventPublisher,
    clock: Arc<dyn Clock>,
    config: RollbackConfig,
}

impl std::fmt::Debug for RollbackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollbackEngine")
            .field("events", &self.events)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RollbackEngine {
    /// Fails if `config` does not validate.
    pub fn new(
        store: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        events: EventPublisher,
        clock: Arc<dyn Clock>,
        config: RollbackConfig,
    ) -> Result<Self, RollbackError> {
        config.validate()?;
        Ok(Self {
            store,
            objects,
            events,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &RollbackConfig {
        &self.config
    }

    /// Run one invocation.
    ///
    /// A rejected request yields `Ok` with status `FAILED`. `Err` means the
    /// scan or the results document failed; outcomes recorded before the
    /// failure are not saved and the same input may be re-run.
    pub fn run(&self, input: &RollbackInput) -> Result<RollbackOutput, RollbackError> {
        let started = self.clock.now();
        let request = match input.validate(&self.config) {
            Ok(request) => request,
            Err(message) => {
                warn!(
                    execution_name = %input.execution_name,
                    error = %message,
                    "rollback request rejected"
                );
                return Ok(RollbackOutput::failed(input.providers_processed, message));
            }
        };

        let results_key = self.config.results_key(&request.execution_name);
        let mut results = RollbackResults::load(self.objects.as_ref(), &results_key)?;
        let providers = self.scan(&request)?;
        info!(
            execution_name = %request.execution_name,
            compact = %request.compact,
            jurisdiction = %request.jurisdiction,
            start = %request.start,
            end = %request.end,
            providers = providers.len(),
            "rollback invocation started"
        );

        let mut processed = request.providers_processed;
        for (n, provider_id) in providers.iter().enumerate() {
            if n > 0 {
                let elapsed = self.clock.now().signed_duration_since(started);
                if elapsed >= self.config.soft_cutoff() {
                    results.save(self.objects.as_ref(), &results_key)?;
                    info!(
                        execution_name = %request.execution_name,
                        continue_from_provider_id = %provider_id,
                        elapsed_secs = elapsed.num_seconds(),
                        "soft cutoff reached, handing back a cursor"
                    );
                    return Ok(output(
                        RollbackStatus::InProgress,
                        processed,
                        &results,
                        Some(*provider_id),
                    ));
                }
            }
            self.process(&request, *provider_id, &mut results);
            processed += 1;
        }

        results.save(self.objects.as_ref(), &results_key)?;
        info!(
            execution_name = %request.execution_name,
            providers_processed = processed,
            providers_reverted = results.reverted(),
            providers_skipped = results.skipped(),
            providers_failed = results.failed(),
            "rollback complete"
        );
        Ok(output(RollbackStatus::Complete, processed, &results, None))
    }

    /// Provider ids with a license or license update in the jurisdiction,
    /// sorted, starting at the cursor.
    fn scan(&self, request: &RollbackRequest) -> Result<Vec<ProviderId>, RollbackError> {
        let query = IndexQuery::new(
            self.config.license_jurisdiction_index.clone(),
            license_jurisdiction_key(&request.compact, &request.jurisdiction),
        )
        .with_limit(self.config.scan_page_size);
        let items = query_index_all(self.store.as_ref(), query).map_err(RollbackError::Scan)?;

        let mut ids = BTreeSet::new();
        for item in &items {
            match item.get_str(PROVIDER_ID_ATTRIBUTE).map(ProviderId::parse) {
                Some(Ok(id)) => {
                    ids.insert(id);
                }
                _ => warn!(key = ?item.key().ok(), "index entry without a valid providerId"),
            }
        }
        Ok(ids
            .into_iter()
            .filter(|id| request.continue_from.map_or(true, |from| *id >= from))
            .collect())
    }

    /// Classify and apply one provider, recording the outcome. Never fails:
    /// every error becomes a failed entry.
    fn process(&self, request: &RollbackRequest, provider_id: ProviderId, results: &mut RollbackResults) {
        if let Err(err) = self.try_process(request, provider_id, results) {
            warn!(
                execution_name = %request.execution_name,
                provider_id = %provider_id,
                error = %err,
                "provider rollback failed"
            );
            results.failed_provider_details.push(FailedProvider {
                provider_id,
                error: err.to_string(),
            });
        }
    }

    fn try_process(
        &self,
        request: &RollbackRequest,
        provider_id: ProviderId,
        results: &mut RollbackResults,
    ) -> Result<(), ProviderFailure> {
        let aggregate = match ProviderAggregate::load(
            self.store.as_ref(),
            &request.compact,
            &provider_id,
            UpdateTierBound::ALL,
            Consistency::Strong,
        ) {
            Ok(aggregate) => aggregate,
            Err(EngineError::NotFound(_)) => {
                debug!(provider_id = %provider_id, "provider vanished since the scan");
                return Ok(());
            }
            Err(err) => return Err(ProviderFailure::Engine(err)),
        };

        let rollback = match classify(&aggregate, request).map_err(ProviderFailure::Engine)? {
            Classification::NoChange => {
                debug!(provider_id = %provider_id, "nothing in the window");
                return Ok(());
            }
            Classification::Skip(skipped) => {
                info!(
                    execution_name = %request.execution_name,
                    provider_id = %provider_id,
                    reason = %skipped.reason,
                    ineligible = skipped.ineligible_updates.len(),
                    "provider skipped"
                );
                results.skipped_provider_details.push(skipped);
                return Ok(());
            }
            Classification::Rollback(rollback) => rollback,
        };

        let items = rollback.transact_items().map_err(ProviderFailure::Store)?;
        self.store
            .transact_write(items)
            .map_err(ProviderFailure::Store)?;
        info!(
            execution_name = %request.execution_name,
            provider_id = %provider_id,
            licenses = rollback.licenses.len(),
            updates_deleted = rollback.stale_updates.len(),
            "provider rolled back"
        );

        for license in rollback.reverted_licenses() {
            self.events
                .publish(
                    LICENSE_REVERT,
                    &LicenseRevertDetail {
                        compact: request.compact.clone(),
                        provider_id,
                        jurisdiction: license.jurisdiction.clone(),
                        license_type_abbreviation: license.license_type_abbr.clone(),
                        rollback_reason: request.rollback_reason.clone(),
                        start_time: request.start,
                        end_time: request.end,
                        execution_name: request.execution_name.clone(),
                    },
                )
                .map_err(ProviderFailure::Event)?;
        }
        results
            .reverted_provider_summaries
            .push(rollback.summary(&aggregate));
        Ok(())
    }
}

/// Why one provider could not be rolled back. Displays the raw cause.
#[derive(Debug, thiserror::Error)]
enum ProviderFailure {
    #[error("{0}")]
    Engine(EngineError),
    #[error("{0}")]
    Store(compact_store::StoreError),
    #[error("rollback applied but revert event not published: {0}")]
    Event(compact_store::EventError),
}

fn output(
    status: RollbackStatus,
    processed: u64,
    results: &RollbackResults,
    continue_from: Option<ProviderId>,
) -> RollbackOutput {
    RollbackOutput {
        rollback_status: status,
        providers_processed: processed,
        providers_reverted: results.reverted(),
        providers_skipped: results.skipped(),
        providers_failed: results.failed(),
        continue_from_provider_id: continue_from,
        error: None,
    }
}
