//! `compact rollback`: drive the rollback engine to completion.
//!
//! Acts as the external scheduler: each invocation that stops at the soft
//! cutoff is re-run with the returned cursor and counters until the
//! engine reports `COMPLETE` or `FAILED`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Args;

use compact_core::SystemClock;
use compact_recovery::{RollbackConfig, RollbackEngine, RollbackInput, RollbackStatus};
use compact_state::EngineConfig;
use compact_state::EventPublisher;
use compact_store::{FsObjectStore, InMemoryEventBus};

use crate::snapshot;

#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Record store snapshot (JSON array of items).
    #[arg(long)]
    pub snapshot: PathBuf,

    /// Where to write the store afterwards. Defaults to the snapshot path.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Directory holding `{execution}/rollback-results.json`.
    #[arg(long, default_value = "rollback-results")]
    pub results_dir: PathBuf,

    /// Rollback configuration (YAML). Environment variables otherwise.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub compact: String,

    #[arg(long)]
    pub jurisdiction: String,

    /// Window start, RFC 3339, inclusive.
    #[arg(long)]
    pub start: String,

    /// Window end, RFC 3339, exclusive.
    #[arg(long)]
    pub end: String,

    #[arg(long)]
    pub reason: String,

    #[arg(long)]
    pub execution_name: String,

    /// Resume an execution at this provider id.
    #[arg(long)]
    pub continue_from: Option<String>,

    /// Stop after this many invocations even if the engine is not done.
    #[arg(long, default_value_t = 1000)]
    pub max_invocations: u32,
}

impl RollbackArgs {
    fn input(&self) -> RollbackInput {
        RollbackInput {
            compact: self.compact.clone(),
            jurisdiction: self.jurisdiction.clone(),
            start_date_time: self.start.clone(),
            end_date_time: self.end.clone(),
            rollback_reason: self.reason.clone(),
            execution_name: self.execution_name.clone(),
            providers_processed: 0,
            continue_from_provider_id: self.continue_from.clone(),
        }
    }

    fn rollback_config(&self) -> anyhow::Result<RollbackConfig> {
        match &self.config {
            Some(path) => {
                let yaml = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                Ok(RollbackConfig::from_yaml_str(&yaml)?)
            }
            None => Ok(RollbackConfig::from_env()?),
        }
    }
}

/// Returns 0 on `COMPLETE`, 2 on `FAILED`.
pub fn run_rollback(args: &RollbackArgs) -> anyhow::Result<u8> {
    let config = args.rollback_config()?;
    let engine_config = EngineConfig::from_env()?;
    let store = snapshot::open(&args.snapshot)?;
    let bus = InMemoryEventBus::new();
    let engine = RollbackEngine::new(
        Arc::new(store.clone()),
        Arc::new(FsObjectStore::new(&args.results_dir)),
        EventPublisher::new(Arc::new(bus.clone()), engine_config.event_source),
        Arc::new(SystemClock),
        config,
    )?;

    let mut input = args.input();
    let mut invocations = 0;
    let output = loop {
        invocations += 1;
        let output = engine.run(&input)?;
        tracing::info!(
            execution_name = %input.execution_name,
            invocation = invocations,
            status = ?output.rollback_status,
            providers_processed = output.providers_processed,
            "rollback invocation finished"
        );
        match output.next_input(&input) {
            Some(next) if invocations < args.max_invocations => input = next,
            Some(_) => {
                snapshot::save(&store, args.output.as_ref().unwrap_or(&args.snapshot))?;
                bail!(
                    "rollback still in progress after {invocations} invocations; resume with --continue-from {}",
                    output
                        .continue_from_provider_id
                        .map(|id| id.to_string())
                        .unwrap_or_default()
                );
            }
            None => break output,
        }
    };

    for event in bus.published() {
        tracing::info!(
            detail_type = %event.detail_type,
            detail = %serde_json::Value::Object(event.detail),
            "event published"
        );
    }
    if output.rollback_status != RollbackStatus::Failed {
        snapshot::save(&store, args.output.as_ref().unwrap_or(&args.snapshot))?;
    }
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(match output.rollback_status {
        RollbackStatus::Failed => 2,
        _ => 0,
    })
}
