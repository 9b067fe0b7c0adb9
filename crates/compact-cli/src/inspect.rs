//! `compact inspect`: print one provider's records and history.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use serde_json::json;

use compact_core::{CompactCode, ProviderId, SystemClock};
use compact_state::{EngineConfig, EngineContext, UpdateTierBound};
use compact_store::InMemoryEventBus;

use crate::snapshot;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Record store snapshot (JSON array of items).
    #[arg(long)]
    pub snapshot: PathBuf,

    #[arg(long)]
    pub compact: String,

    #[arg(long)]
    pub provider_id: String,

    /// Highest history tier to include (0 = current state only).
    #[arg(long)]
    pub max_tier: Option<u8>,
}

pub fn run_inspect(args: &InspectArgs) -> anyhow::Result<u8> {
    let mut config = EngineConfig::from_env()?;
    if let Some(tier) = args.max_tier {
        config.history_bound = UpdateTierBound::from_number(tier)
            .ok_or_else(|| anyhow::anyhow!("--max-tier must be 0-3, got {tier}"))?;
    }
    let compact = CompactCode::new(&args.compact)?;
    let provider_id = ProviderId::parse(&args.provider_id)?;
    let store = snapshot::open(&args.snapshot)?;
    let ctx = EngineContext::new(
        Arc::new(store),
        Arc::new(InMemoryEventBus::new()),
        Arc::new(SystemClock),
        config,
    );

    let aggregate = ctx.load_view(&compact, &provider_id)?;
    let view = json!({
        "provider": aggregate.provider(),
        "licenses": aggregate.licenses(),
        "privileges": aggregate.privileges(),
        "adverseActions": aggregate.adverse_actions(),
        "investigations": aggregate.investigations(),
        "updates": aggregate.updates(),
    });
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(0)
}
