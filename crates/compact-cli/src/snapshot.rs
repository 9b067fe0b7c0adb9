//! Record store snapshots on disk.

use std::path::Path;

use anyhow::Context;

use compact_state::model::keys::{
    LICENSE_JURISDICTION_INDEX, LICENSE_JURISDICTION_KEY_ATTRIBUTE, PROVIDER_ID_ATTRIBUTE,
};
use compact_store::{IndexDefinition, InMemoryRecordStore};

/// Load a snapshot into a store with the license-jurisdiction index
/// registered.
pub fn open(path: &Path) -> anyhow::Result<InMemoryRecordStore> {
    let store = InMemoryRecordStore::new().with_index(IndexDefinition::new(
        LICENSE_JURISDICTION_INDEX,
        LICENSE_JURISDICTION_KEY_ATTRIBUTE,
        PROVIDER_ID_ATTRIBUTE,
    ));
    let count = store
        .load_json_file(path)
        .with_context(|| format!("loading snapshot {}", path.display()))?;
    tracing::debug!(path = %path.display(), items = count, "snapshot loaded");
    Ok(store)
}

/// Write the store back out.
pub fn save(store: &InMemoryRecordStore, path: &Path) -> anyhow::Result<()> {
    store
        .save_json_file(path)
        .with_context(|| format!("writing snapshot {}", path.display()))?;
    tracing::debug!(path = %path.display(), items = store.len(), "snapshot written");
    Ok(())
}
