//! CLI command implementations.

pub mod ask;
pub mod facts;
pub mod ingest;
pub mod search;

use anyhow::Context;
use mentat_config::AppConfig;
use mentat_memory::{FactStore, SnapshotStore};
use mentat_planner::OllamaEmbedder;
use std::sync::Arc;

/// Load config and make sure the data directory exists.
pub fn load_config() -> anyhow::Result<AppConfig> {
    let config = AppConfig::load()?;
    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!(
            "Failed to create data directory {}",
            config.data_dir.display()
        )
    })?;
    Ok(config)
}

/// Fact store restored from the latest snapshot, plus the snapshot store
/// used to write it back.
pub async fn load_facts(config: &AppConfig) -> anyhow::Result<(Arc<FactStore>, Arc<SnapshotStore>)> {
    let facts = Arc::new(FactStore::new());
    let snapshots = Arc::new(SnapshotStore::new(
        config.snapshot_path(),
        config.memory.max_snapshot_bytes,
        config.memory.max_rotated_files,
    ));
    snapshots.load(&facts).await?;
    Ok((facts, snapshots))
}

pub fn embedder(config: &AppConfig) -> anyhow::Result<Arc<OllamaEmbedder>> {
    Ok(Arc::new(OllamaEmbedder::new(
        config.embedding.base_url.clone(),
        config.embedding.model.clone(),
        config.index.dimension,
    )?))
}
