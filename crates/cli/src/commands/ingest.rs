//! `mentat ingest` — embed a transcript file into the vector index.
//!
//! The file is a JSON array of timed segments (`text`, `start`,
//! `duration`). Segments are grouped into chunks, embedded in the
//! background, and progress is polled until the job reaches a terminal
//! state.

use anyhow::{Context, bail};
use mentat_memory::{IngestState, IngestTracker, RawSegment, VectorIndex, group_segments};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub async fn run(file: PathBuf, group_id: String) -> anyhow::Result<()> {
    let config = super::load_config()?;

    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let segments: Vec<RawSegment> =
        serde_json::from_str(&content).context("Transcript must be a JSON array of segments")?;
    let records = group_segments(&group_id, &segments);
    if records.is_empty() {
        bail!("no non-empty segments found in {}", file.display());
    }
    println!(
        "Ingesting {} chunks from {} segments as group '{group_id}'",
        records.len(),
        segments.len()
    );

    let index = Arc::new(VectorIndex::load(
        config.index.dimension,
        &config.vectors_path(),
        &config.metadata_path(),
    )?);
    let tracker = IngestTracker::new(
        index,
        super::embedder(&config)?,
        config.vectors_path(),
        config.metadata_path(),
    );

    tracker.start(&group_id, records).await;

    let mut last_progress = 0;
    loop {
        tokio::time::sleep(Duration::from_millis(250)).await;
        let Some(status) = tracker.status(&group_id).await else {
            bail!("ingest job disappeared");
        };
        if status.progress != last_progress {
            println!("  {}% - {}", status.progress, status.message);
            last_progress = status.progress;
        }
        match status.state {
            IngestState::Completed => {
                println!("Done: {}", status.message);
                return Ok(());
            }
            IngestState::Failed => {
                bail!(
                    "ingest failed: {}",
                    status.error.unwrap_or_else(|| "unknown error".into())
                );
            }
            IngestState::Started | IngestState::InProgress => {}
        }
    }
}
