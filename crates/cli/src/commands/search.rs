//! `mentat search` — semantic search with neighbor-expanded context.

use mentat_core::Embedder;
use mentat_memory::{VectorIndex, deep_link, expand_with_neighbors};

pub async fn run(query: String, group: Option<String>, top_k: usize) -> anyhow::Result<()> {
    let config = super::load_config()?;
    let index = VectorIndex::load(
        config.index.dimension,
        &config.vectors_path(),
        &config.metadata_path(),
    )?;
    if index.is_empty().await {
        println!("The index is empty; run `mentat ingest` first.");
        return Ok(());
    }

    let embedding = super::embedder(&config)?.embed(&query).await?;
    let hits = index.search(&embedding, top_k, group.as_deref()).await;
    if hits.is_empty() {
        println!("No matches.");
        return Ok(());
    }

    let expanded = expand_with_neighbors(&index, &hits).await;

    println!("Context ({} passages):\n", expanded.passages.len());
    for passage in &expanded.passages {
        println!(
            "  [{:>7.1}s] {}",
            passage.record.start_offset, passage.record.chunk_text
        );
    }

    println!("\nMatches:");
    for anchor in &expanded.anchors {
        println!(
            "  {:.3}  {}",
            anchor.score,
            deep_link(&anchor.record.group_id, anchor.record.start_offset)
        );
    }
    Ok(())
}
