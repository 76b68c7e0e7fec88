//! Context expansion — neighbor-window enrichment over ranked vector hits.
//!
//! A single matched chunk is often too narrow to read on its own. For each
//! hit we pull in its immediate predecessor and successor within the same
//! group (at a fixed lower synthetic weight) so the downstream reader gets
//! coherent passages. The original unexpanded hits are kept separately —
//! they are the only true matches and are what citations point at.

use crate::vector::{SearchHit, VectorIndex, VectorRecord};
use std::collections::HashSet;
use tracing::debug;

/// Synthetic score assigned to pulled-in neighbors.
const NEIGHBOR_WEIGHT: f64 = 0.5;

/// Offset tolerance when locating a hit among its group's records.
const OFFSET_TOLERANCE: f64 = 1.0;

/// The result of neighbor expansion.
#[derive(Debug, Clone)]
pub struct ExpandedContext {
    /// Hits plus neighbors, sorted by `start_offset` ascending
    pub passages: Vec<SearchHit>,
    /// The original pre-expansion hits, in their ranked order
    pub anchors: Vec<SearchHit>,
}

/// Expand each hit with its immediate neighbors in the same group.
///
/// Deduplication key is `(group_id, start_offset)`; a record already present
/// (as a hit or an earlier neighbor) is not added again.
pub async fn expand_with_neighbors(index: &VectorIndex, hits: &[SearchHit]) -> ExpandedContext {
    let mut passages: Vec<SearchHit> = hits.to_vec();
    let mut seen: HashSet<(String, u64)> = hits.iter().map(|h| dedup_key(&h.record)).collect();

    for hit in hits {
        let siblings = index.group_records(&hit.record.group_id).await;

        // Locate the hit within its group by approximate offset match.
        let position = siblings
            .iter()
            .position(|r| (r.start_offset - hit.record.start_offset).abs() < OFFSET_TOLERANCE);
        let Some(position) = position else {
            continue;
        };

        let mut neighbors = Vec::new();
        if position > 0 {
            neighbors.push(&siblings[position - 1]);
        }
        if position + 1 < siblings.len() {
            neighbors.push(&siblings[position + 1]);
        }

        for neighbor in neighbors {
            let key = dedup_key(neighbor);
            if seen.insert(key) {
                passages.push(SearchHit {
                    record: neighbor.clone(),
                    score: NEIGHBOR_WEIGHT,
                });
            }
        }
    }

    passages.sort_by(|a, b| {
        a.record
            .start_offset
            .partial_cmp(&b.record.start_offset)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    debug!(
        anchors = hits.len(),
        passages = passages.len(),
        "Expanded context with neighbors"
    );

    ExpandedContext {
        passages,
        anchors: hits.to_vec(),
    }
}

fn dedup_key(record: &VectorRecord) -> (String, u64) {
    (record.group_id.clone(), record.start_offset.to_bits())
}

/// A deep link into a group at a given offset (e.g. a video timestamp URL).
pub fn deep_link(group_id: &str, start_offset: f64) -> String {
    format!(
        "https://www.youtube.com/watch?v={group_id}&t={}s",
        start_offset as u64
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::VectorIndex;

    fn record(group: &str, start: f64, index: usize) -> crate::vector::VectorRecord {
        crate::vector::VectorRecord {
            group_id: group.into(),
            chunk_text: format!("chunk {index}"),
            start_offset: start,
            end_offset: start + 10.0,
            chunk_index: index,
        }
    }

    async fn seeded_index() -> VectorIndex {
        let index = VectorIndex::new(2);
        index
            .add(
                (0..5).map(|i| record("vid", i as f64 * 10.0, i)).collect(),
                vec![vec![0.0, 0.0]; 5],
            )
            .await
            .unwrap();
        index
    }

    fn hit(group: &str, start: f64, index: usize, score: f64) -> SearchHit {
        SearchHit {
            record: record(group, start, index),
            score,
        }
    }

    #[tokio::test]
    async fn middle_hit_gains_both_neighbors() {
        let index = seeded_index().await;
        let hits = vec![hit("vid", 20.0, 2, 0.9)];

        let expanded = expand_with_neighbors(&index, &hits).await;
        let offsets: Vec<f64> = expanded
            .passages
            .iter()
            .map(|p| p.record.start_offset)
            .collect();
        assert_eq!(offsets, vec![10.0, 20.0, 30.0]);
        assert_eq!(expanded.anchors.len(), 1);
        assert_eq!(expanded.anchors[0].record.start_offset, 20.0);
    }

    #[tokio::test]
    async fn first_hit_only_gains_successor() {
        let index = seeded_index().await;
        let hits = vec![hit("vid", 0.0, 0, 0.9)];

        let expanded = expand_with_neighbors(&index, &hits).await;
        let offsets: Vec<f64> = expanded
            .passages
            .iter()
            .map(|p| p.record.start_offset)
            .collect();
        assert_eq!(offsets, vec![0.0, 10.0]);
    }

    #[tokio::test]
    async fn neighbors_carry_synthetic_weight() {
        let index = seeded_index().await;
        let hits = vec![hit("vid", 20.0, 2, 0.9)];

        let expanded = expand_with_neighbors(&index, &hits).await;
        for passage in &expanded.passages {
            if passage.record.start_offset == 20.0 {
                assert_eq!(passage.score, 0.9);
            } else {
                assert_eq!(passage.score, NEIGHBOR_WEIGHT);
            }
        }
    }

    #[tokio::test]
    async fn adjacent_hits_deduplicate_shared_neighbors() {
        let index = seeded_index().await;
        // Hits at 10 and 20: each is the other's neighbor, and they share
        // no duplicated entries in the expansion.
        let hits = vec![hit("vid", 10.0, 1, 0.9), hit("vid", 20.0, 2, 0.8)];

        let expanded = expand_with_neighbors(&index, &hits).await;
        let offsets: Vec<f64> = expanded
            .passages
            .iter()
            .map(|p| p.record.start_offset)
            .collect();
        assert_eq!(offsets, vec![0.0, 10.0, 20.0, 30.0]);
    }

    #[tokio::test]
    async fn approximate_offset_match_tolerates_drift() {
        let index = seeded_index().await;
        // Hit offset drifts by 0.4 from the indexed record at 20.0.
        let hits = vec![hit("vid", 20.4, 2, 0.9)];

        let expanded = expand_with_neighbors(&index, &hits).await;
        // Predecessor and successor still found.
        assert_eq!(expanded.passages.len(), 3);
    }

    #[tokio::test]
    async fn hit_from_unknown_group_passes_through() {
        let index = seeded_index().await;
        let hits = vec![hit("other", 0.0, 0, 0.9)];

        let expanded = expand_with_neighbors(&index, &hits).await;
        assert_eq!(expanded.passages.len(), 1);
    }

    #[test]
    fn deep_link_format() {
        assert_eq!(
            deep_link("dQw4w9WgXcQ", 45.7),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=45s"
        );
    }
}
