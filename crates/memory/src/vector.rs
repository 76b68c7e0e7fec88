//! The vector index — a fixed-dimension flat nearest-neighbor store.
//!
//! Embeddings and their metadata records live in two parallel lists that are
//! always the same length; a shape-mismatched `add` is rejected before any
//! mutation. Search is a full scan by squared Euclidean distance, with
//! distance converted to a similarity score via `1/(1+d)`.

use chrono::Utc;
use mentat_core::error::{IndexError, MemoryError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Metadata for one indexed chunk.
///
/// Records sharing a `group_id` originate from the same source stream and
/// are totally ordered by `start_offset`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Source/stream identifier grouping sibling chunks
    pub group_id: String,
    pub chunk_text: String,
    pub start_offset: f64,
    pub end_offset: f64,
    /// Position of this chunk within its group
    pub chunk_index: usize,
}

/// A search result: a record plus its similarity score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub record: VectorRecord,
    /// `1/(1+d)` where `d` is squared Euclidean distance; 1.0 = exact match
    pub score: f64,
}

struct Inner {
    embeddings: Vec<Vec<f32>>,
    records: Vec<VectorRecord>,
}

/// Flat L2 index with parallel metadata. Process-wide, shared behind `Arc`;
/// a single writer lock serializes mutation.
pub struct VectorIndex {
    dimension: usize,
    inner: RwLock<Inner>,
}

impl VectorIndex {
    /// Create an empty index with a fixed embedding dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            inner: RwLock::new(Inner {
                embeddings: Vec::new(),
                records: Vec::new(),
            }),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.embeddings.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.embeddings.is_empty()
    }

    /// Number of metadata records. Always equals `len()`.
    pub async fn metadata_len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Append records and their embeddings.
    ///
    /// Rejected atomically — no partial mutation — if the counts differ or
    /// any embedding's dimension is not exactly the index dimension.
    /// Returns the number of records added.
    pub async fn add(
        &self,
        records: Vec<VectorRecord>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<usize, IndexError> {
        if records.len() != embeddings.len() {
            return Err(IndexError::CountMismatch {
                records: records.len(),
                embeddings: embeddings.len(),
            });
        }
        for (position, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != self.dimension {
                return Err(IndexError::DimensionMismatch {
                    position,
                    expected: self.dimension,
                    actual: embedding.len(),
                });
            }
        }

        let added = records.len();
        let mut inner = self.inner.write().await;
        inner.embeddings.extend(embeddings);
        inner.records.extend(records);
        debug!(added, total = inner.records.len(), "Added vectors to index");
        Ok(added)
    }

    /// Nearest-neighbor search by squared Euclidean distance.
    ///
    /// With a group filter, over-fetches `3 × top_k` candidates before
    /// post-filtering, stopping once `top_k` filtered matches are collected.
    /// An empty index, or a query embedding whose length is not the index
    /// dimension, yields an empty result set, not an error.
    pub async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        group_filter: Option<&str>,
    ) -> Vec<SearchHit> {
        if query_embedding.len() != self.dimension {
            debug!(
                got = query_embedding.len(),
                expected = self.dimension,
                "Query embedding has the wrong dimension"
            );
            return Vec::new();
        }
        let inner = self.inner.read().await;
        if inner.embeddings.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let fetch = match group_filter {
            Some(_) => (top_k * 3).min(inner.embeddings.len()),
            None => top_k.min(inner.embeddings.len()),
        };

        let mut scored: Vec<(f64, usize)> = inner
            .embeddings
            .iter()
            .enumerate()
            .map(|(i, emb)| (squared_l2(query_embedding, emb), i))
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(fetch);

        let mut hits = Vec::with_capacity(top_k);
        for (distance, idx) in scored {
            let record = &inner.records[idx];
            if let Some(group) = group_filter {
                if record.group_id != group {
                    continue;
                }
            }
            hits.push(SearchHit {
                record: record.clone(),
                score: 1.0 / (1.0 + distance),
            });
            if hits.len() == top_k {
                break;
            }
        }
        hits
    }

    /// All records for one group, sorted by `start_offset`.
    pub async fn group_records(&self, group_id: &str) -> Vec<VectorRecord> {
        let inner = self.inner.read().await;
        let mut records: Vec<VectorRecord> = inner
            .records
            .iter()
            .filter(|r| r.group_id == group_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.start_offset
                .partial_cmp(&b.start_offset)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        records
    }

    /// Distinct group ids currently in the index.
    pub async fn groups(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut groups: Vec<String> = inner.records.iter().map(|r| r.group_id.clone()).collect();
        groups.sort();
        groups.dedup();
        groups
    }

    /// Persist the index as its two parallel artifacts. Both files are
    /// written together; a partial pair on disk is a load error.
    pub async fn save(&self, vectors_path: &Path, metadata_path: &Path) -> Result<(), MemoryError> {
        let inner = self.inner.read().await;

        let artifact = VectorArtifact {
            dimension: self.dimension,
            embeddings: inner.embeddings.clone(),
        };
        let metadata = MetadataArtifact {
            records: inner.records.clone(),
            saved_at: Utc::now().to_rfc3339(),
        };
        drop(inner);

        for parent in [vectors_path.parent(), metadata_path.parent()]
            .into_iter()
            .flatten()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| MemoryError::Storage(format!("Failed to create index dir: {e}")))?;
        }

        let vectors_json = serde_json::to_string(&artifact)
            .map_err(|e| MemoryError::Storage(format!("Failed to serialize vectors: {e}")))?;
        let metadata_json = serde_json::to_string(&metadata)
            .map_err(|e| MemoryError::Storage(format!("Failed to serialize metadata: {e}")))?;

        std::fs::write(vectors_path, vectors_json)
            .map_err(|e| MemoryError::Storage(format!("Failed to write vectors file: {e}")))?;
        std::fs::write(metadata_path, metadata_json)
            .map_err(|e| MemoryError::Storage(format!("Failed to write metadata file: {e}")))?;

        info!(
            vectors = %vectors_path.display(),
            metadata = %metadata_path.display(),
            "Saved vector index"
        );
        Ok(())
    }

    /// Load an index from its two parallel artifacts. Missing files mean an
    /// empty index; a present-but-inconsistent pair is an error.
    pub fn load(
        dimension: usize,
        vectors_path: &Path,
        metadata_path: &Path,
    ) -> Result<Self, MemoryError> {
        let (vectors_json, metadata_json) = match (
            std::fs::read_to_string(vectors_path),
            std::fs::read_to_string(metadata_path),
        ) {
            (Ok(v), Ok(m)) => (v, m),
            (Err(_), Err(_)) => return Ok(Self::new(dimension)),
            _ => {
                return Err(MemoryError::Storage(
                    "Vector index artifacts are incomplete: vectors and metadata must be loaded together".into(),
                ));
            }
        };

        let artifact: VectorArtifact = serde_json::from_str(&vectors_json)
            .map_err(|e| MemoryError::Storage(format!("Corrupt vectors file: {e}")))?;
        let metadata: MetadataArtifact = serde_json::from_str(&metadata_json)
            .map_err(|e| MemoryError::Storage(format!("Corrupt metadata file: {e}")))?;

        if artifact.dimension != dimension {
            return Err(MemoryError::Storage(format!(
                "Index on disk has dimension {}, expected {dimension}",
                artifact.dimension
            )));
        }
        if artifact.embeddings.len() != metadata.records.len() {
            return Err(MemoryError::Storage(format!(
                "Index artifacts disagree: {} embeddings vs {} records",
                artifact.embeddings.len(),
                metadata.records.len()
            )));
        }

        let count = artifact.embeddings.len();
        info!(count, "Loaded vector index");
        Ok(Self {
            dimension,
            inner: RwLock::new(Inner {
                embeddings: artifact.embeddings,
                records: metadata.records,
            }),
        })
    }
}

#[derive(Serialize, Deserialize)]
struct VectorArtifact {
    dimension: usize,
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize, Deserialize)]
struct MetadataArtifact {
    records: Vec<VectorRecord>,
    saved_at: String,
}

fn squared_l2(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = (*x - *y) as f64;
            d * d
        })
        .sum()
}
