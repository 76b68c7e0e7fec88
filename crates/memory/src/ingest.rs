//! Background ingestion with polled status.
//!
//! Ingest jobs embed chunked source material into the vector index on a
//! spawned task while the caller polls progress by job id. Starting a job
//! whose id is already started or in progress is a no-op that returns the
//! existing status, so repeated requests for the same source never ingest
//! twice.

use crate::vector::{VectorIndex, VectorRecord};
use mentat_core::Embedder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Lifecycle of an ingest job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestState {
    Started,
    InProgress,
    Completed,
    Failed,
}

/// Snapshot of one job's progress, returned to pollers by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStatus {
    pub state: IngestState,
    /// Percentage, 0 through 100
    pub progress: u8,
    /// Number of chunks this job will embed
    pub total_units: usize,
    pub message: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub error: Option<String>,
}

/// Tracks ingest jobs and runs them on background tasks.
pub struct IngestTracker {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    vectors_path: PathBuf,
    metadata_path: PathBuf,
    jobs: Mutex<HashMap<String, IngestStatus>>,
}

impl IngestTracker {
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn Embedder>,
        vectors_path: PathBuf,
        metadata_path: PathBuf,
    ) -> Arc<Self> {
        Arc::new(Self {
            index,
            embedder,
            vectors_path,
            metadata_path,
            jobs: Mutex::new(HashMap::new()),
        })
    }

    /// Start ingesting `records` under `job_id`, or return the existing
    /// status if a job with that id was already started or is running.
    /// Completed and failed jobs may be started again.
    pub async fn start(self: &Arc<Self>, job_id: &str, records: Vec<VectorRecord>) -> IngestStatus {
        let mut jobs = self.jobs.lock().await;
        if let Some(existing) = jobs.get(job_id) {
            if matches!(
                existing.state,
                IngestState::Started | IngestState::InProgress
            ) {
                info!(job_id, "Ingest already running, returning existing status");
                return existing.clone();
            }
        }

        let status = IngestStatus {
            state: IngestState::Started,
            progress: 0,
            total_units: records.len(),
            message: format!("Queued {} chunks", records.len()),
            start_time: chrono::Utc::now().to_rfc3339(),
            end_time: None,
            error: None,
        };
        jobs.insert(job_id.to_string(), status.clone());
        drop(jobs);

        let tracker = Arc::clone(self);
        let id = job_id.to_string();
        tokio::spawn(async move {
            tracker.run_job(&id, records).await;
        });

        status
    }

    /// Current status of a job, if one was ever started under this id.
    pub async fn status(&self, job_id: &str) -> Option<IngestStatus> {
        self.jobs.lock().await.get(job_id).cloned()
    }

    async fn run_job(&self, job_id: &str, records: Vec<VectorRecord>) {
        let total = records.len();
        self.update(job_id, |s| {
            s.state = IngestState::InProgress;
            s.message = format!("Embedding {total} chunks");
        })
        .await;

        let mut embeddings = Vec::with_capacity(total);
        for (i, record) in records.iter().enumerate() {
            match self.embedder.embed(&record.chunk_text).await {
                Ok(embedding) => embeddings.push(embedding),
                Err(e) => {
                    error!(job_id, chunk = i, error = %e, "Embedding failed");
                    self.fail(job_id, format!("Embedding chunk {i} failed: {e}"))
                        .await;
                    return;
                }
            }
            let pct = (((i + 1) * 90) / total.max(1)) as u8;
            self.update(job_id, |s| {
                s.progress = pct;
                s.message = format!("Embedded {}/{total} chunks", i + 1);
            })
            .await;
        }

        if let Err(e) = self.index.add(records, embeddings).await {
            error!(job_id, error = %e, "Index insert failed");
            self.fail(job_id, format!("Index insert failed: {e}")).await;
            return;
        }

        if let Err(e) = self
            .index
            .save(&self.vectors_path, &self.metadata_path)
            .await
        {
            error!(job_id, error = %e, "Index persist failed");
            self.fail(job_id, format!("Index persist failed: {e}")).await;
            return;
        }

        info!(job_id, chunks = total, "Ingest completed");
        self.update(job_id, |s| {
            s.state = IngestState::Completed;
            s.progress = 100;
            s.message = format!("Ingested {total} chunks");
            s.end_time = Some(chrono::Utc::now().to_rfc3339());
        })
        .await;
    }

    async fn update(&self, job_id: &str, f: impl FnOnce(&mut IngestStatus)) {
        if let Some(status) = self.jobs.lock().await.get_mut(job_id) {
            f(status);
        }
    }

    async fn fail(&self, job_id: &str, reason: String) {
        self.update(job_id, |s| {
            s.state = IngestState::Failed;
            s.message = "Ingest failed".to_string();
            s.error = Some(reason);
            s.end_time = Some(chrono::Utc::now().to_rfc3339());
        })
        .await;
    }
}

/// A raw timed segment of source material, before grouping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSegment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

const MAX_CHUNK_SECONDS: f64 = 30.0;
const MAX_CHUNK_CHARS: usize = 500;

/// Group raw segments into chunks for embedding.
///
/// A chunk closes when its accumulated text ends in sentence punctuation,
/// when it spans more than 30 seconds, or when it exceeds 500 characters.
/// Whatever is still buffered when the segments run out becomes the final
/// chunk.
pub fn group_segments(group_id: &str, segments: &[RawSegment]) -> Vec<VectorRecord> {
    let mut records = Vec::new();
    let mut buffer = String::new();
    let mut chunk_start = 0.0_f64;
    let mut chunk_end = 0.0_f64;

    for segment in segments {
        let text = segment.text.trim();
        if text.is_empty() {
            continue;
        }
        if buffer.is_empty() {
            chunk_start = segment.start;
        } else {
            buffer.push(' ');
        }
        buffer.push_str(text);
        chunk_end = segment.start + segment.duration;

        let ends_sentence = buffer.ends_with(['.', '!', '?']);
        let too_long = chunk_end - chunk_start > MAX_CHUNK_SECONDS || buffer.len() > MAX_CHUNK_CHARS;

        if ends_sentence || too_long {
            records.push(VectorRecord {
                group_id: group_id.to_string(),
                chunk_text: std::mem::take(&mut buffer),
                start_offset: chunk_start,
                end_offset: chunk_end,
                chunk_index: records.len(),
            });
        }
    }

    if !buffer.is_empty() {
        records.push(VectorRecord {
            group_id: group_id.to_string(),
            chunk_text: buffer,
            start_offset: chunk_start,
            end_offset: chunk_end,
            chunk_index: records.len(),
        });
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mentat_core::error::MemoryError;
    use tokio::sync::Semaphore;

    struct InstantEmbedder {
        dimension: usize,
    }

    #[async_trait]
    impl Embedder for InstantEmbedder {
        fn dimension(&self) -> usize {
            self.dimension
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
            Ok(vec![text.len() as f32; self.dimension])
        }
    }

    /// Blocks every `embed` call until the gate has permits, holding a job
    /// in progress for as long as a test needs.
    struct GatedEmbedder {
        dimension: usize,
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl Embedder for GatedEmbedder {
        fn dimension(&self) -> usize {
            self.dimension
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, MemoryError> {
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| MemoryError::EmbeddingFailed(e.to_string()))?;
            permit.forget();
            Ok(vec![0.0; self.dimension])
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn dimension(&self) -> usize {
            2
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, MemoryError> {
            Err(MemoryError::EmbeddingFailed("connection refused".into()))
        }
    }

    fn records(group: &str, n: usize) -> Vec<VectorRecord> {
        (0..n)
            .map(|i| VectorRecord {
                group_id: group.into(),
                chunk_text: format!("chunk number {i}"),
                start_offset: i as f64 * 10.0,
                end_offset: i as f64 * 10.0 + 10.0,
                chunk_index: i,
            })
            .collect()
    }

    fn tracker_with(embedder: Arc<dyn Embedder>, dir: &std::path::Path) -> Arc<IngestTracker> {
        let index = Arc::new(VectorIndex::new(embedder.dimension()));
        IngestTracker::new(
            index,
            embedder,
            dir.join("vectors.json"),
            dir.join("metadata.json"),
        )
    }

    async fn wait_for_terminal(tracker: &IngestTracker, job_id: &str) -> IngestStatus {
        for _ in 0..200 {
            if let Some(status) = tracker.status(job_id).await {
                if matches!(status.state, IngestState::Completed | IngestState::Failed) {
                    return status;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("job never reached a terminal state");
    }

    #[tokio::test]
    async fn job_completes_and_populates_index() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_with(Arc::new(InstantEmbedder { dimension: 3 }), dir.path());

        let status = tracker.start("vid1", records("vid1", 4)).await;
        assert_eq!(status.state, IngestState::Started);
        assert_eq!(status.total_units, 4);

        let done = wait_for_terminal(&tracker, "vid1").await;
        assert_eq!(done.state, IngestState::Completed);
        assert_eq!(done.progress, 100);
        assert!(done.end_time.is_some());

        assert_eq!(tracker.index.group_records("vid1").await.len(), 4);
        assert!(dir.path().join("vectors.json").exists());
        assert!(dir.path().join("metadata.json").exists());
    }

    #[tokio::test]
    async fn duplicate_start_returns_existing_status_without_second_job() {
        let dir = tempfile::tempdir().unwrap();
        let gate = Arc::new(Semaphore::new(0));
        let tracker = tracker_with(
            Arc::new(GatedEmbedder {
                dimension: 2,
                gate: Arc::clone(&gate),
            }),
            dir.path(),
        );

        tracker.start("vid1", records("vid1", 2)).await;
        // The first job is gated inside embed; a second start must not
        // queue another run. Ten permits would let a duplicate job finish
        // too, and the index would show it.
        let second = tracker.start("vid1", records("vid1", 2)).await;
        assert!(matches!(
            second.state,
            IngestState::Started | IngestState::InProgress
        ));

        gate.add_permits(10);
        let done = wait_for_terminal(&tracker, "vid1").await;
        assert_eq!(done.state, IngestState::Completed);
        // Only one job's worth of chunks landed in the index.
        assert_eq!(tracker.index.group_records("vid1").await.len(), 2);
    }

    #[tokio::test]
    async fn embedding_failure_marks_job_failed() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_with(Arc::new(FailingEmbedder), dir.path());

        tracker.start("vid1", records("vid1", 2)).await;
        let done = wait_for_terminal(&tracker, "vid1").await;
        assert_eq!(done.state, IngestState::Failed);
        assert!(done.error.as_deref().unwrap().contains("connection refused"));
        assert!(tracker.index.group_records("vid1").await.is_empty());
    }

    #[tokio::test]
    async fn unknown_job_has_no_status() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_with(Arc::new(InstantEmbedder { dimension: 2 }), dir.path());
        assert!(tracker.status("never-started").await.is_none());
    }

    fn segment(text: &str, start: f64, duration: f64) -> RawSegment {
        RawSegment {
            text: text.into(),
            start,
            duration,
        }
    }

    #[test]
    fn grouping_closes_on_sentence_punctuation() {
        let segments = vec![
            segment("The first idea", 0.0, 2.0),
            segment("continues here.", 2.0, 2.0),
            segment("A new thought!", 4.0, 2.0),
        ];
        let records = group_segments("vid", &segments);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].chunk_text, "The first idea continues here.");
        assert_eq!(records[0].start_offset, 0.0);
        assert_eq!(records[0].end_offset, 4.0);
        assert_eq!(records[1].chunk_text, "A new thought!");
        assert_eq!(records[1].chunk_index, 1);
    }

    #[test]
    fn grouping_closes_on_duration_limit() {
        let segments = vec![
            segment("no punctuation here", 0.0, 20.0),
            segment("still going", 20.0, 15.0),
            segment("next chunk", 35.0, 5.0),
        ];
        let records = group_segments("vid", &segments);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].end_offset, 35.0);
        assert_eq!(records[1].start_offset, 35.0);
    }

    #[test]
    fn grouping_closes_on_character_limit() {
        let long = "word ".repeat(120).trim_end().to_string();
        let segments = vec![segment(&long, 0.0, 5.0), segment("tail", 5.0, 5.0)];
        let records = group_segments("vid", &segments);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn grouping_flushes_trailing_partial_chunk() {
        let segments = vec![segment("dangling words with no period", 0.0, 3.0)];
        let records = group_segments("vid", &segments);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].chunk_text, "dangling words with no period");
    }

    #[test]
    fn grouping_skips_empty_segments() {
        let segments = vec![
            segment("  ", 0.0, 1.0),
            segment("real text.", 1.0, 1.0),
        ];
        let records = group_segments("vid", &segments);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].start_offset, 1.0);
    }

    #[test]
    fn grouping_keeps_buffer_past_trailing_empty_segment() {
        // A whitespace-only last segment must not swallow the open chunk.
        let segments = vec![
            segment("dangling words with no period", 0.0, 3.0),
            segment("   ", 3.0, 1.0),
        ];
        let records = group_segments("vid", &segments);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].chunk_text, "dangling words with no period");
        assert_eq!(records[0].end_offset, 3.0);
    }
}
