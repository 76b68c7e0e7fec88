//! The fact store — append-only keyword memory.
//!
//! Facts are never mutated and never deleted in memory; old data only leaves
//! through snapshot-file rotation. Retrieval filters by word-overlap ratio
//! against the query, then orders the survivors by each fact's *static*
//! stored score. The overlap ratio is a gate, not a ranking: two facts that
//! both clear the threshold sort by what they were worth when stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// A single fact. Created on store, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryFact {
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Where the fact came from: "user", "perception", "action", ...
    pub source: String,
    /// Static relevance weight assigned at store time, 0.0..=1.0
    pub relevance_score: f64,
}

/// Parameters for a retrieval.
#[derive(Debug, Clone)]
pub struct FactQuery {
    pub query: String,
    pub max_results: usize,
    /// Minimum word-overlap ratio (|intersection| / |query tokens|)
    pub min_relevance: f64,
}

/// Process-wide fact store. Shared behind `Arc`; all mutation goes through
/// `store`/`store_many`/`set_context`, serialized by a single writer lock.
pub struct FactStore {
    facts: RwLock<Vec<MemoryFact>>,
    context: RwLock<BTreeMap<String, Value>>,
}

impl FactStore {
    pub fn new() -> Self {
        Self {
            facts: RwLock::new(Vec::new()),
            context: RwLock::new(BTreeMap::new()),
        }
    }

    /// Append a fact with the current timestamp.
    pub async fn store(&self, content: impl Into<String>, source: &str, relevance_score: f64) {
        let content = content.into();
        debug!(source, content = %truncate(&content, 50), "Storing fact");
        self.facts.write().await.push(MemoryFact {
            content,
            timestamp: Utc::now(),
            source: source.to_string(),
            relevance_score: relevance_score.clamp(0.0, 1.0),
        });
    }

    /// Append several facts from the same source at score 1.0.
    pub async fn store_many(&self, facts: &[String], source: &str) {
        for fact in facts {
            self.store(fact.clone(), source, 1.0).await;
        }
        if !facts.is_empty() {
            info!(count = facts.len(), source, "Stored facts");
        }
    }

    /// Retrieve facts relevant to a query.
    ///
    /// Tokenizes the query and every fact into lowercase word sets, keeps
    /// facts whose overlap ratio meets `min_relevance`, then sorts the
    /// survivors by their static stored score (descending) and truncates.
    /// Deterministic given identical store contents.
    pub async fn retrieve(&self, query: &FactQuery) -> Vec<MemoryFact> {
        let query_words: HashSet<String> = tokenize(&query.query);
        if query_words.is_empty() {
            return Vec::new();
        }

        let facts = self.facts.read().await;
        let mut relevant: Vec<MemoryFact> = facts
            .iter()
            .filter(|fact| {
                let fact_words = tokenize(&fact.content);
                let overlap = query_words.intersection(&fact_words).count();
                overlap > 0 && (overlap as f64 / query_words.len() as f64) >= query.min_relevance
            })
            .cloned()
            .collect();
        drop(facts);

        relevant.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        relevant.truncate(query.max_results);

        debug!(count = relevant.len(), query = %query.query, "Retrieved facts");
        relevant
    }

    /// All stored facts, in insertion order.
    pub async fn all_facts(&self) -> Vec<MemoryFact> {
        self.facts.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.facts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.facts.read().await.is_empty()
    }

    /// Set a context value (e.g. the initial query of the current request).
    pub async fn set_context(&self, key: &str, value: Value) {
        self.context.write().await.insert(key.to_string(), value);
    }

    pub async fn context(&self, key: &str) -> Option<Value> {
        self.context.read().await.get(key).cloned()
    }

    pub async fn all_context(&self) -> BTreeMap<String, Value> {
        self.context.read().await.clone()
    }

    /// Replace the whole store from a snapshot (startup only).
    pub async fn restore(&self, facts: Vec<MemoryFact>, context: BTreeMap<String, Value>) {
        *self.facts.write().await = facts;
        *self.context.write().await = context;
    }
}

impl Default for FactStore {
    fn default() -> Self {
        Self::new()
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.to_string())
        .collect()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(text: &str, min_relevance: f64) -> FactQuery {
        FactQuery {
            query: text.into(),
            max_results: 5,
            min_relevance,
        }
    }

    #[tokio::test]
    async fn store_appends_with_timestamp() {
        let store = FactStore::new();
        store.store("The sky is blue", "user", 1.0).await;
        let facts = store.all_facts().await;
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].source, "user");
        assert_eq!(facts[0].relevance_score, 1.0);
    }

    #[tokio::test]
    async fn retrieve_filters_by_overlap_ratio() {
        let store = FactStore::new();
        store.store("alpha gamma", "user", 1.0).await;
        store.store("delta epsilon", "user", 1.0).await;

        let results = store.retrieve(&query("alpha beta", 0.4)).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "alpha gamma");
    }

    /// Survivors sort by their *static* stored score, not the freshly
    /// computed overlap ratio — "alpha gamma" (ratio 0.5, score 0.9) ranks
    /// above "alpha beta" (ratio 1.0, score 0.2).
    #[tokio::test]
    async fn retrieve_sorts_by_static_score_not_overlap() {
        let store = FactStore::new();
        store.store("alpha gamma", "user", 0.9).await;
        store.store("alpha beta", "user", 0.2).await;

        let results = store.retrieve(&query("alpha beta", 0.4)).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "alpha gamma");
        assert_eq!(results[1].content, "alpha beta");
    }

    #[tokio::test]
    async fn retrieve_respects_max_results() {
        let store = FactStore::new();
        for i in 0..10 {
            store.store(format!("rust fact {i}"), "user", 0.5).await;
        }
        let mut q = query("rust", 0.1);
        q.max_results = 3;
        let results = store.retrieve(&q).await;
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn retrieve_empty_query_returns_nothing() {
        let store = FactStore::new();
        store.store("something", "user", 1.0).await;
        let results = store.retrieve(&query("", 0.0)).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn facts_are_never_mutated_by_retrieval() {
        let store = FactStore::new();
        store.store("alpha beta", "user", 0.7).await;
        store.retrieve(&query("alpha", 0.1)).await;

        let facts = store.all_facts().await;
        assert_eq!(facts[0].relevance_score, 0.7);
    }

    #[tokio::test]
    async fn context_round_trips() {
        let store = FactStore::new();
        store
            .set_context("initial_query", Value::String("what is 2+2".into()))
            .await;
        assert_eq!(
            store.context("initial_query").await,
            Some(Value::String("what is 2+2".into()))
        );
        assert_eq!(store.context("missing").await, None);
    }

    #[tokio::test]
    async fn score_is_clamped_to_unit_interval() {
        let store = FactStore::new();
        store.store("overweighted", "user", 3.0).await;
        let facts = store.all_facts().await;
        assert_eq!(facts[0].relevance_score, 1.0);
    }
}
