//! The planning-oracle and embedder seams.
//!
//! The oracle is the external component that turns structured context into a
//! structured perception or action plan (an LLM in production, a script in
//! tests). Mentat consumes it only through these traits.

use crate::error::{MemoryError, OracleError};
use crate::plan::{Decision, Perception, PlannerOutcome};
use crate::tool::ToolDefinition;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// Context handed to the oracle for the perception phase.
#[derive(Debug, Clone)]
pub struct PerceptionContext {
    pub query: String,
    pub preferences: BTreeMap<String, Value>,
}

/// Context handed to the oracle for the decision phase.
#[derive(Debug, Clone)]
pub struct DecisionContext {
    pub query: String,
    pub perception: Perception,
    /// Relevant fact contents retrieved from memory
    pub relevant_facts: Vec<String>,
    pub tools: Vec<ToolDefinition>,
    pub preferences: BTreeMap<String, Value>,
    /// Summaries of steps already completed in earlier cycles
    pub previous_steps: Vec<String>,
}

/// The planning oracle.
///
/// Implementations parse the raw model output themselves and degrade to
/// `PlannerOutcome::Fallback` when the output does not conform to the
/// schema; only transport-level failures surface as `Err`.
#[async_trait]
pub trait PlanningOracle: Send + Sync {
    fn name(&self) -> &str;

    async fn perceive(
        &self,
        ctx: &PerceptionContext,
    ) -> Result<PlannerOutcome<Perception>, OracleError>;

    async fn decide(&self, ctx: &DecisionContext)
    -> Result<PlannerOutcome<Decision>, OracleError>;
}

/// Produces fixed-dimension embeddings for vector indexing and search.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// The dimension of every embedding this embedder produces.
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;
}
