//! Plan and perception types — the structured vocabulary shared between the
//! planning oracle and the scheduler.
//!
//! These mirror the two JSON schemas the oracle must produce: a *perception*
//! (intent, entities, extracted facts, confidence, fallback) and a *decision*
//! (ordered action plan, reasoning, should_continue).

use crate::budget::IterationBudget;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// How the oracle arrived at a perception or decision.
///
/// `Fallback` means the raw response could not be parsed into the schema and
/// a fixed-shape substitute was constructed locally. Call sites
/// pattern-match on this instead of intercepting errors.
#[derive(Debug, Clone)]
pub enum PlannerOutcome<T> {
    Parsed(T),
    Fallback(T),
}

impl<T> PlannerOutcome<T> {
    pub fn into_inner(self) -> T {
        match self {
            PlannerOutcome::Parsed(t) | PlannerOutcome::Fallback(t) => t,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, PlannerOutcome::Fallback(_))
    }
}

/// Fallback information attached to an uncertain perception.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerceptionFallback {
    /// Whether the perception is uncertain
    #[serde(default)]
    pub is_uncertain: bool,

    /// Aspects of the query the oracle could not pin down
    #[serde(default)]
    pub uncertain_aspects: Vec<String>,

    /// A clarification question to return to the user instead of planning
    #[serde(default)]
    pub suggested_clarification: Option<String>,
}

/// Output of the perception phase: what the query *is*.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Perception {
    /// Primary intent of the user query (e.g. "arithmetic", "out_of_scope")
    pub intent: String,

    /// Entities extracted from the query
    #[serde(default)]
    pub entities: BTreeMap<String, Value>,

    /// Facts extracted from the query, folded into the fact store
    #[serde(default)]
    pub extracted_facts: Vec<String>,

    /// Whether the query requires tool execution
    #[serde(default)]
    pub requires_tools: bool,

    /// Confidence in the perception, 0.0..=1.0
    #[serde(default = "full_confidence")]
    pub confidence: f64,

    /// Fallback handling information
    #[serde(default)]
    pub fallback: Option<PerceptionFallback>,
}

fn full_confidence() -> f64 {
    1.0
}

impl Perception {
    /// An out-of-scope or low-confidence perception short-circuits the
    /// request with a clarification message instead of planning.
    pub fn scope_rejection(&self) -> Option<String> {
        if self.intent == "out_of_scope" {
            return Some(
                self.fallback
                    .as_ref()
                    .and_then(|f| f.suggested_clarification.clone())
                    .unwrap_or_else(|| {
                        "I can't help with that request; it is outside my capabilities.".into()
                    }),
            );
        }
        match &self.fallback {
            Some(f) if f.is_uncertain => f.suggested_clarification.clone(),
            _ => None,
        }
    }
}

/// The kind of an action step.
///
/// Only `ToolCall` consumes an iteration unit; `Response` and `QueryMemory`
/// are free reasoning, not external work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ToolCall,
    Response,
    QueryMemory,
}

/// A single step in an action plan.
///
/// Immutable once planned, except that `parameters` are rewritten in place
/// by placeholder resolution immediately before dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionStep {
    /// Step number: positive, unique within a plan, defines execution order
    pub step_number: u32,

    /// What kind of action this is
    #[serde(rename = "action_type")]
    pub kind: ActionKind,

    /// Human-readable description of the step
    #[serde(default)]
    pub description: String,

    /// Tool to invoke; required iff `kind` is `ToolCall`
    #[serde(default)]
    pub tool_name: Option<String>,

    /// Parameter tree; may contain `RESULT_FROM_STEP_N` placeholder tokens
    #[serde(default)]
    pub parameters: Value,

    /// Free-text reasoning behind this step
    #[serde(default)]
    pub reasoning: String,
}

/// Output of the decision phase: an ordered action plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub action_plan: Vec<ActionStep>,

    #[serde(default)]
    pub reasoning: String,

    #[serde(default = "full_confidence")]
    pub confidence: f64,

    /// Whether to run another plan cycle after this one completes
    #[serde(default = "default_true")]
    pub should_continue: bool,
}

fn default_true() -> bool {
    true
}

/// The result of executing one `ActionStep`. Produced exactly once per
/// executed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,

    /// Opaque result value — scalar, JSON structure, or text
    #[serde(default)]
    pub result: Option<Value>,

    #[serde(default)]
    pub error: Option<String>,

    /// Wall-clock execution time in milliseconds
    #[serde(default)]
    pub execution_time_ms: u64,

    /// New facts to fold into the fact store
    #[serde(default)]
    pub facts_to_remember: Vec<String>,
}

impl ActionResult {
    pub fn failure(error: impl Into<String>, execution_time_ms: u64) -> Self {
        let error = error.into();
        Self {
            success: false,
            result: None,
            error: Some(error.clone()),
            execution_time_ms,
            facts_to_remember: vec![format!("Action failed: {error}")],
        }
    }
}

/// The complete cognitive state of one request.
///
/// Created fresh per incoming request and owned exclusively by the scheduler
/// for its duration; anything that must outlive the request is copied into
/// the fact store before this is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CognitiveState {
    /// Cached across plan cycles — perception runs once per outer request
    pub perception: Option<Perception>,

    /// The current plan
    pub decision: Option<Decision>,

    /// Append-only, one entry per executed step
    pub action_results: Vec<ActionResult>,

    pub budget: IterationBudget,

    pub complete: bool,
}

impl CognitiveState {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            perception: None,
            decision: None,
            action_results: Vec::new(),
            budget: IterationBudget::new(max_iterations),
            complete: false,
        }
    }
}

/// The top-level response for one request. Always carries a success flag and
/// either a result or an error string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub success: bool,
    pub query: String,
    pub result: String,

    #[serde(default)]
    pub error: Option<String>,

    /// Iteration units consumed; never exceeds the configured maximum
    pub iterations: u32,
}
