//! The iteration scheduler — the cognitive loop of one request.
//!
//! Perceive once (cached for the whole request), scope-check, then loop
//! decide/execute cycles until the plan declares completion, a terminal
//! response is produced, or the iteration budget runs out. Every oracle call
//! and every tool-call step charges one budget unit; response and
//! query-memory steps are free reasoning.

use crate::outcome::ResultClassifier;
use crate::resolver::resolve_placeholders;
use mentat_core::{
    ActionKind, ActionResult, ActionStep, AgentResponse, CognitiveState, DecisionContext,
    PerceptionContext, PlanningOracle, ToolRegistry,
};
use mentat_memory::{FactQuery, FactStore, SnapshotStore};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Drives requests through the cognitive loop. Shared components (oracle,
/// tools, facts) live behind `Arc` and survive across requests; the
/// `CognitiveState` of each request is created and destroyed inside `run`.
pub struct Scheduler {
    oracle: Arc<dyn PlanningOracle>,
    tools: Arc<ToolRegistry>,
    facts: Arc<FactStore>,
    snapshots: Option<Arc<SnapshotStore>>,
    classifier: ResultClassifier,
    preferences: BTreeMap<String, Value>,
    preferences_recorded: AtomicBool,
    max_iterations: u32,
    memory_max_results: usize,
    memory_min_relevance: f64,
}

impl Scheduler {
    pub fn new(
        oracle: Arc<dyn PlanningOracle>,
        tools: Arc<ToolRegistry>,
        facts: Arc<FactStore>,
        max_iterations: u32,
    ) -> Self {
        Self {
            oracle,
            tools,
            facts,
            snapshots: None,
            classifier: ResultClassifier,
            preferences: BTreeMap::new(),
            preferences_recorded: AtomicBool::new(false),
            max_iterations,
            memory_max_results: 5,
            memory_min_relevance: 0.3,
        }
    }

    /// Snapshot the fact store through this store at the end of each request.
    pub fn with_snapshots(mut self, snapshots: Arc<SnapshotStore>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    pub fn with_preferences(mut self, preferences: BTreeMap<String, Value>) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_memory_tuning(mut self, max_results: usize, min_relevance: f64) -> Self {
        self.memory_max_results = max_results;
        self.memory_min_relevance = min_relevance;
        self
    }

    /// Process one request. Always returns a response; internal recoveries
    /// (parse fallbacks, failed steps, failed snapshots) are invisible to
    /// the caller except through reduced plan completeness.
    pub async fn run(&self, query: &str) -> AgentResponse {
        info!(query, max_iterations = self.max_iterations, "Starting cognitive processing");

        let mut state = CognitiveState::new(self.max_iterations);
        self.facts
            .set_context("initial_query", Value::String(query.to_string()))
            .await;
        self.record_preferences().await;

        let mut executed: Vec<(ActionStep, ActionResult)> = Vec::new();
        let mut results_map: BTreeMap<u32, Value> = BTreeMap::new();
        let mut terminal_response: Option<String> = None;

        while !state.budget.is_exhausted() {
            // PERCEIVE: one oracle call per request, cached across cycles.
            let perception = match &state.perception {
                Some(p) => p.clone(),
                None => {
                    state.budget.charge();
                    let ctx = PerceptionContext {
                        query: query.to_string(),
                        preferences: self.preferences.clone(),
                    };
                    let outcome = match self.oracle.perceive(&ctx).await {
                        Ok(outcome) => outcome,
                        Err(e) => return self.error_response(query, &state, e.to_string()),
                    };
                    if outcome.is_fallback() {
                        warn!("Perception degraded to fallback");
                    }
                    let perception = outcome.into_inner();
                    if !perception.extracted_facts.is_empty() {
                        self.facts
                            .store_many(&perception.extracted_facts, "perception")
                            .await;
                    }
                    info!(intent = %perception.intent, confidence = perception.confidence, "Perception complete");
                    state.perception = Some(perception.clone());
                    perception
                }
            };

            // SCOPE_CHECK: out-of-scope or uncertain queries short-circuit
            // with a clarification, consuming no further iterations.
            if let Some(clarification) = perception.scope_rejection() {
                info!("Query rejected at scope check");
                state.complete = true;
                return self
                    .final_response(query, &state, clarification)
                    .await;
            }

            if state.budget.is_exhausted() {
                break;
            }

            // DECIDE
            state.budget.charge();
            let relevant_facts = self
                .facts
                .retrieve(&FactQuery {
                    query: query.to_string(),
                    max_results: self.memory_max_results,
                    min_relevance: self.memory_min_relevance,
                })
                .await
                .into_iter()
                .map(|f| f.content)
                .collect();
            let ctx = DecisionContext {
                query: query.to_string(),
                perception,
                relevant_facts,
                tools: self.tools.definitions(),
                preferences: self.preferences.clone(),
                previous_steps: executed.iter().map(|(s, r)| step_summary(s, r)).collect(),
            };
            let outcome = match self.oracle.decide(&ctx).await {
                Ok(outcome) => outcome,
                Err(e) => return self.error_response(query, &state, e.to_string()),
            };
            if outcome.is_fallback() {
                warn!("Decision degraded to fallback plan");
            }
            let decision = outcome.into_inner();
            info!(
                steps = decision.action_plan.len(),
                confidence = decision.confidence,
                "Decision complete"
            );
            state.decision = Some(decision.clone());

            // EXECUTE: steps in step_number order; budget pre-checked per
            // step so a mid-plan exhaustion truncates cleanly.
            let mut plan = decision.action_plan;
            plan.sort_by_key(|s| s.step_number);

            let mut truncated = false;
            for mut step in plan {
                if state.budget.is_exhausted() {
                    warn!(step = step.step_number, "Budget exhausted, aborting remaining steps");
                    truncated = true;
                    break;
                }

                step.parameters = resolve_placeholders(&step.parameters, &results_map, query);
                let result = self.execute_step(&mut state, &step).await;

                if result.success {
                    if let Some(value) = &result.result {
                        results_map.insert(step.step_number, value.clone());
                    }
                    if !result.facts_to_remember.is_empty() {
                        self.facts
                            .store_many(&result.facts_to_remember, "action")
                            .await;
                    }
                    if step.kind == ActionKind::Response {
                        terminal_response = Some(response_payload(&step));
                    }
                }

                state.action_results.push(result.clone());
                executed.push((step, result));
            }

            if truncated
                || terminal_response.is_some()
                || !decision.should_continue
                || state.budget.is_exhausted()
            {
                break;
            }
            debug!("Plan requested continuation, entering next cycle");
        }

        state.complete = true;
        let result = terminal_response
            .or_else(|| self.classifier.finalize(&executed))
            .unwrap_or_else(|| "Task completed".to_string());

        self.final_response(query, &state, result).await
    }

    async fn execute_step(&self, state: &mut CognitiveState, step: &ActionStep) -> ActionResult {
        let started = Instant::now();
        match step.kind {
            ActionKind::ToolCall => {
                state.budget.charge();
                let Some(tool_name) = step.tool_name.as_deref() else {
                    return ActionResult::failure(
                        "tool_name is required for tool_call steps",
                        elapsed_ms(started),
                    );
                };
                info!(step = step.step_number, tool = tool_name, "Dispatching tool call");
                match self.tools.dispatch(tool_name, step.parameters.clone()).await {
                    Ok(output) => {
                        let mut facts = vec![
                            format!("Called tool {tool_name}"),
                            format!("Parameters: {}", step.parameters),
                            format!("Result: {}", output.output),
                        ];
                        facts.extend(output.facts_to_remember);
                        ActionResult {
                            success: output.success,
                            result: Some(output.output),
                            error: None,
                            execution_time_ms: elapsed_ms(started),
                            facts_to_remember: facts,
                        }
                    }
                    Err(e) => {
                        warn!(step = step.step_number, tool = tool_name, error = %e, "Tool call failed");
                        ActionResult::failure(e.to_string(), elapsed_ms(started))
                    }
                }
            }
            ActionKind::Response => {
                let message = response_payload(step);
                ActionResult {
                    success: true,
                    result: Some(Value::String(message.clone())),
                    error: None,
                    execution_time_ms: elapsed_ms(started),
                    facts_to_remember: vec![format!("Generated response: {message}")],
                }
            }
            ActionKind::QueryMemory => {
                let memory_query = step.parameters["query"]
                    .as_str()
                    .unwrap_or(&step.description)
                    .to_string();
                let facts = self
                    .facts
                    .retrieve(&FactQuery {
                        query: memory_query,
                        max_results: self.memory_max_results,
                        min_relevance: self.memory_min_relevance,
                    })
                    .await;
                let contents: Vec<Value> = facts
                    .into_iter()
                    .map(|f| Value::String(f.content))
                    .collect();
                ActionResult {
                    success: true,
                    result: Some(Value::Array(contents)),
                    error: None,
                    execution_time_ms: elapsed_ms(started),
                    facts_to_remember: vec![],
                }
            }
        }
    }

    async fn record_preferences(&self) {
        if self.preferences.is_empty() || self.preferences_recorded.swap(true, Ordering::SeqCst) {
            return;
        }
        for (key, value) in &self.preferences {
            self.facts
                .store(format!("User preference: {key} = {value}"), "user_preferences", 1.0)
                .await;
            self.facts.set_context(key, value.clone()).await;
        }
        info!(count = self.preferences.len(), "Recorded user preferences");
    }

    async fn final_response(
        &self,
        query: &str,
        state: &CognitiveState,
        result: String,
    ) -> AgentResponse {
        self.snapshot().await;
        info!(iterations = state.budget.used(), result = %result, "Processing complete");
        AgentResponse {
            success: true,
            query: query.to_string(),
            result,
            error: None,
            iterations: state.budget.used(),
        }
    }

    fn error_response(&self, query: &str, state: &CognitiveState, error: String) -> AgentResponse {
        warn!(error = %error, "Request aborted on oracle failure");
        AgentResponse {
            success: false,
            query: query.to_string(),
            result: format!("Error: {error}"),
            error: Some(error),
            iterations: state.budget.used(),
        }
    }

    /// Snapshot failures are logged and swallowed; an in-memory run must
    /// not fail because its snapshot could not be written.
    async fn snapshot(&self) {
        if let Some(snapshots) = &self.snapshots {
            if let Err(e) = snapshots.save(&self.facts).await {
                warn!(error = %e, "Failed to write memory snapshot");
            }
        }
    }
}

fn response_payload(step: &ActionStep) -> String {
    match step.parameters.get("message") {
        Some(Value::String(s)) => s.clone(),
        Some(other) if !other.is_null() => other.to_string(),
        _ => step.description.clone(),
    }
}

fn step_summary(step: &ActionStep, result: &ActionResult) -> String {
    let what = match step.kind {
        ActionKind::ToolCall => step.tool_name.clone().unwrap_or_else(|| "tool_call".into()),
        ActionKind::Response => "response".into(),
        ActionKind::QueryMemory => "query_memory".into(),
    };
    let outcome = if result.success {
        result
            .result
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "ok".into())
    } else {
        format!("failed: {}", result.error.as_deref().unwrap_or("unknown"))
    };
    format!("Step {}: {} -> {}", step.step_number, what, outcome)
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
