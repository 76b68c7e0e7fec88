//! Parsing of raw oracle output into structured perception and decision
//! values.
//!
//! Models wrap JSON in markdown fences often enough that stripping them is
//! the first step of every parse. A response that still fails to parse
//! becomes a fixed-shape fallback, not an error: perception degrades to an
//! "unknown" intent that requires tools, decision degrades to a single
//! response step that ends the plan cycle.

use mentat_core::{
    ActionKind, ActionStep, Decision, Perception, PerceptionFallback, PlannerOutcome,
};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Remove markdown code fences from a response, if present.
///
/// Keeps every non-empty line that is not a fence marker, so a stray
/// trailing fence or a `json` language tag never reaches the JSON parser.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    trimmed
        .lines()
        .filter(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with("```")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a raw perception response.
pub fn parse_perception(raw: &str, query: &str) -> PlannerOutcome<Perception> {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<Perception>(&cleaned) {
        Ok(perception) => PlannerOutcome::Parsed(perception),
        Err(e) => {
            warn!(error = %e, "Perception response did not parse, using fallback");
            PlannerOutcome::Fallback(Perception {
                intent: "unknown".into(),
                entities: BTreeMap::new(),
                extracted_facts: vec![format!("User query: {query}")],
                requires_tools: true,
                confidence: 0.5,
                fallback: Some(PerceptionFallback::default()),
            })
        }
    }
}

/// Parse a raw decision response.
pub fn parse_decision(raw: &str) -> PlannerOutcome<Decision> {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<Decision>(&cleaned) {
        Ok(decision) => PlannerOutcome::Parsed(decision),
        Err(e) => {
            warn!(error = %e, "Decision response did not parse, using fallback");
            PlannerOutcome::Fallback(Decision {
                action_plan: vec![ActionStep {
                    step_number: 1,
                    kind: ActionKind::Response,
                    description: "Provide direct response to user".into(),
                    tool_name: None,
                    parameters: Value::Object(serde_json::Map::new()),
                    reasoning: "Fallback due to decision parsing error".into(),
                }],
                reasoning: "Unable to create detailed plan, providing direct response".into(),
                confidence: 0.5,
                should_continue: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_stripped_with_language_tag() {
        let raw = "```json\n{\"intent\": \"calculation\"}\n```";
        assert_eq!(strip_code_fences(raw), "{\"intent\": \"calculation\"}");
    }

    #[test]
    fn bare_json_passes_through() {
        let raw = "{\"intent\": \"calculation\"}";
        assert_eq!(strip_code_fences(raw), raw);
    }

    #[test]
    fn multiline_fenced_json_survives() {
        let raw = "```\n{\n  \"a\": 1\n}\n```";
        assert_eq!(strip_code_fences(raw), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn perception_parses_fenced_response() {
        let raw = r#"```json
        {"intent": "calculation", "requires_tools": true, "confidence": 0.9}
        ```"#;
        let outcome = parse_perception(raw, "what is 2+2");
        assert!(!outcome.is_fallback());
        let perception = outcome.into_inner();
        assert_eq!(perception.intent, "calculation");
        assert!(perception.requires_tools);
    }

    #[test]
    fn garbled_perception_falls_back() {
        let outcome = parse_perception("I think the user wants math?", "what is 2+2");
        assert!(outcome.is_fallback());
        let perception = outcome.into_inner();
        assert_eq!(perception.intent, "unknown");
        assert!(perception.requires_tools);
        assert_eq!(perception.confidence, 0.5);
        assert_eq!(perception.extracted_facts, vec!["User query: what is 2+2"]);
    }

    #[test]
    fn decision_parses_plan() {
        let raw = r#"{
            "action_plan": [
                {"step_number": 1, "action_type": "tool_call", "tool_name": "arithmetic",
                 "parameters": {"op": "add", "a": 1, "b": 2}, "description": "", "reasoning": ""}
            ],
            "reasoning": "single addition",
            "confidence": 0.95,
            "should_continue": false
        }"#;
        let outcome = parse_decision(raw);
        assert!(!outcome.is_fallback());
        let decision = outcome.into_inner();
        assert_eq!(decision.action_plan.len(), 1);
        assert!(!decision.should_continue);
    }

    #[test]
    fn garbled_decision_falls_back_to_single_response_step() {
        let outcome = parse_decision("no plan today");
        assert!(outcome.is_fallback());
        let decision = outcome.into_inner();
        assert_eq!(decision.action_plan.len(), 1);
        assert_eq!(decision.action_plan[0].kind, ActionKind::Response);
        assert_eq!(decision.action_plan[0].step_number, 1);
        assert_eq!(decision.confidence, 0.5);
        assert!(!decision.should_continue);
    }

    #[test]
    fn decision_with_unknown_extra_fields_still_parses() {
        // Oracles add fields the schema does not know about.
        let raw = r#"{
            "action_plan": [],
            "reasoning": "nothing",
            "expected_outcome": "n/a",
            "self_check": {"plan_verified": true}
        }"#;
        let outcome = parse_decision(raw);
        assert!(!outcome.is_fallback());
    }
}
