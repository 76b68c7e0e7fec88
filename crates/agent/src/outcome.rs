//! Final-result synthesis from executed tool-call steps.
//!
//! Each completed tool-call result is classified as either a status message
//! (contains a completion verb) or a computation value (extractable
//! numeric/boolean payload). Three or more computation values are treated as
//! a chained pipeline where only the last is meaningful; exactly two are
//! independent answers and both are surfaced; one stands alone. Status
//! messages only surface when no computation value exists.

use crate::resolver::{Extracted, extract_first_numeric, extract_value};
use mentat_core::{ActionKind, ActionResult, ActionStep};
use serde_json::Value;
use tracing::debug;

/// Keywords that mark a result as a surfaceable status message.
const STATUS_KEYWORDS: &[&str] = &["sent", "created", "added", "successfully"];

/// Keywords that disqualify a result from computation parsing. A superset
/// of the status keywords: "failed" is neither a computation nor a status
/// worth surfacing.
const NON_COMPUTATION_KEYWORDS: &[&str] = &["sent", "created", "added", "successfully", "failed"];

/// Classifies step results and synthesizes the final answer. The keyword
/// tables are the whole policy; swap this out to change what counts as a
/// status message.
#[derive(Debug, Default)]
pub struct ResultClassifier;

impl ResultClassifier {
    /// Synthesize a final result from executed steps, or `None` when
    /// nothing surfaceable was produced.
    pub fn finalize(&self, executed: &[(ActionStep, ActionResult)]) -> Option<String> {
        let mut computations: Vec<Extracted> = Vec::new();
        let mut status_message: Option<String> = None;

        for (step, result) in executed {
            if step.kind != ActionKind::ToolCall || !result.success {
                continue;
            }
            let Some(value) = &result.result else {
                continue;
            };
            let text = value_text(value);

            if self.is_status(&text) {
                status_message = Some(text);
                continue;
            }
            if let Some(extracted) = self.parse_computation(value, &text) {
                computations.push(extracted);
            }
        }

        debug!(
            computations = computations.len(),
            has_status = status_message.is_some(),
            "Finalizing result"
        );

        match computations.len() {
            0 => status_message,
            1 => Some(computations[0].display()),
            2 => Some(
                computations
                    .iter()
                    .map(Extracted::display)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            // A chain: intermediate values fed later steps, only the last
            // matters to the user.
            _ => computations.last().map(Extracted::display),
        }
    }

    pub fn is_status(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        STATUS_KEYWORDS.iter().any(|kw| lowered.contains(kw))
    }

    fn parse_computation(&self, value: &Value, text: &str) -> Option<Extracted> {
        let lowered = text.to_lowercase();
        if NON_COMPUTATION_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            return None;
        }
        extract_value(value).or_else(|| extract_first_numeric(text))
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool_step(step_number: u32) -> ActionStep {
        ActionStep {
            step_number,
            kind: ActionKind::ToolCall,
            description: String::new(),
            tool_name: Some("arithmetic".into()),
            parameters: json!({}),
            reasoning: String::new(),
        }
    }

    fn ok_result(value: Value) -> ActionResult {
        ActionResult {
            success: true,
            result: Some(value),
            error: None,
            execution_time_ms: 1,
            facts_to_remember: vec![],
        }
    }

    #[test]
    fn three_chained_values_surface_only_the_last() {
        let executed = vec![
            (tool_step(1), ok_result(json!({"result": 5}))),
            (tool_step(2), ok_result(json!({"result": 10}))),
            (tool_step(3), ok_result(json!({"result": 15}))),
        ];
        assert_eq!(ResultClassifier.finalize(&executed).as_deref(), Some("15"));
    }

    #[test]
    fn two_independent_values_are_comma_joined() {
        let executed = vec![
            (tool_step(1), ok_result(json!({"result": 7}))),
            (tool_step(2), ok_result(json!({"result": 8}))),
        ];
        assert_eq!(
            ResultClassifier.finalize(&executed).as_deref(),
            Some("7, 8")
        );
    }

    #[test]
    fn single_value_stands_alone() {
        let executed = vec![(tool_step(1), ok_result(json!({"result": 42})))];
        assert_eq!(ResultClassifier.finalize(&executed).as_deref(), Some("42"));
    }

    #[test]
    fn status_message_surfaces_when_no_computation() {
        let executed = vec![(
            tool_step(1),
            ok_result(json!("Report sent successfully to ops")),
        )];
        assert_eq!(
            ResultClassifier.finalize(&executed).as_deref(),
            Some("Report sent successfully to ops")
        );
    }

    #[test]
    fn computation_beats_status_message() {
        let executed = vec![
            (tool_step(1), ok_result(json!({"result": 42}))),
            (tool_step(2), ok_result(json!("Report sent successfully"))),
        ];
        assert_eq!(ResultClassifier.finalize(&executed).as_deref(), Some("42"));
    }

    #[test]
    fn failed_steps_are_ignored() {
        let executed = vec![
            (
                tool_step(1),
                ActionResult::failure("tool exploded", 3),
            ),
            (tool_step(2), ok_result(json!({"result": 9}))),
        ];
        assert_eq!(ResultClassifier.finalize(&executed).as_deref(), Some("9"));
    }

    #[test]
    fn response_steps_do_not_contribute() {
        let mut step = tool_step(1);
        step.kind = ActionKind::Response;
        let executed = vec![(step, ok_result(json!("some response text 5")))];
        assert_eq!(ResultClassifier.finalize(&executed), None);
    }

    #[test]
    fn nothing_surfaceable_yields_none() {
        let executed = vec![(tool_step(1), ok_result(json!("no numbers, no status")))];
        assert_eq!(ResultClassifier.finalize(&executed), None);
    }

    #[test]
    fn sequence_results_extract_last_element() {
        let executed = vec![(
            tool_step(1),
            ok_result(json!({"sequence": [1, 1, 2, 3, 5]})),
        )];
        assert_eq!(ResultClassifier.finalize(&executed).as_deref(), Some("5"));
    }
}
