//! Prompt templates for the perception and decision phases.
//!
//! Both render to a single text block the oracle must answer with bare JSON.
//! The renderers are pure string assembly; nothing here touches the network.

use mentat_core::{DecisionContext, PerceptionContext, ToolDefinition};
use serde_json::Value;
use std::collections::BTreeMap;

const PERCEPTION_TEMPLATE: &str = r#"You are the perception layer of a task execution agent. Analyze the user query and extract structured information.

**IN SCOPE:**
- Calculations (arithmetic, sequences, numeric reasoning)
- Calculations paired with actions (e.g. "compute X and send the result as a report")
- Questions answerable from stored facts or ingested source material

**OUT OF SCOPE:**
- Requests with no computational or retrieval component the agent's tools can serve

**User Preferences:** {preferences}

**Critical Rules:**
1. If the query has ANY component the tools can serve, treat it as IN SCOPE
2. ONLY set "out_of_scope" for queries with ZERO serviceable content
3. For out-of-scope queries set "intent" to "out_of_scope" and fill in
   "fallback.suggested_clarification" with what you CAN help with

Output JSON with this structure:
{
    "intent": "calculation|information_query|tool_action|multi_step|out_of_scope",
    "entities": {"<type>": "<value>", ...},
    "extracted_facts": ["fact1", "fact2", ...],
    "requires_tools": true|false,
    "confidence": 0.0-1.0,
    "fallback": {"is_uncertain": bool, "uncertain_aspects": [...], "suggested_clarification": "..." or null}
}

Respond with ONLY the JSON object.

**User Query:** {query}"#;

const DECISION_TEMPLATE: &str = r#"You are the decision layer of a task execution agent. Create an ordered action plan using the available tools.

**User Preferences:** {preferences}
**Perception:** {perception}
**Relevant Memory:** {memory}
**Available Tools:**
{tools}
**Previously Completed Steps:** {previous_steps}

Output JSON with this structure:
{
    "action_plan": [
        {
            "step_number": 1,
            "action_type": "tool_call|response|query_memory",
            "description": "what this step does",
            "tool_name": "tool name or null",
            "parameters": {...},
            "reasoning": "why this step is needed"
        }
    ],
    "reasoning": "overall plan reasoning",
    "confidence": 0.0-1.0,
    "should_continue": false
}

**Critical Rules:**
1. Use "RESULT_FROM_STEP_N" in parameters to reference the result of step N
2. Step numbers are positive and unique; steps execute in ascending order
3. Set should_continue=false when this plan produces the final answer
4. Do not repeat steps that already appear under Previously Completed Steps

Respond with ONLY the JSON object."#;

pub fn render_perception_prompt(ctx: &PerceptionContext) -> String {
    PERCEPTION_TEMPLATE
        .replace("{preferences}", &format_preferences(&ctx.preferences))
        .replace("{query}", &ctx.query)
}

pub fn render_decision_prompt(ctx: &DecisionContext) -> String {
    let perception =
        serde_json::to_string(&ctx.perception).unwrap_or_else(|_| "{}".to_string());
    let memory = if ctx.relevant_facts.is_empty() {
        "(none)".to_string()
    } else {
        ctx.relevant_facts
            .iter()
            .map(|f| format!("- {f}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let previous = if ctx.previous_steps.is_empty() {
        "(none)".to_string()
    } else {
        ctx.previous_steps
            .iter()
            .map(|s| format!("- {s}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    DECISION_TEMPLATE
        .replace("{preferences}", &format_preferences(&ctx.preferences))
        .replace("{perception}", &perception)
        .replace("{memory}", &memory)
        .replace("{tools}", &format_tools(&ctx.tools))
        .replace("{previous_steps}", &previous)
}

fn format_preferences(preferences: &BTreeMap<String, Value>) -> String {
    if preferences.is_empty() {
        return "(none)".to_string();
    }
    preferences
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_tools(tools: &[ToolDefinition]) -> String {
    if tools.is_empty() {
        return "(none)".to_string();
    }
    tools
        .iter()
        .map(|t| {
            format!(
                "- {}: {} (parameters: {})",
                t.name, t.description, t.parameters
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentat_core::Perception;

    fn perception() -> Perception {
        Perception {
            intent: "calculation".into(),
            entities: BTreeMap::new(),
            extracted_facts: vec![],
            requires_tools: true,
            confidence: 0.9,
            fallback: None,
        }
    }

    #[test]
    fn perception_prompt_embeds_query_and_preferences() {
        let mut preferences = BTreeMap::new();
        preferences.insert("units".to_string(), Value::String("metric".into()));
        let ctx = PerceptionContext {
            query: "what is 2+2".into(),
            preferences,
        };
        let prompt = render_perception_prompt(&ctx);
        assert!(prompt.contains("**User Query:** what is 2+2"));
        assert!(prompt.contains("units: \"metric\""));
        assert!(!prompt.contains("{query}"));
        assert!(!prompt.contains("{preferences}"));
    }

    #[test]
    fn decision_prompt_lists_tools_and_facts() {
        let ctx = DecisionContext {
            query: "add then report".into(),
            perception: perception(),
            relevant_facts: vec!["salary is 50000".into()],
            tools: vec![ToolDefinition {
                name: "arithmetic".into(),
                description: "Basic arithmetic".into(),
                parameters: serde_json::json!({"type": "object"}),
            }],
            preferences: BTreeMap::new(),
            previous_steps: vec!["Step 1: tool_call arithmetic -> 4".into()],
        };
        let prompt = render_decision_prompt(&ctx);
        assert!(prompt.contains("- arithmetic: Basic arithmetic"));
        assert!(prompt.contains("- salary is 50000"));
        assert!(prompt.contains("- Step 1: tool_call arithmetic -> 4"));
        assert!(prompt.contains("\"intent\":\"calculation\""));
    }

    #[test]
    fn empty_sections_render_as_none() {
        let ctx = DecisionContext {
            query: "q".into(),
            perception: perception(),
            relevant_facts: vec![],
            tools: vec![],
            preferences: BTreeMap::new(),
            previous_steps: vec![],
        };
        let prompt = render_decision_prompt(&ctx);
        assert!(prompt.contains("**Relevant Memory:** (none)"));
        assert!(prompt.contains("**Previously Completed Steps:** (none)"));
    }
}
