//! Cross-step result materialization.
//!
//! Plan parameters may contain `RESULT_FROM_STEP_N` tokens referencing the
//! output of an earlier step. Resolution is a pure recursive transform over
//! the parameter tree: string scalars matching the token pattern are
//! replaced with the referenced step's value, everything else passes through
//! untouched. Unresolved references (step not yet completed) also pass
//! through unchanged; partial plans under budget exhaustion still resolve
//! what they can.

use regex_lite::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Parameter names whose values are free text for a human reader. A value
/// substituted into one of these is wrapped into a formatted report instead
/// of being inlined raw.
const TEXT_PARAMS: &[&str] = &["content", "text", "message", "body", "description"];

/// Keys checked first when pulling a meaningful value out of a structured
/// result, in priority order.
const ANSWER_KEYS: &[&str] = &["result", "value", "answer", "solution", "salary", "output"];

fn step_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"RESULT_FROM_STEP_(\d+)").unwrap())
}

fn numeric_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-?\d+\.?\d*").unwrap())
}

/// A value extracted from a raw step result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extracted {
    Number(f64),
    Bool(bool),
}

impl Extracted {
    /// Render for user-facing output. Integral floats print without the
    /// trailing `.0`.
    pub fn display(&self) -> String {
        match self {
            Extracted::Number(n) if n.fract() == 0.0 && n.is_finite() => {
                format!("{}", *n as i64)
            }
            Extracted::Number(n) => format!("{n}"),
            Extracted::Bool(b) => format!("{b}"),
        }
    }

    fn to_value(self) -> Value {
        match self {
            Extracted::Number(n) => serde_json::Number::from_f64(n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Extracted::Bool(b) => Value::Bool(b),
        }
    }
}

/// Resolve every `RESULT_FROM_STEP_N` reference in `parameters` against the
/// completed-results map. Idempotent: resolving an already resolved tree is
/// a no-op, since substituted values no longer contain the token.
pub fn resolve_placeholders(
    parameters: &Value,
    results: &BTreeMap<u32, Value>,
    query: &str,
) -> Value {
    resolve_recursive(parameters, None, results, query)
}

fn resolve_recursive(
    value: &Value,
    param_name: Option<&str>,
    results: &BTreeMap<u32, Value>,
    query: &str,
) -> Value {
    match value {
        Value::String(s) => resolve_string(s, param_name, results, query),
        Value::Object(map) => {
            let mut resolved = Map::with_capacity(map.len());
            for (key, inner) in map {
                resolved.insert(
                    key.clone(),
                    resolve_recursive(inner, Some(key), results, query),
                );
            }
            Value::Object(resolved)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| resolve_recursive(item, None, results, query))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn resolve_string(
    s: &str,
    param_name: Option<&str>,
    results: &BTreeMap<u32, Value>,
    query: &str,
) -> Value {
    let Some(captures) = step_ref_pattern().captures(s) else {
        return Value::String(s.to_string());
    };
    let step_number: u32 = match captures[1].parse() {
        Ok(n) => n,
        Err(_) => return Value::String(s.to_string()),
    };
    let Some(result) = results.get(&step_number) else {
        // Fail-open: the referenced step has not completed.
        return Value::String(s.to_string());
    };

    let Some(extracted) = extract_value(result) else {
        return result.clone();
    };

    let is_text_destination = param_name
        .map(|name| TEXT_PARAMS.contains(&name.to_lowercase().as_str()))
        .unwrap_or(false);

    if is_text_destination {
        Value::String(build_report(query, &extracted.display()))
    } else {
        extracted.to_value()
    }
}

/// Pull a meaningful numeric/boolean value out of a raw step result.
///
/// Priority: scalar as-is, then structured answer keys, then the last
/// element of any numeric list, then any numeric field, then the first
/// numeric literal in plain text. `None` when nothing is extractable.
pub fn extract_value(result: &Value) -> Option<Extracted> {
    match result {
        Value::Number(n) => n.as_f64().map(Extracted::Number),
        Value::Bool(b) => Some(Extracted::Bool(*b)),
        Value::Object(map) => extract_from_object(map),
        Value::String(s) => {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(s) {
                return extract_from_object(&map);
            }
            extract_first_numeric(s)
        }
        _ => None,
    }
}

fn extract_from_object(map: &Map<String, Value>) -> Option<Extracted> {
    for key in ANSWER_KEYS {
        if let Some(value) = map.get(*key) {
            if let Some(extracted) = scalar_value(value) {
                return Some(extracted);
            }
        }
    }
    for value in map.values() {
        if let Value::Array(items) = value {
            if let Some(Value::Number(n)) = items.last() {
                if let Some(f) = n.as_f64() {
                    return Some(Extracted::Number(f));
                }
            }
        }
    }
    map.values().find_map(scalar_value)
}

fn scalar_value(value: &Value) -> Option<Extracted> {
    match value {
        Value::Number(n) => n.as_f64().map(Extracted::Number),
        Value::Bool(b) => Some(Extracted::Bool(*b)),
        _ => None,
    }
}

/// First numeric literal in plain text, if any.
pub fn extract_first_numeric(text: &str) -> Option<Extracted> {
    numeric_pattern()
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(Extracted::Number)
}

/// True if any string in the tree still contains a step reference token.
pub fn has_unresolved_refs(parameters: &Value) -> bool {
    match parameters {
        Value::String(s) => step_ref_pattern().is_match(s),
        Value::Object(map) => map.values().any(has_unresolved_refs),
        Value::Array(items) => items.iter().any(has_unresolved_refs),
        _ => false,
    }
}

/// Wrap a computed value into a human-readable report for text
/// destinations.
fn build_report(query: &str, value: &str) -> String {
    let rule = "=".repeat(40);
    let mut lines = vec!["Mentat Result".to_string(), rule.clone(), String::new()];
    if !query.is_empty() {
        lines.push(format!("Query: {query}"));
        lines.push(String::new());
    }
    lines.push(format!("Result: {value}"));
    lines.push(String::new());
    lines.push(rule);
    lines.push("Computed by Mentat".to_string());
    lines.join("\n")
}
