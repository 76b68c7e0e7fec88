//! Integer sequence tools: factorial and Fibonacci.

use async_trait::async_trait;
use mentat_core::error::ToolError;
use mentat_core::{Tool, ToolOutput};
use serde_json::{Value, json};

/// Largest n for which n! fits in an f64 without losing integrality.
const MAX_FACTORIAL_N: u64 = 20;

pub struct FactorialTool;

#[async_trait]
impl Tool for FactorialTool {
    fn name(&self) -> &str {
        "factorial"
    }

    fn description(&self) -> &str {
        "Compute n! for a non-negative integer n (n up to 20)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "n": { "type": "integer", "minimum": 0, "description": "The input number" }
            },
            "required": ["n"]
        })
    }

    async fn execute(&self, parameters: Value) -> Result<ToolOutput, ToolError> {
        let n = integer_arg(&parameters, "n")?;
        if n > MAX_FACTORIAL_N {
            return Err(ToolError::ExecutionFailed {
                tool_name: "factorial".into(),
                reason: format!("n = {n} exceeds the maximum of {MAX_FACTORIAL_N}"),
            });
        }
        let result: u64 = (1..=n).product();
        Ok(ToolOutput::ok(json!({"result": result})))
    }
}

pub struct FibonacciTool;

#[async_trait]
impl Tool for FibonacciTool {
    fn name(&self) -> &str {
        "fibonacci"
    }

    fn description(&self) -> &str {
        "Generate the first n Fibonacci numbers as a sequence."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "n": { "type": "integer", "minimum": 1, "description": "How many numbers to generate" }
            },
            "required": ["n"]
        })
    }

    async fn execute(&self, parameters: Value) -> Result<ToolOutput, ToolError> {
        let n = integer_arg(&parameters, "n")?;
        if n == 0 || n > 90 {
            return Err(ToolError::InvalidArguments(
                "n must be between 1 and 90".into(),
            ));
        }
        let mut sequence: Vec<u64> = Vec::with_capacity(n as usize);
        let (mut a, mut b) = (0u64, 1u64);
        for _ in 0..n {
            sequence.push(a);
            (a, b) = (b, a + b);
        }
        Ok(ToolOutput::ok(json!({"sequence": sequence})))
    }
}

fn integer_arg(parameters: &Value, name: &str) -> Result<u64, ToolError> {
    parameters[name]
        .as_u64()
        .or_else(|| {
            // Resolved placeholders arrive as floats.
            parameters[name]
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        })
        .ok_or_else(|| {
            ToolError::InvalidArguments(format!("Missing non-negative integer '{name}' argument"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn factorial_of_five() {
        let output = FactorialTool.execute(json!({"n": 5})).await.unwrap();
        assert_eq!(output.output["result"], json!(120));
    }

    #[tokio::test]
    async fn factorial_of_zero_is_one() {
        let output = FactorialTool.execute(json!({"n": 0})).await.unwrap();
        assert_eq!(output.output["result"], json!(1));
    }

    #[tokio::test]
    async fn factorial_rejects_overflow() {
        let err = FactorialTool.execute(json!({"n": 21})).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }

    #[tokio::test]
    async fn factorial_accepts_float_integer_input() {
        let output = FactorialTool.execute(json!({"n": 5.0})).await.unwrap();
        assert_eq!(output.output["result"], json!(120));
    }

    #[tokio::test]
    async fn fibonacci_sequence() {
        let output = FibonacciTool.execute(json!({"n": 6})).await.unwrap();
        assert_eq!(output.output["sequence"], json!([0, 1, 1, 2, 3, 5]));
    }

    #[tokio::test]
    async fn fibonacci_rejects_zero() {
        let err = FibonacciTool.execute(json!({"n": 0})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
