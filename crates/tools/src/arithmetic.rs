//! Arithmetic tool — one binary operation per call.

use async_trait::async_trait;
use mentat_core::error::ToolError;
use mentat_core::{Tool, ToolOutput};
use serde_json::{Value, json};

pub struct ArithmeticTool;

#[async_trait]
impl Tool for ArithmeticTool {
    fn name(&self) -> &str {
        "arithmetic"
    }

    fn description(&self) -> &str {
        "Perform a binary arithmetic operation: add, subtract, multiply, or divide two numbers."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "op": {
                    "type": "string",
                    "enum": ["add", "subtract", "multiply", "divide"],
                    "description": "The operation to perform"
                },
                "a": { "type": "number", "description": "Left operand" },
                "b": { "type": "number", "description": "Right operand" }
            },
            "required": ["op", "a", "b"]
        })
    }

    async fn execute(&self, parameters: Value) -> Result<ToolOutput, ToolError> {
        let op = parameters["op"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'op' argument".into()))?;
        let a = number_arg(&parameters, "a")?;
        let b = number_arg(&parameters, "b")?;

        let result = match op {
            "add" => a + b,
            "subtract" => a - b,
            "multiply" => a * b,
            "divide" => {
                if b == 0.0 {
                    return Err(ToolError::ExecutionFailed {
                        tool_name: "arithmetic".into(),
                        reason: "division by zero".into(),
                    });
                }
                a / b
            }
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "Unknown operation '{other}'"
                )));
            }
        };

        Ok(ToolOutput::ok(json!({"result": result})))
    }
}

fn number_arg(parameters: &Value, name: &str) -> Result<f64, ToolError> {
    parameters[name]
        .as_f64()
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing numeric '{name}' argument")))
}
