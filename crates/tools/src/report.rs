//! Report delivery tool.
//!
//! Accepts a recipient and a content block and acknowledges delivery with a
//! status message. Delivery itself is a stub: the status wording matters
//! because final-result synthesis classifies it as a status message, not a
//! computation.

use async_trait::async_trait;
use mentat_core::error::ToolError;
use mentat_core::{Tool, ToolOutput};
use serde_json::{Value, json};
use tracing::info;

pub struct SendReportTool;

#[async_trait]
impl Tool for SendReportTool {
    fn name(&self) -> &str {
        "send_report"
    }

    fn description(&self) -> &str {
        "Send a formatted report with the given content to a recipient."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "recipient": { "type": "string", "description": "Who receives the report" },
                "content": { "type": "string", "description": "The report body" }
            },
            "required": ["recipient", "content"]
        })
    }

    async fn execute(&self, parameters: Value) -> Result<ToolOutput, ToolError> {
        let recipient = parameters["recipient"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'recipient' argument".into()))?;
        let content = parameters["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        info!(recipient, bytes = content.len(), "Delivering report");

        let status = format!("Report sent successfully to {recipient}");
        Ok(ToolOutput::ok(Value::String(status.clone())).with_facts(vec![status]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivery_acknowledges_with_status() {
        let output = SendReportTool
            .execute(json!({"recipient": "ops", "content": "Result: 42"}))
            .await
            .unwrap();
        let status = output.output.as_str().unwrap();
        assert!(status.contains("sent successfully"));
        assert!(status.contains("ops"));
        assert_eq!(output.facts_to_remember.len(), 1);
    }

    #[tokio::test]
    async fn missing_content_is_invalid() {
        let err = SendReportTool
            .execute(json!({"recipient": "ops"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
