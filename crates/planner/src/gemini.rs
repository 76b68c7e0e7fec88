//! Gemini planning oracle over the generateContent REST API.
//!
//! One HTTP round trip per phase: perception and decision each render a
//! prompt, post it, and parse the first candidate's text. Transport and
//! status failures surface as `OracleError`; malformed JSON in an otherwise
//! successful response degrades to a fallback outcome inside the parser.

use crate::parse::{parse_decision, parse_perception};
use crate::prompts::{render_decision_prompt, render_perception_prompt};
use async_trait::async_trait;
use mentat_core::error::OracleError;
use mentat_core::{
    Decision, DecisionContext, Perception, PerceptionContext, PlannerOutcome, PlanningOracle,
};
use serde::Deserialize;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Planning oracle backed by Google's Gemini generateContent API.
pub struct GeminiPlanner {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiPlanner {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, OracleError> {
        Self::with_timeout(api_key, model, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, OracleError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(OracleError::NotConfigured(
                "Gemini API key is not set".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OracleError::Network(e.to_string()))?;

        Ok(Self {
            name: "gemini".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key,
            model: model.into(),
            client,
        })
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// One generateContent round trip: prompt in, candidate text out.
    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = serde_json::json!({
            "contents": [{"parts": [{"text": prompt}]}]
        });

        debug!(model = %self.model, "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| OracleError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(OracleError::RateLimited { retry_after_secs: 5 });
        }
        if status == 401 || status == 403 {
            return Err(OracleError::AuthenticationFailed(
                "Invalid Gemini API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Gemini API error");
            return Err(OracleError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: GenerateContentResponse =
            response.json().await.map_err(|e| OracleError::ApiError {
                status_code: 200,
                message: format!("Failed to parse Gemini response: {e}"),
            })?;

        api_resp
            .first_text()
            .ok_or_else(|| OracleError::ParseFailed("Gemini response had no candidates".into()))
    }
}

#[async_trait]
impl PlanningOracle for GeminiPlanner {
    fn name(&self) -> &str {
        &self.name
    }

    async fn perceive(
        &self,
        ctx: &PerceptionContext,
    ) -> Result<PlannerOutcome<Perception>, OracleError> {
        let prompt = render_perception_prompt(ctx);
        let raw = self.generate(&prompt).await?;
        Ok(parse_perception(&raw, &ctx.query))
    }

    async fn decide(
        &self,
        ctx: &DecisionContext,
    ) -> Result<PlannerOutcome<Decision>, OracleError> {
        let prompt = render_decision_prompt(ctx);
        let raw = self.generate(&prompt).await?;
        Ok(parse_decision(&raw))
    }
}

// --- Gemini API types ---

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn first_text(&self) -> Option<String> {
        self.candidates
            .first()?
            .content
            .parts
            .first()
            .map(|p| p.text.clone())
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}
