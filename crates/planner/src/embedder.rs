//! Ollama embedding client.
//!
//! Talks to a local Ollama server's `/api/embeddings` endpoint and checks
//! the returned vector against the configured dimension, so a model swap on
//! the server side cannot silently poison the index.

use async_trait::async_trait;
use mentat_core::Embedder;
use mentat_core::error::MemoryError;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Embedder backed by a local Ollama server.
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, MemoryError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| MemoryError::EmbeddingFailed(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimension,
            client,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "prompt": text,
        });

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_connect() {
                MemoryError::EmbeddingFailed(format!(
                    "Cannot reach Ollama at {}; is the server running? ({e})",
                    self.base_url
                ))
            } else {
                MemoryError::EmbeddingFailed(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(MemoryError::EmbeddingFailed(format!(
                "Ollama returned status {status}: {error_body}"
            )));
        }

        let api_resp: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| MemoryError::EmbeddingFailed(format!("Malformed Ollama response: {e}")))?;

        if api_resp.embedding.len() != self.dimension {
            return Err(MemoryError::EmbeddingFailed(format!(
                "Model {} produced a {}-dimensional embedding, expected {}",
                self.model,
                api_resp.embedding.len(),
                self.dimension
            )));
        }

        debug!(model = %self.model, chars = text.len(), "Generated embedding");
        Ok(api_resp.embedding)
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_trims_trailing_slash() {
        let embedder = OllamaEmbedder::new("http://localhost:11434/", "nomic-embed-text", 768)
            .unwrap();
        assert_eq!(embedder.base_url, "http://localhost:11434");
        assert_eq!(embedder.dimension(), 768);
    }

    #[test]
    fn response_deserializes() {
        let resp: EmbeddingResponse =
            serde_json::from_str(r#"{"embedding": [0.1, 0.2, 0.3]}"#).unwrap();
        assert_eq!(resp.embedding.len(), 3);
    }
}
