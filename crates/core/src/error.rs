//! Error types for the Mentat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Mentat operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Planning oracle errors ---
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Vector index errors ---
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures talking to (or making sense of) the planning oracle.
///
/// `ParseFailed` is recovered locally with a fallback plan/perception and is
/// never surfaced to the caller as a hard failure; the remaining variants
/// abort the request.
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    #[error("Oracle response is not a valid plan: {0}")]
    ParseFailed(String),

    #[error("Oracle request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by oracle, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Oracle not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Ingest job failed: {0}")]
    IngestFailed(String),
}

/// Shape violations on the vector index. An `add` that fails with one of
/// these has not mutated the index or its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("Embedding count {embeddings} does not match record count {records}")]
    CountMismatch { records: usize, embeddings: usize },

    #[error("Embedding {position} has dimension {actual}, index expects {expected}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oracle_error_displays_correctly() {
        let err = Error::Oracle(OracleError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn index_error_displays_shape() {
        let err = Error::Index(IndexError::DimensionMismatch {
            position: 2,
            expected: 768,
            actual: 512,
        });
        assert!(err.to_string().contains("768"));
        assert!(err.to_string().contains("512"));
    }

    #[test]
    fn tool_not_found_displays_name() {
        let err = Error::Tool(ToolError::NotFound("send_email".into()));
        assert!(err.to_string().contains("send_email"));
    }
}
