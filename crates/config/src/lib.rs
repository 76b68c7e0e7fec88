//! Configuration loading, validation, and management for Mentat.
//!
//! Loads configuration from `~/.mentat/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use mentat_core::error::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.mentat/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Hard iteration budget per request (oracle calls + tool calls)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Directory for snapshots and index artifacts
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

fn default_max_iterations() -> u32 {
    50
}

fn default_data_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".mentat")
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("max_iterations", &self.max_iterations)
            .field("data_dir", &self.data_dir)
            .field("memory", &self.memory)
            .field("index", &self.index)
            .field("oracle", &self.oracle)
            .field("embedding", &self.embedding)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Snapshot file name inside `data_dir`
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,

    /// Rotate the snapshot once it exceeds this size
    #[serde(default = "default_max_snapshot_bytes")]
    pub max_snapshot_bytes: u64,

    /// Keep only the newest N rotated snapshots
    #[serde(default = "default_max_rotated_files")]
    pub max_rotated_files: usize,

    /// Default retrieval limit
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Minimum word-overlap ratio for retrieval
    #[serde(default = "default_min_relevance")]
    pub min_relevance: f64,
}

fn default_snapshot_file() -> String {
    "memory.json".into()
}
fn default_max_snapshot_bytes() -> u64 {
    5 * 1024 * 1024
}
fn default_max_rotated_files() -> usize {
    10
}
fn default_max_results() -> usize {
    5
}
fn default_min_relevance() -> f64 {
    0.3
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            snapshot_file: default_snapshot_file(),
            max_snapshot_bytes: default_max_snapshot_bytes(),
            max_rotated_files: default_max_rotated_files(),
            max_results: default_max_results(),
            min_relevance: default_min_relevance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Fixed embedding dimension (768 for nomic-embed-text)
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Embedding artifact file name inside `data_dir`
    #[serde(default = "default_vectors_file")]
    pub vectors_file: String,

    /// Metadata artifact file name inside `data_dir`
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,
}

fn default_dimension() -> usize {
    768
}
fn default_vectors_file() -> String {
    "index_vectors.json".into()
}
fn default_metadata_file() -> String {
    "index_metadata.json".into()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            vectors_file: default_vectors_file(),
            metadata_file: default_metadata_file(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// API key; `MENTAT_ORACLE_API_KEY` overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_oracle_model")]
    pub model: String,

    #[serde(default = "default_oracle_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_oracle_model() -> String {
    "gemini-2.5-flash".into()
}
fn default_oracle_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_oracle_model(),
            base_url: default_oracle_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,
}

fn default_embedding_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".into()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            data_dir: default_data_dir(),
            memory: MemoryConfig::default(),
            index: IndexConfig::default(),
            oracle: OracleConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Default config path: `~/.mentat/config.toml`.
    pub fn default_path() -> PathBuf {
        default_data_dir().join("config.toml")
    }

    /// Load from the default path, falling back to defaults if the file
    /// does not exist. Environment overrides are applied afterwards.
    pub fn load() -> Result<Self, Error> {
        Self::load_from(&Self::default_path())
    }

    /// Load from an explicit path; missing file means defaults.
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| Error::Config {
                message: format!("Invalid config at {}: {e}", path.display()),
            })?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("MENTAT_ORACLE_API_KEY") {
            if !key.is_empty() {
                self.oracle.api_key = Some(key);
            }
        }
        if let Ok(model) = std::env::var("MENTAT_ORACLE_MODEL") {
            if !model.is_empty() {
                self.oracle.model = model;
            }
        }
        if let Ok(max) = std::env::var("MENTAT_MAX_ITERATIONS") {
            if let Ok(n) = max.parse() {
                self.max_iterations = n;
            }
        }
    }

    /// Validate settings. Called at startup so misconfiguration fails fast.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_iterations == 0 {
            return Err(Error::Config {
                message: "max_iterations must be at least 1".into(),
            });
        }
        if self.index.dimension == 0 {
            return Err(Error::Config {
                message: "index.dimension must be positive".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.memory.min_relevance) {
            return Err(Error::Config {
                message: "memory.min_relevance must be within 0.0..=1.0".into(),
            });
        }
        if self.memory.max_rotated_files == 0 {
            return Err(Error::Config {
                message: "memory.max_rotated_files must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(&self.memory.snapshot_file)
    }

    pub fn vectors_path(&self) -> PathBuf {
        self.data_dir.join(&self.index.vectors_file)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join(&self.index.metadata_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.index.dimension, 768);
        assert_eq!(config.memory.max_rotated_files, 10);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/mentat/config.toml")).unwrap();
        assert_eq!(config.max_iterations, 50);
    }

    #[test]
    fn loads_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_iterations = 10\n\n[memory]\nmax_results = 3").unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.memory.max_results, 3);
        // Untouched sections keep defaults
        assert_eq!(config.index.dimension, 768);
    }

    #[test]
    fn rejects_zero_iterations() {
        let mut config = AppConfig::default();
        config.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_relevance() {
        let mut config = AppConfig::default();
        config.memory.min_relevance = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.oracle.api_key = Some("super-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
