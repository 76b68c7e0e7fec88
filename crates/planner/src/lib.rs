//! Planning oracle and embedding clients.
//!
//! [`GeminiPlanner`] implements the [`mentat_core::PlanningOracle`] seam over
//! Google's generateContent API; [`OllamaEmbedder`] implements
//! [`mentat_core::Embedder`] over a local Ollama server. Both degrade
//! gracefully: malformed model output becomes a `PlannerOutcome::Fallback`,
//! never a hard error.

pub mod embedder;
pub mod gemini;
pub mod parse;
pub mod prompts;

pub use embedder::OllamaEmbedder;
pub use gemini::GeminiPlanner;
