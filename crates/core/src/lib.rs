//! # Mentat Core
//!
//! Domain types, traits, and error definitions for the Mentat cognitive
//! agent. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (planning oracle, embedder, tools) is defined
//! as a trait here. Implementations live in their respective crates. This
//! enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod budget;
pub mod error;
pub mod oracle;
pub mod plan;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use budget::IterationBudget;
pub use error::{Error, IndexError, MemoryError, OracleError, Result, ToolError};
pub use oracle::{DecisionContext, Embedder, PerceptionContext, PlanningOracle};
pub use plan::{
    ActionKind, ActionResult, ActionStep, AgentResponse, CognitiveState, Decision, Perception,
    PerceptionFallback, PlannerOutcome,
};
pub use tool::{Tool, ToolDefinition, ToolOutput, ToolRegistry};
