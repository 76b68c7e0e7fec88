//! The cognitive scheduler and its result plumbing.
//!
//! [`Scheduler::run`] drives one request through perceive, scope check,
//! decide, and execute phases under a hard iteration budget. The
//! [`resolver`] module materializes cross-step result references inside
//! plan parameters; the [`outcome`] module classifies step results and
//! synthesizes the final answer when no explicit response was produced.

pub mod outcome;
pub mod resolver;
pub mod scheduler;

pub use resolver::{extract_value, has_unresolved_refs, resolve_placeholders};
pub use scheduler::Scheduler;
