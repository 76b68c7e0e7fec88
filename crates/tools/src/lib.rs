//! Built-in tools for the Mentat agent.
//!
//! Pure, stateless capabilities the scheduler can dispatch: arithmetic,
//! integer sequences, and report delivery. `default_registry` wires them
//! all up for the CLI.

pub mod arithmetic;
pub mod report;
pub mod sequences;

pub use arithmetic::ArithmeticTool;
pub use report::SendReportTool;
pub use sequences::{FactorialTool, FibonacciTool};

use mentat_core::ToolRegistry;

/// Registry with every built-in tool registered.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ArithmeticTool));
    registry.register(Box::new(FactorialTool));
    registry.register(Box::new(FibonacciTool));
    registry.register(Box::new(SendReportTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_all_builtins() {
        let registry = default_registry();
        assert_eq!(registry.len(), 4);
        for name in ["arithmetic", "factorial", "fibonacci", "send_report"] {
            assert!(registry.get(name).is_some(), "missing tool {name}");
        }
    }
}
