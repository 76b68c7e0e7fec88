//! The iteration budget — the hard bound on cognitive work per request.
//!
//! Every oracle call and every tool-call step charges one unit. Once the
//! budget is exhausted the scheduler issues no further oracle calls and
//! dispatches no further steps; whatever partial result exists is returned.

use serde::{Deserialize, Serialize};

/// Default maximum iterations per request.
pub const DEFAULT_MAX_ITERATIONS: u32 = 50;

/// A monotonically increasing counter bounded above by a configured maximum.
///
/// The counter never decreases. `charge` saturates at the maximum rather
/// than overshooting, so the count observed in the final response can never
/// exceed the configured limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationBudget {
    used: u32,
    max: u32,
}

impl IterationBudget {
    pub fn new(max: u32) -> Self {
        Self { used: 0, max }
    }

    /// Consume one iteration unit. Returns `false` if the budget was already
    /// exhausted (in which case nothing is charged).
    pub fn charge(&mut self) -> bool {
        if self.used >= self.max {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.max
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn remaining(&self) -> u32 {
        self.max - self.used
    }
}

impl Default for IterationBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS)
    }
}
