//! Engine configuration

use serde::{Deserialize, Serialize};

/// Tuning knobs for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hard cap on worklist iterations across all categories; `None`
    /// derives a bound from graph size, category count, and source count
    pub max_iterations: Option<usize>,
    /// Wall-clock budget per unit group, in milliseconds; `None` disables
    /// the clock guard
    pub time_budget_ms: Option<u64>,
    /// Bind call-site arguments to callee parameters, within and across
    /// units; when off, every call is an opaque passthrough
    pub interprocedural: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            time_budget_ms: Some(10_000),
            interprocedural: true,
        }
    }
}
