//! Infrastructure layer
//!
//! - Graph builder: program units lowered to the data-flow graph
//! - Catalog: compiled source/sink/sanitizer matchers
//! - Propagation: worklist fixpoint with guards
//! - Reporter: deduplicated, deterministically ordered findings
//! - Rules: embedded default rule set
//! - Sarif: optional report rendering

pub mod catalog;
pub mod graph_builder;
pub mod propagation;
pub mod reporter;
pub mod rules;
pub mod sarif;

pub use catalog::Catalog;
pub use graph_builder::{BuildError, GraphBuilder};
pub use propagation::{EngineError, Propagation, PropagationEngine};
pub use reporter::report;
pub use rules::default_rules;
pub use sarif::to_sarif;
