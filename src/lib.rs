//! taintflow - data-flow taint analysis for injection vulnerability detection
//!
//! This crate tracks untrusted data from sources (request parameters) to
//! sinks (shell execution, query execution) through a data-flow graph built
//! from an already-parsed program representation. Sanitizers cut their
//! category; everything else propagates conservatively, including calls
//! whose target cannot be resolved.
//!
//! ## Features
//!
//! - Declarative source/sink/sanitizer rules with wildcard matchers,
//!   loadable from JSON documents
//! - Inter-procedural propagation: call-site arguments bind to callee
//!   parameters, within and across units
//! - Worklist fixpoint with guaranteed termination on cyclic graphs, plus
//!   iteration and wall-clock guards
//! - Deterministic, deduplicated findings with full source-to-sink paths
//! - Optional SARIF v2.1.0 rendering
//!
//! ## Usage
//!
//! ```rust
//! use taintflow::domain::ast::ProgramUnit;
//! use taintflow::infrastructure::default_rules;
//!
//! let unit = ProgramUnit { file: "app.js".into(), body: vec![] };
//! let findings = taintflow::analyze(&[unit], &default_rules()).unwrap();
//! assert!(findings.is_empty());
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::use_cases::{
    analyze, analyze_with_config, AnalysisError, AnalyzeProjectUseCase, ProjectAnalysis,
    SkippedGroup,
};
pub use config::EngineConfig;
pub use domain::finding::{Finding, PathStep};
pub use domain::graph::{FlowGraph, Location, NodeId, NodeKind};
pub use domain::rule::{Rule, RuleRole, RuleSet};
