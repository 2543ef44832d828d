//! Findings
//!
//! Immutable vulnerability reports, created only by the reporter after the
//! engine has finished.

use serde::{Deserialize, Serialize};

use super::graph::{Location, NodeKind};

/// One step of a reconstructed source-to-sink path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub kind: NodeKind,
    pub location: Location,
}

/// A reported taint flow from an untrusted source into a dangerous sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Stable fingerprint; identical inputs produce identical ids
    pub id: String,
    /// The sink rule that fired
    pub rule_id: String,
    pub category: String,
    pub source_location: Location,
    pub sink_location: Location,
    /// Source to sink inclusive
    pub path: Vec<PathStep>,
    /// Whether any call on the path could not be resolved and was treated
    /// as opaque passthrough
    pub unresolved_calls_on_path: bool,
}
