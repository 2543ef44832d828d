//! Taint labels and propagation state

use serde::{Deserialize, Serialize};

use super::graph::NodeId;

/// Marks a value as influenced by one untrusted source. A node carries a
/// set of labels; several categories and sources co-propagate independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaintLabel {
    pub category: String,
    /// The source node this label originated at
    pub source: NodeId,
}

/// Per-category state of one node after propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaintStatus {
    /// Never reached by the fixpoint for this category
    Unvisited,
    Tainted,
    /// Classified sanitizer for the category; taint stopped here
    Sanitized,
    /// Examined during propagation but never tainted
    VisitedClean,
}

/// A candidate source-to-sink flow recorded by the engine, before
/// deduplication and ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaintPath {
    pub category: String,
    /// The sink rule that fired
    pub rule_id: String,
    pub source: NodeId,
    pub sink: NodeId,
    /// Node ids from source to sink inclusive
    pub nodes: Vec<NodeId>,
}
