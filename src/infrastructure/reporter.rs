//! Finding reporter
//!
//! Turns the engine's candidate paths into immutable findings:
//! deduplicated by (category, path signature), ordered by source location,
//! then sink location, then category, and fingerprinted so that repeated
//! runs on unchanged input serialize byte-identically.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::finding::{Finding, PathStep};
use crate::domain::graph::{FlowGraph, NodeId};
use crate::domain::taint::TaintPath;

pub fn report(graph: &FlowGraph, paths: &[TaintPath]) -> Vec<Finding> {
    let mut seen: HashSet<(String, Vec<NodeId>)> = HashSet::new();
    let mut findings = Vec::new();

    for path in paths {
        if !seen.insert((path.category.clone(), path.nodes.clone())) {
            continue;
        }

        let source = graph.node(path.source);
        let sink = graph.node(path.sink);
        let steps: Vec<PathStep> = path
            .nodes
            .iter()
            .map(|&id| {
                let node = graph.node(id);
                PathStep {
                    kind: node.kind,
                    location: node.location.clone(),
                }
            })
            .collect();
        let unresolved_calls_on_path = path
            .nodes
            .iter()
            .any(|&id| graph.node(id).unresolved);

        findings.push(Finding {
            id: format!(
                "{}/{}:{}->{}",
                path.rule_id, path.category, source.location, sink.location
            ),
            rule_id: path.rule_id.clone(),
            category: path.category.clone(),
            source_location: source.location.clone(),
            sink_location: sink.location.clone(),
            path: steps,
            unresolved_calls_on_path,
        });
    }

    findings.sort_by(|a, b| {
        (&a.source_location, &a.sink_location, &a.category)
            .cmp(&(&b.source_location, &b.sink_location, &b.category))
    });

    debug!(
        candidate_count = paths.len(),
        finding_count = findings.len(),
        "Reported findings"
    );
    findings
}
