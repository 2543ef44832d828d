//! Taint propagation engine
//!
//! Worklist fixpoint over the flow graph, one pass per category. Label sets
//! only grow, sanitizers stop their own category at the node, and every
//! edge kind carries taint. Termination is guaranteed by monotonicity; the
//! iteration and wall-clock guards exist to bound pathological inputs, not
//! to paper over non-termination.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::domain::graph::{FlowGraph, NodeId};
use crate::domain::rule::RuleRole;
use crate::domain::taint::{TaintLabel, TaintPath, TaintStatus};
use crate::infrastructure::catalog::Catalog;

/// Guard tripped; the unit group's analysis is abandoned, other groups are
/// unaffected.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("fixpoint did not settle within {limit} iterations")]
    IterationLimit { limit: usize },
    #[error("analysis exceeded the {budget_ms}ms time budget")]
    TimeBudget { budget_ms: u64 },
}

/// How often the wall clock is consulted, in worklist pops.
const CLOCK_CHECK_INTERVAL: usize = 1024;

#[derive(Debug, Default)]
struct CategoryState {
    /// Source node ids carried by each node, by arena index
    labels: Vec<HashSet<NodeId>>,
    /// One predecessor per node, first writer wins
    predecessor: Vec<Option<NodeId>>,
    sanitized: HashSet<NodeId>,
    /// Nodes examined at least once during the pass
    touched: HashSet<NodeId>,
}

/// Fixpoint result: candidate paths plus per-category state for status
/// queries.
#[derive(Debug)]
pub struct Propagation {
    pub paths: Vec<TaintPath>,
    pub iterations: usize,
    states: HashMap<String, CategoryState>,
}

impl Propagation {
    /// State-machine view of one node for one category.
    pub fn status(&self, node: NodeId, category: &str) -> TaintStatus {
        let Some(state) = self.states.get(category) else {
            return TaintStatus::Unvisited;
        };
        if state.sanitized.contains(&node) {
            TaintStatus::Sanitized
        } else if state
            .labels
            .get(node.index())
            .is_some_and(|l| !l.is_empty())
        {
            TaintStatus::Tainted
        } else if state.touched.contains(&node) {
            TaintStatus::VisitedClean
        } else {
            TaintStatus::Unvisited
        }
    }

    /// Every label a node carries across categories, sorted for stable
    /// output.
    pub fn labels(&self, node: NodeId) -> Vec<TaintLabel> {
        let mut labels: Vec<TaintLabel> = self
            .states
            .iter()
            .flat_map(|(category, state)| {
                state
                    .labels
                    .get(node.index())
                    .into_iter()
                    .flatten()
                    .map(|&source| TaintLabel {
                        category: category.clone(),
                        source,
                    })
            })
            .collect();
        labels.sort();
        labels
    }
}

/// Runs the fixpoint for every category in the catalog.
pub struct PropagationEngine<'g, 'c> {
    graph: &'g FlowGraph,
    catalog: &'c Catalog,
}

impl<'g, 'c> PropagationEngine<'g, 'c> {
    pub fn new(graph: &'g FlowGraph, catalog: &'c Catalog) -> Self {
        Self { graph, catalog }
    }

    pub fn run(&self, config: &EngineConfig) -> Result<Propagation, EngineError> {
        let started = Instant::now();
        let mut result = Propagation {
            paths: Vec::new(),
            iterations: 0,
            states: HashMap::new(),
        };

        let categories = self.catalog.categories().to_vec();
        let limit = config
            .max_iterations
            .unwrap_or_else(|| self.default_iteration_limit(&categories));

        for category in &categories {
            let state = self.run_category(
                category,
                limit,
                started,
                config,
                &mut result.iterations,
                &mut result.paths,
            )?;
            result.states.insert(category.clone(), state);
        }

        debug!(
            category_count = categories.len(),
            iterations = result.iterations,
            path_count = result.paths.len(),
            "Propagation reached fixpoint"
        );
        Ok(result)
    }

    /// Worklist pops are bounded by total label growth, which source count
    /// drives, not node count alone.
    fn default_iteration_limit(&self, categories: &[String]) -> usize {
        let sources = self
            .graph
            .nodes()
            .iter()
            .map(|node| {
                self.catalog
                    .classify(node)
                    .iter()
                    .filter(|r| r.role == RuleRole::Source)
                    .count()
            })
            .sum::<usize>();
        64 + 8 * self.graph.len() * categories.len().max(1) * (1 + sources)
    }

    fn run_category(
        &self,
        category: &str,
        limit: usize,
        started: Instant,
        config: &EngineConfig,
        iterations: &mut usize,
        paths: &mut Vec<TaintPath>,
    ) -> Result<CategoryState, EngineError> {
        let mut state = CategoryState {
            labels: vec![HashSet::new(); self.graph.len()],
            predecessor: vec![None; self.graph.len()],
            sanitized: HashSet::new(),
            touched: HashSet::new(),
        };

        // classification pass: sources seed the worklist, sinks and
        // sanitizers are looked up once
        let mut sinks: HashMap<NodeId, String> = HashMap::new();
        let mut sanitizers: HashSet<NodeId> = HashSet::new();
        let mut worklist: VecDeque<NodeId> = VecDeque::new();
        let mut sinks_reported: HashSet<NodeId> = HashSet::new();

        for node in self.graph.nodes() {
            if let Some(rule) = self.catalog.classify_role(node, RuleRole::Sink, category) {
                sinks.insert(node.id, rule.id.clone());
            }
            if self
                .catalog
                .classify_role(node, RuleRole::Sanitizer, category)
                .is_some()
            {
                sanitizers.insert(node.id);
            }
        }
        for node in self.graph.nodes() {
            if self
                .catalog
                .classify_role(node, RuleRole::Source, category)
                .is_none()
            {
                continue;
            }
            // a sanitizer never doubles as a source of the same category
            if sanitizers.contains(&node.id) {
                state.sanitized.insert(node.id);
                continue;
            }
            state.labels[node.id.index()].insert(node.id);
            state.touched.insert(node.id);
            worklist.push_back(node.id);
            if let Some(rule_id) = sinks.get(&node.id) {
                record_path(&state, node.id, category, rule_id, &mut sinks_reported, paths);
            }
        }

        while let Some(current) = worklist.pop_front() {
            *iterations += 1;
            if *iterations > limit {
                return Err(EngineError::IterationLimit { limit });
            }
            if *iterations % CLOCK_CHECK_INTERVAL == 0 {
                if let Some(budget_ms) = config.time_budget_ms {
                    if started.elapsed().as_millis() as u64 > budget_ms {
                        return Err(EngineError::TimeBudget { budget_ms });
                    }
                }
            }

            let current_labels = state.labels[current.index()].clone();
            for &(next, kind) in self.graph.successors(current) {
                state.touched.insert(next);
                if sanitizers.contains(&next) {
                    state.sanitized.insert(next);
                    trace!(node = %next, category, "Taint stopped at sanitizer");
                    continue;
                }

                let known = &state.labels[next.index()];
                let first_taint = known.is_empty();
                let fresh: Vec<NodeId> = current_labels
                    .iter()
                    .filter(|l| !known.contains(l))
                    .copied()
                    .collect();
                if fresh.is_empty() {
                    continue;
                }

                // only the first taint writes the predecessor: the chain
                // then walks strictly backwards in taint order and cannot
                // cycle
                if first_taint {
                    state.predecessor[next.index()] = Some(current);
                }
                state.labels[next.index()].extend(fresh);
                trace!(from = %current, to = %next, edge = ?kind, category, "Propagated taint");
                worklist.push_back(next);

                if let Some(rule_id) = sinks.get(&next) {
                    record_path(&state, next, category, rule_id, &mut sinks_reported, paths);
                }
            }
        }

        Ok(state)
    }
}

/// Reconstructs the predecessor chain from a tainted sink back to the
/// source that first reached it. Each sink reports once per category; later
/// label arrivals cannot change the frozen predecessor chain.
fn record_path(
    state: &CategoryState,
    sink: NodeId,
    category: &str,
    rule_id: &str,
    sinks_reported: &mut HashSet<NodeId>,
    paths: &mut Vec<TaintPath>,
) {
    if !sinks_reported.insert(sink) {
        return;
    }

    let mut nodes = vec![sink];
    let mut current = sink;
    while let Some(previous) = state.predecessor[current.index()] {
        nodes.push(previous);
        current = previous;
    }
    nodes.reverse();

    paths.push(TaintPath {
        category: category.to_string(),
        rule_id: rule_id.to_string(),
        source: nodes[0],
        sink,
        nodes,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::{Edge, EdgeKind, GraphNode, Location, NodeKind};
    use crate::domain::rule::{Rule, RuleSet};

    fn rule(id: &str, role: RuleRole, matcher: &str) -> Rule {
        Rule {
            id: id.into(),
            role,
            category: "test-injection".into(),
            matcher: matcher.into(),
            description: None,
        }
    }

    fn named(id: u32, name: &str) -> GraphNode {
        GraphNode::new(
            NodeId(id),
            NodeKind::Identifier,
            Location::new("g.js", id + 1, 0),
        )
        .with_qualified_name(name)
    }

    fn chain_edges(ids: &[u32]) -> Vec<Edge> {
        ids.windows(2)
            .map(|w| Edge {
                from: NodeId(w[0]),
                to: NodeId(w[1]),
                kind: EdgeKind::DataFlowsInto,
            })
            .collect()
    }

    #[test]
    fn taint_reaches_a_sink_along_a_chain() {
        let graph = FlowGraph::from_parts(
            vec![named(0, "input"), named(1, "mid"), named(2, "danger")],
            chain_edges(&[0, 1, 2]),
        )
        .unwrap();
        let catalog = Catalog::compile(&RuleSet::new(vec![
            rule("src", RuleRole::Source, "input"),
            rule("snk", RuleRole::Sink, "danger"),
        ]))
        .unwrap();

        let result = PropagationEngine::new(&graph, &catalog)
            .run(&EngineConfig::default())
            .unwrap();
        assert_eq!(result.paths.len(), 1);
        assert_eq!(
            result.paths[0].nodes,
            vec![NodeId(0), NodeId(1), NodeId(2)]
        );
        assert_eq!(result.status(NodeId(1), "test-injection"), TaintStatus::Tainted);
    }

    #[test]
    fn sanitizer_stops_its_own_category() {
        let graph = FlowGraph::from_parts(
            vec![named(0, "input"), named(1, "clean"), named(2, "danger")],
            chain_edges(&[0, 1, 2]),
        )
        .unwrap();
        let catalog = Catalog::compile(&RuleSet::new(vec![
            rule("src", RuleRole::Source, "input"),
            rule("san", RuleRole::Sanitizer, "clean"),
            rule("snk", RuleRole::Sink, "danger"),
        ]))
        .unwrap();

        let result = PropagationEngine::new(&graph, &catalog)
            .run(&EngineConfig::default())
            .unwrap();
        assert!(result.paths.is_empty());
        assert_eq!(
            result.status(NodeId(1), "test-injection"),
            TaintStatus::Sanitized
        );
        assert_eq!(
            result.status(NodeId(2), "test-injection"),
            TaintStatus::Unvisited
        );
    }

    #[test]
    fn sanitizer_of_another_category_does_not_block() {
        let graph = FlowGraph::from_parts(
            vec![named(0, "input"), named(1, "clean"), named(2, "danger")],
            chain_edges(&[0, 1, 2]),
        )
        .unwrap();
        let catalog = Catalog::compile(&RuleSet::new(vec![
            rule("src", RuleRole::Source, "input"),
            rule("snk", RuleRole::Sink, "danger"),
            Rule {
                id: "other-san".into(),
                role: RuleRole::Sanitizer,
                category: "other-injection".into(),
                matcher: "clean".into(),
                description: None,
            },
        ]))
        .unwrap();

        let result = PropagationEngine::new(&graph, &catalog)
            .run(&EngineConfig::default())
            .unwrap();
        assert_eq!(result.paths.len(), 1);
    }

    #[test]
    fn cycles_terminate_without_duplicate_paths() {
        // 0 -> 1 -> 2 -> 1 (cycle), 2 -> 3
        let graph = FlowGraph::from_parts(
            vec![
                named(0, "input"),
                named(1, "a"),
                named(2, "b"),
                named(3, "danger"),
            ],
            vec![
                Edge {
                    from: NodeId(0),
                    to: NodeId(1),
                    kind: EdgeKind::DataFlowsInto,
                },
                Edge {
                    from: NodeId(1),
                    to: NodeId(2),
                    kind: EdgeKind::DataFlowsInto,
                },
                Edge {
                    from: NodeId(2),
                    to: NodeId(1),
                    kind: EdgeKind::DataFlowsInto,
                },
                Edge {
                    from: NodeId(2),
                    to: NodeId(3),
                    kind: EdgeKind::DataFlowsInto,
                },
            ],
        )
        .unwrap();
        let catalog = Catalog::compile(&RuleSet::new(vec![
            rule("src", RuleRole::Source, "input"),
            rule("snk", RuleRole::Sink, "danger"),
        ]))
        .unwrap();

        let result = PropagationEngine::new(&graph, &catalog)
            .run(&EngineConfig::default())
            .unwrap();
        assert_eq!(result.paths.len(), 1);
    }

    #[test]
    fn iteration_guard_trips_when_configured_low() {
        let graph = FlowGraph::from_parts(
            vec![named(0, "input"), named(1, "a"), named(2, "danger")],
            chain_edges(&[0, 1, 2]),
        )
        .unwrap();
        let catalog = Catalog::compile(&RuleSet::new(vec![
            rule("src", RuleRole::Source, "input"),
            rule("snk", RuleRole::Sink, "danger"),
        ]))
        .unwrap();

        let config = EngineConfig {
            max_iterations: Some(1),
            ..EngineConfig::default()
        };
        let err = PropagationEngine::new(&graph, &catalog)
            .run(&config)
            .unwrap_err();
        assert!(matches!(err, EngineError::IterationLimit { limit: 1 }));
    }

    #[test]
    fn two_sources_co_propagate_into_one_node() {
        // 0 -> 2 <- 1, 2 -> 3
        let graph = FlowGraph::from_parts(
            vec![
                named(0, "input"),
                named(1, "input"),
                named(2, "join"),
                named(3, "danger"),
            ],
            vec![
                Edge {
                    from: NodeId(0),
                    to: NodeId(2),
                    kind: EdgeKind::DataFlowsInto,
                },
                Edge {
                    from: NodeId(1),
                    to: NodeId(2),
                    kind: EdgeKind::DataFlowsInto,
                },
                Edge {
                    from: NodeId(2),
                    to: NodeId(3),
                    kind: EdgeKind::DataFlowsInto,
                },
            ],
        )
        .unwrap();
        let catalog = Catalog::compile(&RuleSet::new(vec![
            rule("src", RuleRole::Source, "input"),
            rule("snk", RuleRole::Sink, "danger"),
        ]))
        .unwrap();

        let result = PropagationEngine::new(&graph, &catalog)
            .run(&EngineConfig::default())
            .unwrap();
        // one deterministic path per sink, even with two contributing sources
        assert_eq!(result.paths.len(), 1);
        assert_eq!(result.paths[0].nodes[0], NodeId(0));

        // both source labels co-propagated into the join
        let labels = result.labels(NodeId(2));
        assert_eq!(labels.len(), 2);
        assert!(labels.iter().any(|l| l.source == NodeId(0)));
        assert!(labels.iter().any(|l| l.source == NodeId(1)));
    }
}
