//! Data-flow graph
//!
//! Arena-indexed nodes and directed edges produced by the builder and
//! consumed read-only by the propagation engine. Graphs may also be
//! assembled from raw parts, in which case edge endpoints are validated.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a node in its [`FlowGraph`] arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// What a graph node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Literal,
    Identifier,
    Call,
    MemberAccess,
    Concatenation,
    Parameter,
    Assignment,
    Object,
}

/// Where a node sits in the analyzed sources.
///
/// Ordering is (file, line, column), which is also the reporter's ordering
/// key.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A node in the data-flow graph. Immutable once the graph is built.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub location: Location,
    /// Dotted name used for catalog matching (`req.query.folder`; for calls,
    /// the callee chain)
    pub qualified_name: Option<String>,
    /// Literal value when statically known
    pub static_value: Option<String>,
    /// Keys of an object literal, for object-key matchers
    pub object_keys: Vec<String>,
    /// Call whose target matched neither a declared function nor a catalog
    /// rule; treated as opaque passthrough
    pub unresolved: bool,
}

impl GraphNode {
    pub fn new(id: NodeId, kind: NodeKind, location: Location) -> Self {
        Self {
            id,
            kind,
            location,
            qualified_name: None,
            static_value: None,
            object_keys: Vec::new(),
            unresolved: false,
        }
    }

    pub fn with_qualified_name(mut self, name: impl Into<String>) -> Self {
        self.qualified_name = Some(name.into());
        self
    }

    pub fn with_static_value(mut self, value: impl Into<String>) -> Self {
        self.static_value = Some(value.into());
        self
    }

    pub fn with_object_keys(mut self, keys: Vec<String>) -> Self {
        self.object_keys = keys;
        self
    }
}

/// Relation between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    DataFlowsInto,
    ArgumentOf,
    Returns,
    PropertyOf,
}

/// A directed edge `from -> to`. Multiple edges may share endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
}

/// Structural graph errors. Partial graphs (unresolved calls) are valid and
/// never raise these; only impossible references do.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("edge {from} -> {to} references a node outside the graph")]
    DanglingEdge { from: NodeId, to: NodeId },
    #[error("node id {id} does not match its arena position {position}")]
    MisplacedNode { id: NodeId, position: usize },
}

/// Data-flow graph for one group of program units.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<Edge>,
    /// Successor adjacency, parallel to `nodes`
    successors: Vec<Vec<(NodeId, EdgeKind)>>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a graph from pre-built parts, validating that node ids are
    /// dense and every edge endpoint exists.
    pub fn from_parts(nodes: Vec<GraphNode>, edges: Vec<Edge>) -> Result<Self, GraphError> {
        for (position, node) in nodes.iter().enumerate() {
            if node.id.index() != position {
                return Err(GraphError::MisplacedNode {
                    id: node.id,
                    position,
                });
            }
        }
        let mut graph = Self {
            successors: vec![Vec::new(); nodes.len()],
            nodes,
            edges: Vec::with_capacity(edges.len()),
        };
        for edge in edges {
            graph.add_edge(edge.from, edge.to, edge.kind)?;
        }
        Ok(graph)
    }

    /// Append a node; the returned id is its arena position.
    pub fn add_node(&mut self, node: GraphNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let mut node = node;
        node.id = id;
        self.nodes.push(node);
        self.successors.push(Vec::new());
        id
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) -> Result<(), GraphError> {
        if from.index() >= self.nodes.len() || to.index() >= self.nodes.len() {
            return Err(GraphError::DanglingEdge { from, to });
        }
        self.edges.push(Edge { from, to, kind });
        self.successors[from.index()].push((to, kind));
        Ok(())
    }

    pub(crate) fn mark_unresolved(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.unresolved = true;
        }
    }

    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn successors(&self, id: NodeId) -> &[(NodeId, EdgeKind)] {
        &self.successors[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
