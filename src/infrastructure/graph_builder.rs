//! Program graph builder
//!
//! Lowers parsed units into the data-flow graph consumed by the propagation
//! engine. Scope handling is lexical. Call targets are resolved first
//! against function bindings in scope, then by simple name against every
//! function declared anywhere in the built group (which is what links
//! call-site arguments to callee parameters across unit boundaries), then
//! against the catalog; anything left is flagged unresolved and acts as an
//! opaque passthrough.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::ast::{Expr, FunctionDecl, Param, ProgramUnit, Span, Stmt};
use crate::domain::graph::{EdgeKind, FlowGraph, GraphError, GraphNode, Location, NodeId, NodeKind};
use crate::infrastructure::catalog::Catalog;

/// Structural build failure. Partial programs (unresolved call targets) are
/// valid input and never raise this.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("malformed program graph: {0}")]
    MalformedInput(#[from] GraphError),
}

/// A function the builder knows about: declared, or bound to a name via a
/// closure assignment.
#[derive(Debug, Default)]
struct FunctionInfo {
    params: Vec<NodeId>,
    /// Nodes of every `return` expression in the body
    returns: Vec<NodeId>,
}

/// How a call site's target was captured while walking.
#[derive(Debug)]
enum CallTarget {
    /// Bound to a function in lexical scope at the call site
    Scoped(usize),
    /// To be resolved by simple name against the whole unit group
    Named(String),
    /// No statically known name at all
    Dynamic,
}

#[derive(Debug)]
struct PendingCall {
    node: NodeId,
    /// One entry per argument; closures contribute no data node
    args: Vec<Option<NodeId>>,
    target: CallTarget,
}

#[derive(Debug, Default)]
struct Scope {
    values: HashMap<String, NodeId>,
    functions: HashMap<String, usize>,
}

/// Builds one [`FlowGraph`] from a group of program units.
pub struct GraphBuilder<'c> {
    catalog: &'c Catalog,
    interprocedural: bool,
    graph: FlowGraph,
    functions: Vec<FunctionInfo>,
    /// Cross-unit function index by simple name; first declaration wins
    functions_by_name: HashMap<String, usize>,
    scopes: Vec<Scope>,
    function_stack: Vec<usize>,
    pending_calls: Vec<PendingCall>,
    file: String,
}

impl<'c> GraphBuilder<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            interprocedural: true,
            graph: FlowGraph::new(),
            functions: Vec::new(),
            functions_by_name: HashMap::new(),
            scopes: Vec::new(),
            function_stack: Vec::new(),
            pending_calls: Vec::new(),
            file: String::new(),
        }
    }

    /// Disable argument-to-parameter binding; every call becomes a catalog
    /// lookup or an unresolved passthrough.
    pub fn interprocedural(mut self, enabled: bool) -> Self {
        self.interprocedural = enabled;
        self
    }

    pub fn build(mut self, units: &[ProgramUnit]) -> Result<FlowGraph, BuildError> {
        for unit in units {
            self.file = unit.file.clone();
            self.scopes.push(Scope::default());
            self.hoist_functions(&unit.body);
            for stmt in &unit.body {
                self.walk_stmt(stmt)?;
            }
            self.scopes.pop();
        }
        self.link_calls()?;

        let unresolved = self.graph.nodes().iter().filter(|n| n.unresolved).count();
        debug!(
            node_count = self.graph.len(),
            edge_count = self.graph.edges().len(),
            function_count = self.functions.len(),
            unresolved_calls = unresolved,
            "Built flow graph"
        );
        Ok(self.graph)
    }

    fn add_node(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.graph.add_node(GraphNode::new(
            NodeId(0),
            kind,
            Location::new(self.file.clone(), span.line, span.column),
        ))
    }

    fn add_named_node(&mut self, kind: NodeKind, span: Span, name: String) -> NodeId {
        let location = Location::new(self.file.clone(), span.line, span.column);
        self.graph
            .add_node(GraphNode::new(NodeId(0), kind, location).with_qualified_name(name))
    }

    fn edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) -> Result<(), BuildError> {
        self.graph.add_edge(from, to, kind)?;
        Ok(())
    }

    fn current_scope(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack is never empty")
    }

    fn lookup_value(&self, name: &str) -> Option<NodeId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.values.get(name).copied())
    }

    fn lookup_function(&self, name: &str) -> Option<usize> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.functions.get(name).copied())
    }

    /// Named declarations are callable before their statement within the
    /// same list.
    fn hoist_functions(&mut self, body: &[Stmt]) {
        for stmt in body {
            if let Stmt::Function(decl) = stmt {
                self.register_function(Some(decl.name.clone()));
            }
        }
    }

    fn register_function(&mut self, name: Option<String>) -> usize {
        let index = self.functions.len();
        self.functions.push(FunctionInfo::default());
        if let Some(name) = name {
            self.current_scope().functions.insert(name.clone(), index);
            self.functions_by_name.entry(name).or_insert(index);
        }
        index
    }

    /// Walks a function body into the pre-registered slot: parameter nodes,
    /// a fresh scope, and return-expression collection.
    fn fill_function(
        &mut self,
        index: usize,
        params: &[Param],
        body: &[Stmt],
    ) -> Result<(), BuildError> {
        self.scopes.push(Scope::default());
        for param in params {
            let node = self.add_named_node(NodeKind::Parameter, param.span, param.name.clone());
            self.functions[index].params.push(node);
            self.current_scope().values.insert(param.name.clone(), node);
        }
        self.function_stack.push(index);
        self.hoist_functions(body);
        for stmt in body {
            self.walk_stmt(stmt)?;
        }
        self.function_stack.pop();
        self.scopes.pop();
        Ok(())
    }

    fn walk_stmt(&mut self, stmt: &Stmt) -> Result<(), BuildError> {
        match stmt {
            Stmt::Let { name, value, span } => {
                if let Expr::Closure { params, body, .. } = value {
                    let index = self.register_function(Some(name.clone()));
                    self.fill_function(index, params, body)?;
                    return Ok(());
                }
                let value_node = self.walk_expr(value)?;
                let assign = self.add_named_node(NodeKind::Assignment, *span, name.clone());
                if let Some(value_node) = value_node {
                    self.edge(value_node, assign, EdgeKind::DataFlowsInto)?;
                }
                self.current_scope().values.insert(name.clone(), assign);
                Ok(())
            }
            Stmt::Assign {
                target,
                value,
                span,
            } => self.walk_assign(target, value, *span),
            Stmt::Expr { expr } => {
                self.walk_expr(expr)?;
                Ok(())
            }
            Stmt::Function(decl) => self.walk_function_decl(decl),
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    if let Some(node) = self.walk_expr(value)? {
                        if let Some(&index) = self.function_stack.last() {
                            self.functions[index].returns.push(node);
                        }
                    }
                }
                Ok(())
            }
            Stmt::If {
                condition,
                then_body,
                else_body,
                ..
            } => {
                self.walk_expr(condition)?;
                for body in [then_body, else_body] {
                    self.scopes.push(Scope::default());
                    self.hoist_functions(body);
                    for stmt in body {
                        self.walk_stmt(stmt)?;
                    }
                    self.scopes.pop();
                }
                Ok(())
            }
        }
    }

    fn walk_function_decl(&mut self, decl: &FunctionDecl) -> Result<(), BuildError> {
        // hoisted slot, or a fresh one when the declaration sits in a
        // non-hoisted position
        let index = match self.lookup_function(&decl.name) {
            Some(index) => index,
            None => self.register_function(Some(decl.name.clone())),
        };
        self.fill_function(index, &decl.params, &decl.body)
    }

    fn walk_assign(&mut self, target: &Expr, value: &Expr, span: Span) -> Result<(), BuildError> {
        // `handle.method = (..) => {..}` binds a callable, not a value
        if let Expr::Closure { params, body, .. } = value {
            let name = match target {
                Expr::Identifier { name, .. } => Some(name.clone()),
                Expr::Member { property, .. } => Some(property.clone()),
                _ => None,
            };
            let index = self.register_function(name);
            self.fill_function(index, params, body)?;
            return Ok(());
        }

        let value_node = self.walk_expr(value)?;
        match target {
            Expr::Identifier { name, .. } => {
                let assign = self.add_named_node(NodeKind::Assignment, span, name.clone());
                if let Some(value_node) = value_node {
                    self.edge(value_node, assign, EdgeKind::DataFlowsInto)?;
                }
                self.rebind(name, assign);
            }
            _ => {
                if let (Some(value_node), Some(target_node)) =
                    (value_node, self.walk_expr(target)?)
                {
                    self.edge(value_node, target_node, EdgeKind::DataFlowsInto)?;
                }
            }
        }
        Ok(())
    }

    /// Re-assignment updates the binding where it was introduced; unknown
    /// names bind in the current scope.
    fn rebind(&mut self, name: &str, node: NodeId) {
        for scope in self.scopes.iter_mut().rev() {
            if scope.values.contains_key(name) {
                scope.values.insert(name.to_string(), node);
                return;
            }
        }
        self.current_scope().values.insert(name.to_string(), node);
    }

    fn walk_expr(&mut self, expr: &Expr) -> Result<Option<NodeId>, BuildError> {
        match expr {
            Expr::Literal { value, span } => {
                let location = Location::new(self.file.clone(), span.line, span.column);
                let node = self.graph.add_node(
                    GraphNode::new(NodeId(0), NodeKind::Literal, location)
                        .with_static_value(value.clone()),
                );
                Ok(Some(node))
            }
            Expr::Identifier { name, span } => {
                let node = self.add_named_node(NodeKind::Identifier, *span, name.clone());
                if let Some(binding) = self.lookup_value(name) {
                    self.edge(binding, node, EdgeKind::DataFlowsInto)?;
                }
                Ok(Some(node))
            }
            Expr::Member { object, span, .. } => {
                let object_node = self.walk_expr(object)?;
                let name = expr
                    .qualified_name()
                    .expect("member expressions always have a name");
                let node = self.add_named_node(NodeKind::MemberAccess, *span, name);
                if let Some(object_node) = object_node {
                    self.edge(object_node, node, EdgeKind::PropertyOf)?;
                }
                Ok(Some(node))
            }
            Expr::Template { parts, span } => {
                let node = self.add_node(NodeKind::Concatenation, *span);
                for part in parts {
                    if let Some(part_node) = self.walk_expr(part)? {
                        self.edge(part_node, node, EdgeKind::DataFlowsInto)?;
                    }
                }
                Ok(Some(node))
            }
            Expr::Binary { left, right, span } => {
                let node = self.add_node(NodeKind::Concatenation, *span);
                for operand in [left, right] {
                    if let Some(operand_node) = self.walk_expr(operand)? {
                        self.edge(operand_node, node, EdgeKind::DataFlowsInto)?;
                    }
                }
                Ok(Some(node))
            }
            Expr::Object { properties, span } => {
                let location = Location::new(self.file.clone(), span.line, span.column);
                let keys = properties.iter().map(|p| p.key.clone()).collect();
                let node = self.graph.add_node(
                    GraphNode::new(NodeId(0), NodeKind::Object, location).with_object_keys(keys),
                );
                for property in properties {
                    if let Some(value_node) = self.walk_expr(&property.value)? {
                        self.edge(value_node, node, EdgeKind::DataFlowsInto)?;
                    }
                }
                Ok(Some(node))
            }
            Expr::Closure { params, body, .. } => {
                let index = self.register_function(None);
                self.fill_function(index, params, body)?;
                Ok(None)
            }
            Expr::Call { callee, args, span } => self.walk_call(callee, args, *span),
        }
    }

    fn walk_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        span: Span,
    ) -> Result<Option<NodeId>, BuildError> {
        // Capture lexical resolution before the callee scope information is
        // gone; the remaining targets resolve after all units are walked.
        let (target, callee_node) = match callee {
            Expr::Identifier { name, .. } => match self.lookup_function(name) {
                Some(index) => (CallTarget::Scoped(index), None),
                None => (CallTarget::Named(name.clone()), None),
            },
            Expr::Member { property, .. } => {
                let node = self.walk_expr(callee)?;
                (CallTarget::Named(property.clone()), node)
            }
            other => {
                let node = self.walk_expr(other)?;
                (CallTarget::Dynamic, node)
            }
        };

        let call = match callee.qualified_name() {
            Some(name) => self.add_named_node(NodeKind::Call, span, name),
            None => self.add_node(NodeKind::Call, span),
        };
        // receiver data dependency: a tainted handle taints what it yields
        if let Some(callee_node) = callee_node {
            self.edge(callee_node, call, EdgeKind::DataFlowsInto)?;
        }

        let mut arg_nodes = Vec::with_capacity(args.len());
        for arg in args {
            let arg_node = self.walk_expr(arg)?;
            if let Some(arg_node) = arg_node {
                self.edge(arg_node, call, EdgeKind::ArgumentOf)?;
            }
            arg_nodes.push(arg_node);
        }

        self.pending_calls.push(PendingCall {
            node: call,
            args: arg_nodes,
            target,
        });
        Ok(Some(call))
    }

    /// Resolves every pending call once the whole group is walked: bind
    /// arguments to parameters and returns to call sites, or fall back to
    /// the catalog, or flag the call unresolved.
    fn link_calls(&mut self) -> Result<(), BuildError> {
        let pending = std::mem::take(&mut self.pending_calls);
        for call in pending {
            let index = if self.interprocedural {
                match &call.target {
                    CallTarget::Scoped(index) => Some(*index),
                    CallTarget::Named(name) => self.functions_by_name.get(name).copied(),
                    CallTarget::Dynamic => None,
                }
            } else {
                None
            };

            match index {
                Some(index) => {
                    let params = self.functions[index].params.clone();
                    let returns = self.functions[index].returns.clone();
                    for (arg, param) in call.args.iter().zip(params) {
                        if let Some(arg) = arg {
                            self.edge(*arg, param, EdgeKind::DataFlowsInto)?;
                        }
                    }
                    for ret in returns {
                        self.edge(ret, call.node, EdgeKind::Returns)?;
                    }
                }
                None => {
                    if !self.catalog.knows(self.graph.node(call.node)) {
                        self.graph.mark_unresolved(call.node);
                    }
                }
            }
        }
        Ok(())
    }
}
