//! Input program representation
//!
//! The engine does not parse source text. A front end hands it one
//! [`ProgramUnit`] per analyzed file, already lowered to this tree:
//! statements own expressions, template strings keep their interpolated
//! parts in order, and callbacks are ordinary [`Expr::Closure`] values whose
//! parameters become plain graph nodes during building.

use serde::{Deserialize, Serialize};

/// Position inside a unit's file: 1-based line, 0-based column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A single parsed source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramUnit {
    /// Path the front end attributes locations to
    pub file: String,
    pub body: Vec<Stmt>,
}

/// Statement forms the builder understands.
///
/// Destructuring like `const { userId } = req.params` is expected to arrive
/// pre-lowered to one [`Stmt::Let`] per bound name with a member-access
/// value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "stmt", rename_all = "snake_case")]
pub enum Stmt {
    /// `let name = value`
    Let { name: String, value: Expr, span: Span },
    /// Re-assignment to an existing binding or member target
    Assign { target: Expr, value: Expr, span: Span },
    /// Bare expression statement
    Expr { expr: Expr },
    /// Named function declaration, hoisted within its unit
    Function(FunctionDecl),
    /// `return value`
    Return { value: Option<Expr>, span: Span },
    /// Both branches are walked; the condition is an ordinary expression
    If {
        condition: Expr,
        then_body: Vec<Stmt>,
        #[serde(default)]
        else_body: Vec<Stmt>,
        span: Span,
    },
}

/// A named function declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// A declared parameter, of a function or of a callback closure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub span: Span,
}

/// One `key: value` entry of an object literal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: Expr,
}

/// Expression forms the builder understands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "expr", rename_all = "snake_case")]
pub enum Expr {
    Literal {
        value: String,
        span: Span,
    },
    Identifier {
        name: String,
        span: Span,
    },
    /// `object.property`
    Member {
        object: Box<Expr>,
        property: String,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    /// Template string; literal chunks and interpolated expressions in order
    Template {
        parts: Vec<Expr>,
        span: Span,
    },
    /// Binary operator, including string concatenation
    Binary {
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    /// Object/document literal
    Object {
        properties: Vec<Property>,
        span: Span,
    },
    /// Anonymous function, arrow function, or callback
    Closure {
        params: Vec<Param>,
        body: Vec<Stmt>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal { span, .. }
            | Expr::Identifier { span, .. }
            | Expr::Member { span, .. }
            | Expr::Call { span, .. }
            | Expr::Template { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Object { span, .. }
            | Expr::Closure { span, .. } => *span,
        }
    }

    /// Dotted name of an identifier or member chain, `None` for anything
    /// whose name is not statically known (call results, literals, ...).
    pub fn qualified_name(&self) -> Option<String> {
        match self {
            Expr::Identifier { name, .. } => Some(name.clone()),
            Expr::Member {
                object, property, ..
            } => match object.qualified_name() {
                Some(base) => Some(format!("{}.{}", base, property)),
                None => Some(property.clone()),
            },
            _ => None,
        }
    }
}
