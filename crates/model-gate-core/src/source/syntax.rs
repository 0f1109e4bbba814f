// crates/model-gate-core/src/source/syntax.rs
// ============================================================================
// Module: Model Gate Source Syntax Tree
// Description: Closed tagged-variant syntax tree for interpreted model source.
// Purpose: Give the scanners an exhaustively matchable view of the source.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! The tree keeps exactly the node kinds the checks inspect: imports, type and
//! function definitions, expression statements, names, attribute access,
//! calls, and subscripts. Every other construct is kept as a generic
//! statement or group so its children are still walked. Each node carries the
//! line it starts on.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Source that cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at line {line}: {message}")]
pub struct SourceSyntaxError {
    /// One-based line of the error.
    pub line: usize,
    /// Parser message.
    pub message: String,
}

impl SourceSyntaxError {
    /// Creates a syntax error.
    #[must_use]
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Tree
// ============================================================================

/// Parsed module: the top-level statement list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    /// Top-level statements.
    pub body: Vec<Stmt>,
}

/// One imported module reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedModule {
    /// Dotted module name as written.
    pub name: String,
    /// Line of the reference.
    pub line: usize,
}

/// Statement nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `import a.b, c`
    Import {
        /// Imported modules.
        modules: Vec<ImportedModule>,
        /// Statement line.
        line: usize,
    },
    /// `from a.b import x` (relative imports carry a non-zero `level`).
    ImportFrom {
        /// Source module, absent for `from . import x`.
        module: Option<String>,
        /// Number of leading dots.
        level: usize,
        /// Imported member names.
        names: Vec<String>,
        /// Statement line.
        line: usize,
    },
    /// Type definition.
    ClassDef {
        /// Type name.
        name: String,
        /// Base and keyword expressions plus decorators.
        exprs: Vec<Expr>,
        /// Class body.
        body: Vec<Stmt>,
        /// Statement line.
        line: usize,
    },
    /// Function definition.
    FunctionDef {
        /// Function name.
        name: String,
        /// Positional parameter names, in order.
        params: Vec<String>,
        /// Defaults, annotations, and decorators.
        exprs: Vec<Expr>,
        /// Function body.
        body: Vec<Stmt>,
        /// Statement line.
        line: usize,
    },
    /// A statement consisting of a single expression.
    Expr {
        /// The expression.
        value: Expr,
        /// Statement line.
        line: usize,
    },
    /// Any other statement; its expressions and nested block are kept.
    Other {
        /// Expressions appearing in the statement.
        exprs: Vec<Expr>,
        /// Nested block, if the statement has one.
        body: Vec<Stmt>,
        /// Statement line.
        line: usize,
    },
}

impl Stmt {
    /// Returns the statement's line.
    #[must_use]
    pub const fn line(&self) -> usize {
        match self {
            Self::Import {
                line, ..
            }
            | Self::ImportFrom {
                line, ..
            }
            | Self::ClassDef {
                line, ..
            }
            | Self::FunctionDef {
                line, ..
            }
            | Self::Expr {
                line, ..
            }
            | Self::Other {
                line, ..
            } => *line,
        }
    }
}

/// Expression nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Bare identifier.
    Name {
        /// Identifier text.
        id: String,
        /// Line.
        line: usize,
    },
    /// `value.attr`
    Attribute {
        /// Receiver.
        value: Box<Expr>,
        /// Attribute name.
        attr: String,
        /// Line of the receiver start.
        line: usize,
    },
    /// `func(args)`
    Call {
        /// Callee.
        func: Box<Expr>,
        /// Argument expressions.
        args: Vec<Expr>,
        /// Line of the callee start.
        line: usize,
    },
    /// `value[index]`
    Subscript {
        /// Subscripted value.
        value: Box<Expr>,
        /// Index expressions.
        index: Vec<Expr>,
        /// Line of the value start.
        line: usize,
    },
    /// Literal without inspected structure.
    Literal {
        /// Line.
        line: usize,
    },
    /// Composite expression (operators, brackets, lambdas, interpolations).
    Group {
        /// Child expressions.
        items: Vec<Expr>,
        /// Line.
        line: usize,
    },
}

impl Expr {
    /// Returns the expression's line.
    #[must_use]
    pub const fn line(&self) -> usize {
        match self {
            Self::Name {
                line, ..
            }
            | Self::Attribute {
                line, ..
            }
            | Self::Call {
                line, ..
            }
            | Self::Subscript {
                line, ..
            }
            | Self::Literal {
                line,
            }
            | Self::Group {
                line, ..
            } => *line,
        }
    }
}

// ============================================================================
// SECTION: Walking
// ============================================================================

/// Borrowed reference to any tree node.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    /// Statement node.
    Stmt(&'a Stmt),
    /// Expression node.
    Expr(&'a Expr),
}

/// Visits every statement and expression in `statements`, parents first.
///
/// Uses an explicit work list, so tree depth never grows the call stack.
pub fn walk<'a>(statements: &'a [Stmt], visit: &mut impl FnMut(Node<'a>)) {
    let mut pending: Vec<Node<'a>> = statements.iter().rev().map(Node::Stmt).collect();
    while let Some(node) = pending.pop() {
        visit(node);
        match node {
            Node::Stmt(statement) => push_statement_children(statement, &mut pending),
            Node::Expr(expr) => push_expr_children(expr, &mut pending),
        }
    }
}

/// Queues the children of `statement` so they pop in source order.
fn push_statement_children<'a>(statement: &'a Stmt, pending: &mut Vec<Node<'a>>) {
    match statement {
        Stmt::Import {
            ..
        }
        | Stmt::ImportFrom {
            ..
        } => {}
        Stmt::ClassDef {
            exprs,
            body,
            ..
        }
        | Stmt::FunctionDef {
            exprs,
            body,
            ..
        }
        | Stmt::Other {
            exprs,
            body,
            ..
        } => {
            pending.extend(body.iter().rev().map(Node::Stmt));
            pending.extend(exprs.iter().rev().map(Node::Expr));
        }
        Stmt::Expr {
            value, ..
        } => pending.push(Node::Expr(value)),
    }
}

/// Queues the children of `expr` so they pop in source order.
fn push_expr_children<'a>(expr: &'a Expr, pending: &mut Vec<Node<'a>>) {
    match expr {
        Expr::Name {
            ..
        }
        | Expr::Literal {
            ..
        } => {}
        Expr::Attribute {
            value, ..
        } => pending.push(Node::Expr(value)),
        Expr::Call {
            func,
            args,
            ..
        } => {
            pending.extend(args.iter().rev().map(Node::Expr));
            pending.push(Node::Expr(func));
        }
        Expr::Subscript {
            value,
            index,
            ..
        } => {
            pending.extend(index.iter().rev().map(Node::Expr));
            pending.push(Node::Expr(value));
        }
        Expr::Group {
            items, ..
        } => pending.extend(items.iter().rev().map(Node::Expr)),
    }
}
