// crates/model-gate-core/src/source/scanner.rs
// ============================================================================
// Module: Model Gate Source Policy Scanner
// Description: Syntax-tree scan for blocked imports, calls, and patterns.
// Purpose: Flag every sandbox-escaping construct in interpreted model source.
// Dependencies: crate::core::policy, crate::source::{parser, syntax}
// ============================================================================

//! ## Overview
//! The scanner parses the source once and walks the tree once per category.
//! Categories never short-circuit each other and every hit within a category
//! is collected, so one run reports all violations.
//! Security posture: model source is untrusted input; nothing is evaluated.
//!
//! The file and network categories match method names regardless of the
//! receiver. A benign `.get()` on a dictionary is therefore reported.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::SourcePolicy;
use crate::source::parser::parse_module;
use crate::source::syntax::Expr;
use crate::source::syntax::Module;
use crate::source::syntax::Node;
use crate::source::syntax::SourceSyntaxError;
use crate::source::syntax::Stmt;
use crate::source::syntax::walk;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Method names treated as filesystem operations.
pub const FILE_OPERATION_ATTRS: [&str; 6] = ["write", "read", "remove", "unlink", "mkdir", "rmdir"];
/// Method names treated as network operations.
pub const NETWORK_OPERATION_ATTRS: [&str; 7] =
    ["connect", "send", "recv", "sendall", "request", "get", "post"];
/// Code-execution primitives flagged when invoked as a statement.
pub const DYNAMIC_EXECUTION_NAMES: [&str; 3] = ["exec", "eval", "compile"];
/// Reflective attributes that expose interpreter internals.
pub const REFLECTIVE_ATTRS: [&str; 4] = ["__globals__", "__builtins__", "__code__", "__import__"];
/// Dynamic import primitive, flagged even when absent from the blocked set.
const DYNAMIC_IMPORT: &str = "__import__";
/// Builtin that opens files.
const OPEN_CALL: &str = "open";

// ============================================================================
// SECTION: Violations
// ============================================================================

/// Violation category; the label is also the check name it is recorded under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ViolationCategory {
    /// Import of a blocked namespace.
    DisallowedImport,
    /// Import of a namespace outside the allow list.
    ImportNotWhitelisted,
    /// Invocation of a blocked builtin.
    DisallowedBuiltin,
    /// Filesystem call pattern.
    DisallowedFileOperation,
    /// Network call pattern.
    DisallowedNetworkOperation,
    /// Dynamic execution or reflective attribute access.
    DangerousPattern,
}

impl ViolationCategory {
    /// All categories in reporting order.
    pub const ALL: [Self; 6] = [
        Self::DisallowedImport,
        Self::ImportNotWhitelisted,
        Self::DisallowedBuiltin,
        Self::DisallowedFileOperation,
        Self::DisallowedNetworkOperation,
        Self::DangerousPattern,
    ];

    /// Returns the stable category label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DisallowedImport => "DISALLOWED_IMPORT",
            Self::ImportNotWhitelisted => "IMPORT_NOT_WHITELISTED",
            Self::DisallowedBuiltin => "DISALLOWED_BUILTIN",
            Self::DisallowedFileOperation => "DISALLOWED_FILE_OPERATION",
            Self::DisallowedNetworkOperation => "DISALLOWED_NETWORK_OPERATION",
            Self::DangerousPattern => "DANGEROUS_PATTERN",
        }
    }
}

/// One policy hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceViolation {
    /// Category of the hit.
    pub category: ViolationCategory,
    /// Line of the offending construct.
    pub line: usize,
    /// Human-readable message.
    pub message: String,
}

/// Result of a completed scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceScan {
    /// Violations ordered by category, then by tree order.
    pub violations: Vec<SourceViolation>,
}

impl SourceScan {
    /// Returns true when no violation was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns the violations of one category.
    pub fn in_category(
        &self,
        category: ViolationCategory,
    ) -> impl Iterator<Item = &SourceViolation> + '_ {
        self.violations.iter().filter(move |violation| violation.category == category)
    }

    /// Returns each category with at least one hit, with its messages joined by `"; "`.
    #[must_use]
    pub fn grouped_messages(&self) -> Vec<(ViolationCategory, String)> {
        ViolationCategory::ALL
            .into_iter()
            .filter_map(|category| {
                let messages: Vec<&str> =
                    self.in_category(category).map(|violation| violation.message.as_str()).collect();
                (!messages.is_empty()).then(|| (category, messages.join("; ")))
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Scanner
// ============================================================================

/// Parses `source` and scans it against `policy`.
///
/// # Errors
///
/// Returns [`SourceSyntaxError`] when the source does not parse.
pub fn scan_source(source: &str, policy: &SourcePolicy) -> Result<SourceScan, SourceSyntaxError> {
    let module = parse_module(source)?;
    Ok(scan_module(&module, policy))
}

/// Scans an already parsed module against `policy`.
#[must_use]
pub fn scan_module(module: &Module, policy: &SourcePolicy) -> SourceScan {
    let mut violations = Vec::new();
    check_imports(module, policy, &mut violations);
    check_builtin_calls(module, policy, &mut violations);
    check_file_operations(module, &mut violations);
    check_network_operations(module, &mut violations);
    check_dangerous_patterns(module, &mut violations);
    violations.sort_by_key(|violation| violation.category);
    SourceScan {
        violations,
    }
}

/// Import statements against the block and allow sets.
fn check_imports(module: &Module, policy: &SourcePolicy, out: &mut Vec<SourceViolation>) {
    let mut check = |name: &str, line: usize| {
        let top = name.split('.').next().unwrap_or(name);
        if policy.blocked_namespaces.contains(top) {
            out.push(SourceViolation {
                category: ViolationCategory::DisallowedImport,
                line,
                message: format!("Disallowed import '{top}' found at line {line}"),
            });
        }
        if !policy.allowed_namespaces.contains(top) {
            out.push(SourceViolation {
                category: ViolationCategory::ImportNotWhitelisted,
                line,
                message: format!("Import '{top}' at line {line} is not in the allowed list"),
            });
        }
    };
    walk(&module.body, &mut |node| match node {
        Node::Stmt(Stmt::Import {
            modules, ..
        }) => {
            for imported in modules {
                check(&imported.name, imported.line);
            }
        }
        Node::Stmt(Stmt::ImportFrom {
            module: Some(name),
            line,
            ..
        }) => check(name, *line),
        _ => {}
    });
}

/// Direct calls of blocked builtins, plus the dynamic import primitive.
fn check_builtin_calls(module: &Module, policy: &SourcePolicy, out: &mut Vec<SourceViolation>) {
    walk(&module.body, &mut |node| {
        if let Some((name, line)) = called_name(node)
            && (policy.blocked_operations.contains(name) || name == DYNAMIC_IMPORT)
        {
            out.push(SourceViolation {
                category: ViolationCategory::DisallowedBuiltin,
                line,
                message: format!("Disallowed builtin function '{name}' called at line {line}"),
            });
        }
    });
}

/// `open(...)` and receiver-agnostic filesystem method calls.
fn check_file_operations(module: &Module, out: &mut Vec<SourceViolation>) {
    walk(&module.body, &mut |node| {
        let operation = match (called_name(node), called_attr(node)) {
            (Some((OPEN_CALL, line)), _) => Some(("open()".to_string(), line)),
            (_, Some((attr, line))) if FILE_OPERATION_ATTRS.contains(&attr) => {
                Some((format!(".{attr}()"), line))
            }
            _ => None,
        };
        if let Some((operation, line)) = operation {
            out.push(SourceViolation {
                category: ViolationCategory::DisallowedFileOperation,
                line,
                message: format!("File operation '{operation}' found at line {line}"),
            });
        }
    });
}

/// Receiver-agnostic network method calls.
fn check_network_operations(module: &Module, out: &mut Vec<SourceViolation>) {
    walk(&module.body, &mut |node| {
        if let Some((attr, line)) = called_attr(node)
            && NETWORK_OPERATION_ATTRS.contains(&attr)
        {
            out.push(SourceViolation {
                category: ViolationCategory::DisallowedNetworkOperation,
                line,
                message: format!("Network operation '.{attr}()' found at line {line}"),
            });
        }
    });
}

/// Execution primitives used as statements and reflective attribute access.
fn check_dangerous_patterns(module: &Module, out: &mut Vec<SourceViolation>) {
    walk(&module.body, &mut |node| {
        let pattern = match node {
            Node::Stmt(Stmt::Expr {
                value:
                    Expr::Call {
                        func, ..
                    },
                line,
            }) => match func.as_ref() {
                Expr::Name {
                    id, ..
                } if DYNAMIC_EXECUTION_NAMES.contains(&id.as_str()) => Some((id.clone(), *line)),
                _ => None,
            },
            Node::Expr(Expr::Attribute {
                attr,
                line,
                ..
            }) if REFLECTIVE_ATTRS.contains(&attr.as_str()) => Some((format!(".{attr}"), *line)),
            _ => None,
        };
        if let Some((pattern, line)) = pattern {
            out.push(SourceViolation {
                category: ViolationCategory::DangerousPattern,
                line,
                message: format!("Dangerous code pattern '{pattern}' found at line {line}"),
            });
        }
    });
}

// ============================================================================
// SECTION: Node Helpers
// ============================================================================

/// Returns the callee name of a direct call (`name(...)`).
fn called_name(node: Node<'_>) -> Option<(&str, usize)> {
    match node {
        Node::Expr(Expr::Call {
            func,
            line,
            ..
        }) => match func.as_ref() {
            Expr::Name {
                id, ..
            } => Some((id.as_str(), *line)),
            _ => None,
        },
        _ => None,
    }
}

/// Returns the method name of an attribute call (`receiver.attr(...)`).
fn called_attr(node: Node<'_>) -> Option<(&str, usize)> {
    match node {
        Node::Expr(Expr::Call {
            func,
            line,
            ..
        }) => match func.as_ref() {
            Expr::Attribute {
                attr, ..
            } => Some((attr.as_str(), *line)),
            _ => None,
        },
        _ => None,
    }
}
