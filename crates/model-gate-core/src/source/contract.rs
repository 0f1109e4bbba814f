// crates/model-gate-core/src/source/contract.rs
// ============================================================================
// Module: Model Gate Entry Contract
// Description: Required entry type, method, and parameter-shape check.
// Purpose: Confirm interpreted source exposes the declared entry point.
// Dependencies: crate::core::policy, crate::source::{parser, syntax}, crate::validate
// ============================================================================

//! ## Overview
//! The entry type may be defined anywhere in the module; the entry method must
//! be a direct member of it. Parameter names beyond the receiver are compared
//! against the declared list and mismatches are only warnings. Fewer
//! parameters than declared is fatal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::SourcePolicy;
use crate::source::parser::parse_module;
use crate::source::syntax::Module;
use crate::source::syntax::Node;
use crate::source::syntax::SourceSyntaxError;
use crate::source::syntax::Stmt;
use crate::source::syntax::walk;
use crate::validate::ContractViolation;

// ============================================================================
// SECTION: Check Names
// ============================================================================

/// Check recorded when interpreted source does not parse.
pub const SYNTAX_ERROR_CHECK: &str = "SYNTAX_ERROR";
/// Check recorded when the entry type is absent.
pub const MISSING_CLASS_CHECK: &str = "MISSING_REQUIRED_CLASS";
/// Check recorded when the entry method is absent.
pub const MISSING_METHOD_CHECK: &str = "MISSING_REQUIRED_METHOD";
/// Check recorded when the entry method takes too few parameters.
pub const INVALID_SIGNATURE_CHECK: &str = "INVALID_METHOD_SIGNATURE";
/// Warning recorded for renamed entry parameters.
pub const SIGNATURE_MISMATCH_CHECK: &str = "METHOD_SIGNATURE_MISMATCH";

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Successful entry-contract check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractOutcome {
    /// Non-fatal parameter-name mismatches.
    pub warnings: Vec<String>,
}

impl ContractOutcome {
    /// Returns the warnings joined into one message, if any.
    #[must_use]
    pub fn warning_message(&self) -> Option<String> {
        (!self.warnings.is_empty()).then(|| self.warnings.join("; "))
    }
}

// ============================================================================
// SECTION: Checks
// ============================================================================

/// Parses `source` and checks the entry contract.
///
/// # Errors
///
/// Returns a [`ContractViolation`] under `SYNTAX_ERROR` when the source does
/// not parse, or under the failing contract check otherwise.
pub fn check_entry_contract(
    source: &str,
    policy: &SourcePolicy,
) -> Result<ContractOutcome, ContractViolation> {
    let module = parse_module(source).map_err(|err| syntax_violation(&policy.entry_file, &err))?;
    check_module_contract(&module, policy)
}

/// Checks the entry contract of a parsed module.
///
/// # Errors
///
/// Returns a [`ContractViolation`] naming the missing type, missing method, or
/// short parameter list.
pub fn check_module_contract(
    module: &Module,
    policy: &SourcePolicy,
) -> Result<ContractOutcome, ContractViolation> {
    let mut type_found = false;
    let mut params: Option<&[String]> = None;
    walk(&module.body, &mut |node| {
        if params.is_some() {
            return;
        }
        if let Node::Stmt(Stmt::ClassDef {
            name,
            body,
            ..
        }) = node
            && *name == policy.entry_type
        {
            type_found = true;
            params = body.iter().find_map(|member| match member {
                Stmt::FunctionDef {
                    name: method,
                    params: declared,
                    ..
                } if *method == policy.entry_method => Some(declared.as_slice()),
                _ => None,
            });
        }
    });
    if !type_found {
        return Err(ContractViolation::new(
            MISSING_CLASS_CHECK,
            format!("{} must contain a class named '{}'", policy.entry_file, policy.entry_type),
        ));
    }
    let Some(params) = params else {
        return Err(ContractViolation::new(
            MISSING_METHOD_CHECK,
            format!(
                "Class '{}' must have a method named '{}'",
                policy.entry_type, policy.entry_method
            ),
        ));
    };
    check_parameters(params, policy)
}

/// Compares declared parameters against the expected list.
fn check_parameters(
    params: &[String],
    policy: &SourcePolicy,
) -> Result<ContractOutcome, ContractViolation> {
    let expected = &policy.entry_parameters;
    if params.len() < expected.len() {
        return Err(ContractViolation::new(
            INVALID_SIGNATURE_CHECK,
            format!(
                "{}() method must accept parameters: {}",
                policy.entry_method,
                expected.join(", ")
            ),
        ));
    }
    let warnings = expected
        .iter()
        .zip(params)
        .skip(1)
        .filter(|(want, found)| want != found)
        .map(|(want, found)| {
            format!(
                "{}() parameter mismatch. Expected '{want}' but found '{found}'",
                policy.entry_method
            )
        })
        .collect();
    Ok(ContractOutcome {
        warnings,
    })
}

/// Builds the syntax-error violation for the entry file.
#[must_use]
pub fn syntax_violation(entry_file: &str, err: &SourceSyntaxError) -> ContractViolation {
    ContractViolation::new(
        SYNTAX_ERROR_CHECK,
        format!("{entry_file} has syntax error at line {}: {}", err.line, err.message),
    )
}
