// crates/model-gate-core/src/validate/mod.rs
// ============================================================================
// Module: Model Gate Structural Validation
// Description: Size gates, required-file checks, and metadata validation.
// Purpose: Reject submissions whose shape cannot satisfy the declared contract.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Structural checks are pure functions over sizes and bundles. They return
//! a [`ContractViolation`] naming what is missing; the pipeline decides which
//! check name to record it under.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod metadata;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::core::ArtifactBundle;

// ============================================================================
// SECTION: Contract Violation
// ============================================================================

/// A structural or contract rule that the submission breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractViolation {
    /// Check name the violation is recorded under.
    pub check: String,
    /// Human-readable message.
    pub message: String,
}

impl ContractViolation {
    /// Creates a violation.
    #[must_use]
    pub fn new(check: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Size
// ============================================================================

/// Returns true when `size_bytes` does not exceed `ceiling`.
#[must_use]
pub const fn check_size(size_bytes: u64, ceiling: u64) -> bool {
    size_bytes <= ceiling
}

// ============================================================================
// SECTION: Required Files
// ============================================================================

/// Returns the required files absent from a flattened source bundle.
#[must_use]
pub fn missing_files(bundle: &ArtifactBundle, required_files: &BTreeSet<String>) -> Vec<String> {
    required_files.iter().filter(|name| !bundle.contains(name)).cloned().collect()
}

/// Returns true when every required file is present in a flattened bundle.
#[must_use]
pub fn check_structure(bundle: &ArtifactBundle, required_files: &BTreeSet<String>) -> bool {
    missing_files(bundle, required_files).is_empty()
}

/// Checks a Java archive: required files by path suffix, plus at least one class.
///
/// # Errors
///
/// Returns a [`ContractViolation`] listing what is missing.
pub fn check_jar_structure(
    bundle: &ArtifactBundle,
    required_files: &BTreeSet<String>,
    check: &str,
) -> Result<(), ContractViolation> {
    let missing: Vec<&str> = required_files
        .iter()
        .filter(|name| bundle.find_by_suffix(name).is_none())
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(ContractViolation::new(
            check,
            format!("Missing required files: {}", missing.join(", ")),
        ));
    }
    if !bundle.iter().any(|(path, _)| is_class_path(path)) {
        return Err(ContractViolation::new(check, "No .class files found in JAR"));
    }
    Ok(())
}

/// Returns true for compiled class entries.
#[must_use]
pub fn is_class_path(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".class")
}

/// Maps a dotted class name to its archive path (`com.example.M` to `com/example/M.class`).
#[must_use]
pub fn class_path_for(model_class: &str) -> String {
    format!("{}.class", model_class.replace('.', "/"))
}
