// crates/model-gate-core/src/bytecode/scanner.rs
// ============================================================================
// Module: Model Gate Bytecode Policy Scanner
// Description: Constant-pool policy scan and exact-match contract checks.
// Purpose: Flag blocked type and method references in compiled classes.
// Dependencies: crate::bytecode::class_file, crate::core::policy, thiserror
// ============================================================================

//! ## Overview
//! The scan enumerates resolved constant-pool references in pool order.
//! Class references are checked against blocked classes (exact) and then
//! blocked packages (raw prefix). Method and interface-method references are
//! checked as `"<owner>.<member>"`. Watched field references only produce
//! warnings. Interface and method contract checks are exact string matches.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::bytecode::class_file::ClassDescriptor;
use crate::bytecode::class_file::ClassParseError;
use crate::bytecode::class_file::ParsedClass;
use crate::bytecode::class_file::PoolReference;
use crate::bytecode::class_file::parse_class;
use crate::core::BytecodePolicy;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Field references reported as warnings.
pub const WATCHED_FIELDS: [&str; 3] =
    ["java/lang/System.out", "java/lang/System.err", "java/lang/System.in"];

// ============================================================================
// SECTION: Scan Result
// ============================================================================

/// Outcome of a constant-pool scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BytecodeScan {
    /// Fatal policy hits, in pool order.
    pub violations: Vec<String>,
    /// Non-fatal watched-field hits, in pool order.
    pub warnings: Vec<String>,
}

impl BytecodeScan {
    /// Returns true when no violation was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Parses `class_bytes` and scans the constant pool.
///
/// # Errors
///
/// Returns [`ClassParseError`] when the class does not parse.
pub fn scan_class(
    class_bytes: &[u8],
    policy: &BytecodePolicy,
) -> Result<BytecodeScan, ClassParseError> {
    Ok(scan_parsed(&parse_class(class_bytes)?, policy))
}

/// Scans an already parsed class.
#[must_use]
pub fn scan_parsed(class: &ParsedClass, policy: &BytecodePolicy) -> BytecodeScan {
    let mut scan = BytecodeScan::default();
    for reference in &class.references {
        match reference {
            PoolReference::Class(name) => {
                let Some(name) = element_class(name) else {
                    continue;
                };
                if policy.blocked_type_references.contains(name) {
                    scan.violations.push(format!("Blocked class: {name}"));
                } else if policy
                    .blocked_namespaces
                    .iter()
                    .any(|prefix| name.starts_with(prefix.as_str()))
                {
                    scan.violations.push(format!("Blocked package class: {name}"));
                }
            }
            PoolReference::Method(member) | PoolReference::InterfaceMethod(member) => {
                let owner = element_class(&member.owner).unwrap_or(member.owner.as_str());
                let qualified = format!("{owner}.{}", member.name);
                if policy.blocked_method_references.contains(&qualified) {
                    scan.violations.push(format!("Blocked method: {qualified}"));
                }
            }
            PoolReference::Field(member) => {
                let qualified = member.qualified();
                if WATCHED_FIELDS.contains(&qualified.as_str()) {
                    scan.warnings
                        .push(format!("Access to field '{qualified}' detected (may be for logging)"));
                }
            }
        }
    }
    scan
}

/// Returns the element class of a class or array name; `None` for primitive arrays.
fn element_class(name: &str) -> Option<&str> {
    let element = name.trim_start_matches('[');
    if element.len() == name.len() {
        return Some(name);
    }
    element.strip_prefix('L').and_then(|inner| inner.strip_suffix(';'))
}

// ============================================================================
// SECTION: Contract Checks
// ============================================================================

/// Contract failures of the primary class.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassContractError {
    /// Required interface absent from the declared list.
    #[error("Does not implement required interface '{required}'. Found interfaces: {found}")]
    MissingInterface {
        /// Required interface.
        required: String,
        /// Declared interfaces, comma-separated, or `none`.
        found: String,
    },
    /// No method with the required name.
    #[error("Missing required method: {name}{descriptor}")]
    MissingMethod {
        /// Method name.
        name: String,
        /// Required descriptor.
        descriptor: String,
    },
    /// Method present with a different descriptor.
    #[error("Method '{name}' has wrong signature. Expected: {expected}, Found: {found}")]
    SignatureMismatch {
        /// Method name.
        name: String,
        /// Required descriptor.
        expected: String,
        /// Declared descriptor.
        found: String,
    },
}

/// Checks that `required` appears verbatim in the declared interface list.
///
/// # Errors
///
/// Returns [`ClassContractError::MissingInterface`] otherwise.
pub fn check_implements_interface(
    class: &ClassDescriptor,
    required: &str,
) -> Result<(), ClassContractError> {
    if class.interfaces.iter().any(|name| name == required) {
        return Ok(());
    }
    let found =
        if class.interfaces.is_empty() { "none".to_string() } else { class.interfaces.join(", ") };
    Err(ClassContractError::MissingInterface {
        required: required.to_string(),
        found,
    })
}

/// Checks that a method named `name` exists with a byte-identical descriptor.
///
/// # Errors
///
/// Returns [`ClassContractError::MissingMethod`] when no method has the name,
/// or [`ClassContractError::SignatureMismatch`] when none with the name has the
/// exact descriptor.
pub fn check_has_method(
    class: &ClassDescriptor,
    name: &str,
    descriptor: &str,
) -> Result<(), ClassContractError> {
    let mut named = class.methods.iter().filter(|method| method.name == name).peekable();
    let Some(first) = named.peek().copied() else {
        return Err(ClassContractError::MissingMethod {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        });
    };
    if named.any(|method| method.descriptor == descriptor) {
        return Ok(());
    }
    Err(ClassContractError::SignatureMismatch {
        name: name.to_string(),
        expected: descriptor.to_string(),
        found: first.descriptor.clone(),
    })
}
