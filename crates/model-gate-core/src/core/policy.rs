// crates/model-gate-core/src/core/policy.rs
// ============================================================================
// Module: Model Gate Policy
// Description: Immutable allow/block rules and structural contracts.
// Purpose: Provide the single read-only rule set shared by every verification run.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`PolicyConfig`] is constructed once at process start and passed
//! explicitly into the pipeline. Nothing in the core mutates it, so concurrent
//! runs may share one instance behind an `Arc`. Defaults reproduce the rule set
//! the admission service has always shipped with, which means an empty
//! configuration file is a usable configuration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default ceiling for the declared artifact size (10 MiB).
pub const DEFAULT_MAX_ARTIFACT_BYTES: u64 = 10 * 1024 * 1024;
/// Default ceiling for the total extracted bundle size (50 MiB).
pub const DEFAULT_MAX_EXTRACTED_BYTES: u64 = 50 * 1024 * 1024;
/// Default ceiling for the number of archive entries.
pub const DEFAULT_MAX_ARCHIVE_ENTRIES: usize = 4_096;

// ============================================================================
// SECTION: Policy Config
// ============================================================================

/// Complete rule set for both submission tracks.
///
/// # Invariants
/// - Read-only for the lifetime of the process once constructed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Size and entry ceilings.
    pub limits: ArtifactLimits,
    /// Interpreted-source track rules.
    pub source: SourcePolicy,
    /// Compiled-bytecode track rules.
    pub bytecode: BytecodePolicy,
}

/// Size and entry ceilings applied before and after extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactLimits {
    /// Maximum declared artifact size in bytes.
    pub max_artifact_bytes: u64,
    /// Maximum total bytes of all extracted entries.
    pub max_extracted_bytes: u64,
    /// Maximum number of archive entries, directories included.
    pub max_archive_entries: usize,
}

impl Default for ArtifactLimits {
    fn default() -> Self {
        Self {
            max_artifact_bytes: DEFAULT_MAX_ARTIFACT_BYTES,
            max_extracted_bytes: DEFAULT_MAX_EXTRACTED_BYTES,
            max_archive_entries: DEFAULT_MAX_ARCHIVE_ENTRIES,
        }
    }
}

/// Rules for interpreted-source submissions.
///
/// # Invariants
/// - `entry_parameters` is ordered; the first entry is the receiver.
/// - Namespaces are compared against the top-level module segment only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcePolicy {
    /// Files that must be present in the bundle (basenames).
    pub required_files: BTreeSet<String>,
    /// File holding the entry type.
    pub entry_file: String,
    /// Required entry type name.
    pub entry_type: String,
    /// Required entry method name.
    pub entry_method: String,
    /// Expected ordered parameter names for the entry method.
    pub entry_parameters: Vec<String>,
    /// Required top-level metadata keys.
    pub required_metadata_fields: BTreeSet<String>,
    /// Top-level modules that may be imported.
    pub allowed_namespaces: BTreeSet<String>,
    /// Top-level modules that may never be imported.
    pub blocked_namespaces: BTreeSet<String>,
    /// Built-in operations that may never be invoked.
    pub blocked_operations: BTreeSet<String>,
}

impl Default for SourcePolicy {
    fn default() -> Self {
        Self {
            required_files: set(&["model.py", "metadata.json"]),
            entry_file: "model.py".to_string(),
            entry_type: "TradingModel".to_string(),
            entry_method: "predict".to_string(),
            entry_parameters: ["self", "stock_prices", "volume", "timestamps"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            required_metadata_fields: set(&[
                "model_id",
                "version",
                "author",
                "expected_inputs",
                "output_format",
            ]),
            allowed_namespaces: set(&[
                "numpy",
                "pandas",
                "math",
                "datetime",
                "typing",
                "collections",
                "statistics",
                "decimal",
                "functools",
                "itertools",
            ]),
            blocked_namespaces: set(&[
                "os",
                "sys",
                "subprocess",
                "socket",
                "shutil",
                "requests",
                "urllib",
                "http",
                "pickle",
                "ctypes",
                "importlib",
                "multiprocessing",
            ]),
            blocked_operations: set(&[
                "eval",
                "exec",
                "compile",
                "__import__",
                "open",
                "input",
                "globals",
                "breakpoint",
            ]),
        }
    }
}

/// Rules for compiled-bytecode submissions.
///
/// # Invariants
/// - Class names use the internal slash form (`java/lang/Runtime`).
/// - `blocked_method_references` entries are `"<owner>.<member>"`.
/// - Package prefixes match by raw string prefix, not by segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BytecodePolicy {
    /// Files that must be present in a `.jar` bundle (suffix match on path).
    pub required_files: BTreeSet<String>,
    /// Interface the primary class must declare.
    pub required_interface: String,
    /// Method the primary class must declare.
    pub required_method: String,
    /// Exact descriptor of the required method.
    pub required_method_signature: String,
    /// Required top-level metadata keys.
    pub required_metadata_fields: BTreeSet<String>,
    /// Blocked package prefixes.
    pub blocked_namespaces: BTreeSet<String>,
    /// Blocked fully-qualified classes.
    pub blocked_type_references: BTreeSet<String>,
    /// Blocked method references.
    pub blocked_method_references: BTreeSet<String>,
}

impl Default for BytecodePolicy {
    fn default() -> Self {
        Self {
            required_files: set(&["metadata.json"]),
            required_interface: "com/ttsudio/alphaback/Model".to_string(),
            required_method: "simulateStep".to_string(),
            required_method_signature: "(Lcom/ttsudio/alphaback/State;)Ljava/util/List;"
                .to_string(),
            required_metadata_fields: set(&["model_id", "version", "author", "model_class"]),
            blocked_namespaces: set(&[
                "java/io",
                "java/net",
                "java/nio",
                "java/lang/reflect",
                "java/lang/invoke",
                "sun/",
                "jdk/internal",
            ]),
            blocked_type_references: set(&[
                "java/lang/Runtime",
                "java/lang/ProcessBuilder",
                "java/lang/Process",
                "java/lang/ClassLoader",
                "java/lang/Thread",
            ]),
            blocked_method_references: set(&[
                "java/lang/Runtime.exec",
                "java/lang/System.exit",
                "java/lang/System.load",
                "java/lang/System.loadLibrary",
                "java/lang/Class.forName",
                "java/lang/System.setSecurityManager",
            ]),
        }
    }
}

/// Builds an owned string set from literals.
fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(ToString::to_string).collect()
}
