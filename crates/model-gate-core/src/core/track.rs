// crates/model-gate-core/src/core/track.rs
// ============================================================================
// Module: Model Gate Submission Tracks
// Description: Track selection, container families, and canonical check names.
// Purpose: Keep suffix routing and check labels in one deterministic table.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A submission's track and container family are a pure function of the
//! declared path suffix; content is never sniffed. Each track carries its own
//! table of canonical check names. The two tables use different conventions
//! because registry consumers already key on both label sets.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Check recorded when the invocation event cannot be parsed.
pub const EVENT_PARSING_CHECK: &str = "eventParsing";
/// Check recorded when a run faults unexpectedly.
pub const PIPELINE_FAULT_CHECK: &str = "pipelineFault";
/// Prefix for helper-class warnings on the bytecode track.
pub const HELPER_SCAN_PREFIX: &str = "helperScan:";
/// Model identifier used when nothing better can be derived.
pub const UNKNOWN_MODEL_ID: &str = "unknown-model";

/// Suffixes recognised on declared paths, longest first.
const KNOWN_SUFFIXES: [&str; 5] = [".tar.gz", ".tgz", ".zip", ".jar", ".class"];

// ============================================================================
// SECTION: Track
// ============================================================================

/// Artifact shape under verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    /// Interpreted source analysed through a syntax tree.
    Source,
    /// Compiled classes analysed through the constant pool.
    Bytecode,
}

impl Track {
    /// Returns the canonical check-name table for the track.
    #[must_use]
    pub const fn checks(self) -> &'static CheckNames {
        match self {
            Self::Source => &SOURCE_CHECKS,
            Self::Bytecode => &BYTECODE_CHECKS,
        }
    }

    /// Returns the stable label used in audit events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Bytecode => "bytecode",
        }
    }
}

/// Container families the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFamily {
    /// Zip-style archive.
    Zip,
    /// Tar stream wrapped in gzip.
    TarGzip,
}

/// Submission shape selected from the declared path suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    /// Source bundle (`.zip`, `.tar.gz`, `.tgz`); entries keyed by basename.
    SourceBundle(ContainerFamily),
    /// Java archive (`.jar`); entries keyed by full relative path.
    JarBundle,
    /// Single compiled class (`.class`); no extraction and no metadata.
    ClassFile,
    /// Unrecognised suffix; routed to the source track and rejected at extraction.
    Unsupported,
}

impl SubmissionKind {
    /// Classifies a declared storage path by suffix.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let name = basename(path).to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Self::SourceBundle(ContainerFamily::TarGzip)
        } else if name.ends_with(".zip") {
            Self::SourceBundle(ContainerFamily::Zip)
        } else if name.ends_with(".jar") {
            Self::JarBundle
        } else if name.ends_with(".class") {
            Self::ClassFile
        } else {
            Self::Unsupported
        }
    }

    /// Returns the verification track for the submission.
    #[must_use]
    pub const fn track(self) -> Track {
        match self {
            Self::SourceBundle(_) | Self::Unsupported => Track::Source,
            Self::JarBundle | Self::ClassFile => Track::Bytecode,
        }
    }
}

// ============================================================================
// SECTION: Check Names
// ============================================================================

/// Names recorded for one gate.
///
/// `passed` is recorded when the gate succeeds and `failed` when the pipeline
/// itself rejects at this gate. Validators that report finer-grained failure
/// classes (metadata codes, scanner categories) record under their own names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    /// Name recorded on success.
    pub passed: &'static str,
    /// Name recorded on failure.
    pub failed: &'static str,
}

impl Gate {
    /// Gate whose success and failure share one name.
    const fn same(name: &'static str) -> Self {
        Self {
            passed: name,
            failed: name,
        }
    }

    /// Gate with distinct success and failure names.
    const fn split(passed: &'static str, failed: &'static str) -> Self {
        Self {
            passed,
            failed,
        }
    }
}

/// Canonical check names for one track.
///
/// # Invariants
/// - Each name is unique within its table.
/// - Gates a track does not have are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckNames {
    /// Declared size gate.
    pub size: Gate,
    /// Byte retrieval gate.
    pub retrieval: Gate,
    /// Container extraction gate.
    pub extraction: Gate,
    /// Required-files gate.
    pub structure: Gate,
    /// Metadata document gate; failures use metadata codes.
    pub metadata: Gate,
    /// Primary unit lookup gate.
    pub primary_present: Option<Gate>,
    /// Primary unit parse gate.
    pub primary_parse: Option<Gate>,
    /// Entry-contract gate (source track) or interface gate (bytecode track).
    pub entry_contract: Gate,
    /// Policy scan gate.
    pub policy_scan: Gate,
}

/// Check names for the interpreted-source track.
pub const SOURCE_CHECKS: CheckNames = CheckNames {
    size: Gate::split("file_size_validation", "FILE_TOO_LARGE"),
    retrieval: Gate::split("artifact_retrieval", "ARTIFACT_UNREADABLE"),
    extraction: Gate::split("archive_extraction", "INVALID_ARCHIVE"),
    structure: Gate::split("structure_validation", "MISSING_REQUIRED_FILES"),
    metadata: Gate::split("metadata_validation", "INVALID_JSON"),
    primary_present: None,
    primary_parse: None,
    entry_contract: Gate::split("class_structure_validation", "MISSING_REQUIRED_CLASS"),
    policy_scan: Gate::split("code_safety_scan", "DANGEROUS_PATTERN"),
};

/// Primary class lookup gate of the compiled-bytecode track.
pub const MODEL_CLASS_PRESENT: Gate = Gate::same("modelClassPresent");
/// Primary class parse gate of the compiled-bytecode track.
pub const CLASS_FILE_VALID: Gate = Gate::same("classFileValid");

/// Check names for the compiled-bytecode track.
pub const BYTECODE_CHECKS: CheckNames = CheckNames {
    size: Gate::same("fileSize"),
    retrieval: Gate::same("fileReadable"),
    extraction: Gate::same("jarExtraction"),
    structure: Gate::same("jarStructure"),
    metadata: Gate::same("metadataValid"),
    primary_present: Some(MODEL_CLASS_PRESENT),
    primary_parse: Some(CLASS_FILE_VALID),
    entry_contract: Gate::same("implementsInterface"),
    policy_scan: Gate::same("securityScan"),
};

/// Returns the bytecode check name for a required method (`hasSimulateStep`).
#[must_use]
pub fn method_check_name(method: &str) -> String {
    let mut chars = method.chars();
    chars.next().map_or_else(
        || "has".to_string(),
        |first| format!("has{}{}", first.to_uppercase(), chars.as_str()),
    )
}

/// Returns the helper warning check name for a bundle path.
#[must_use]
pub fn helper_check_name(path: &str) -> String {
    format!("{HELPER_SCAN_PREFIX}{path}")
}

// ============================================================================
// SECTION: Model Identifier Fallback
// ============================================================================

/// Returns the final path segment of a slash-separated storage key.
#[must_use]
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Derives a best-effort model identifier from a declared storage path.
///
/// The basename is taken and one recognised suffix is stripped;
/// `uploads/models/MyCustomModel.class` yields `MyCustomModel`.
#[must_use]
pub fn fallback_model_id(path: &str) -> String {
    let name = basename(path);
    let lower = name.to_ascii_lowercase();
    let stem = KNOWN_SUFFIXES
        .iter()
        .find(|suffix| lower.ends_with(*suffix))
        .map_or(name, |suffix| &name[.. name.len() - suffix.len()]);
    if stem.trim().is_empty() { UNKNOWN_MODEL_ID.to_string() } else { stem.to_string() }
}
