// crates/model-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Model Gate Interfaces
// Description: Backend-agnostic interfaces for retrieval, persistence, and audit.
// Purpose: Define the collaborator surfaces the verification pipeline depends on.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the verifier integrates with storage, the results
//! registry, and audit logging without embedding backend-specific details.
//! Retrieval failures are converted into failed checks by the pipeline;
//! persistence and audit failures never change a computed verdict.
//!
//! Security posture: interface implementations consume untrusted inputs;
//! artifact bytes and source text are never placed in audit events.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::Track;
use crate::core::VerificationReport;
use crate::core::VerificationStatus;

// ============================================================================
// SECTION: Artifact Source
// ============================================================================

/// Storage location of a submitted artifact.
///
/// # Invariants
/// - `key` is the declared path; its suffix selects the track.
/// - `declared_size` is the size reported by storage, not the bytes read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocation {
    /// Storage bucket or root label.
    pub bucket: String,
    /// Declared object key.
    pub key: String,
    /// Size reported by storage, in bytes.
    pub declared_size: u64,
}

/// Artifact retrieval errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Artifact does not exist.
    #[error("artifact not found: {0}")]
    NotFound(String),
    /// Location is malformed or unsafe.
    #[error("invalid artifact location: {0}")]
    Invalid(String),
    /// Local I/O failed.
    #[error("artifact io error: {0}")]
    Io(String),
    /// Remote backend failed.
    #[error("artifact backend error: {0}")]
    Backend(String),
    /// Artifact exceeded the retrieval ceiling.
    #[error("artifact {path} exceeds size limit ({actual_bytes} > {max_bytes})")]
    TooLarge {
        /// Artifact path.
        path: String,
        /// Maximum allowed bytes.
        max_bytes: u64,
        /// Bytes observed before the read stopped.
        actual_bytes: u64,
    },
}

/// Backend-agnostic artifact retrieval.
pub trait ArtifactSource: Send + Sync {
    /// Fetches the artifact bytes, reading at most `max_bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the artifact cannot be read in full
    /// within the limit.
    fn fetch(&self, location: &ArtifactLocation, max_bytes: u64) -> Result<Vec<u8>, SourceError>;
}

// ============================================================================
// SECTION: Verification Sink
// ============================================================================

/// Row upserted into the results registry, keyed by model identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    /// Model identifier (registry key).
    pub model_id: String,
    /// Storage bucket of the artifact.
    pub bucket: String,
    /// Storage key of the artifact.
    pub key: String,
    /// Verdict label.
    pub status: VerificationStatus,
    /// Report timestamp.
    pub timestamp: String,
    /// Names of every passed check.
    pub passed_checks: Vec<String>,
    /// Flattened failure list.
    pub errors: Vec<String>,
    /// Run duration in milliseconds.
    pub execution_time_ms: u64,
    /// Lowercase hex SHA-256 of the retrieved bytes, when retrieval succeeded.
    pub artifact_sha256: Option<String>,
    /// Full report.
    pub report: VerificationReport,
}

/// Status update applied to the upload-tracking record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadStatusUpdate {
    /// Model identifier.
    pub model_id: String,
    /// Verdict label.
    pub status: VerificationStatus,
    /// Report timestamp.
    pub timestamp: String,
    /// Always true once a verdict exists.
    pub verification_complete: bool,
}

/// Persistence errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Backend write failed.
    #[error("verification sink error: {0}")]
    Backend(String),
    /// Record could not be encoded.
    #[error("verification sink encoding error: {0}")]
    Encoding(String),
}

/// Persistence collaborator for verification results.
///
/// Both operations are idempotent: repeating a write with the same record
/// leaves the store unchanged.
pub trait VerificationSink: Send + Sync {
    /// Inserts or replaces the registry row for `record.model_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the write fails.
    fn upsert_result(&self, record: &RegistryRecord) -> Result<(), SinkError>;

    /// Updates the upload-tracking record for a model.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the write fails.
    fn update_upload_status(&self, update: &UploadStatusUpdate) -> Result<(), SinkError>;
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Structured audit events emitted during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Run began for a declared location.
    VerificationStarted {
        /// Storage bucket.
        bucket: String,
        /// Declared key.
        key: String,
        /// Selected track.
        track: Track,
    },
    /// A gate finished.
    StageCompleted {
        /// Check name recorded for the gate.
        stage: String,
        /// Whether the gate passed.
        passed: bool,
    },
    /// A helper class failed its scan.
    HelperViolation {
        /// Bundle path of the helper class.
        class_path: String,
        /// Violation summary.
        message: String,
    },
    /// Run finished with a verdict.
    VerificationCompleted {
        /// Model identifier.
        model_id: String,
        /// Final verdict.
        verified: bool,
        /// Run duration in milliseconds.
        execution_time_ms: u64,
    },
    /// A persistence write failed after the verdict was final.
    PersistenceFailed {
        /// Model identifier.
        model_id: String,
        /// Failed operation name.
        operation: String,
        /// Error message.
        error: String,
    },
    /// An invocation event could not be parsed.
    EventRejected {
        /// Parse error message.
        error: String,
    },
}

impl AuditEvent {
    /// Returns the stable event label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::VerificationStarted {
                ..
            } => "verification_started",
            Self::StageCompleted {
                ..
            } => "stage_completed",
            Self::HelperViolation {
                ..
            } => "helper_violation",
            Self::VerificationCompleted {
                ..
            } => "verification_completed",
            Self::PersistenceFailed {
                ..
            } => "persistence_failed",
            Self::EventRejected {
                ..
            } => "event_rejected",
        }
    }
}

/// Audit sink for verification events.
pub trait AuditSink: Send + Sync {
    /// Records an audit event. Failures are swallowed by implementations.
    fn record(&self, event: &AuditEvent);
}

/// Audit sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}
