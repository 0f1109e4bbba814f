// crates/model-gate-service/src/service.rs
// ============================================================================
// Module: Verification Service
// Description: Event and location handlers over one shared verifier.
// Purpose: Produce, persist, and return exactly one outcome per invocation.
// Dependencies: model-gate-core, model-gate-config, model-gate-store-sqlite
// ============================================================================

//! ## Overview
//! [`VerifyService`] owns the collaborators selected by configuration and
//! runs the verifier for each invocation. Faults raised inside a run are
//! caught here and reported as a failed `pipelineFault` check, so the caller
//! always receives a verdict.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::path::Path;
use std::sync::Arc;

use model_gate_config::ModelGateConfig;
use model_gate_config::StorageConfig;
use model_gate_core::ArtifactLocation;
use model_gate_core::ArtifactSource;
use model_gate_core::AuditEvent;
use model_gate_core::AuditSink;
use model_gate_core::Clock;
use model_gate_core::InMemoryVerificationSink;
use model_gate_core::NoopAuditSink;
use model_gate_core::PersistenceOutcome;
use model_gate_core::SourceError;
use model_gate_core::SystemClock;
use model_gate_core::VerificationReport;
use model_gate_core::VerificationRun;
use model_gate_core::VerificationSink;
use model_gate_core::VerificationStatus;
use model_gate_core::Verifier;
use model_gate_core::track::fallback_model_id;
use model_gate_store_sqlite::SqliteSinkError;
use model_gate_store_sqlite::SqliteVerificationSink;
use serde::Serialize;
use thiserror::Error;

use crate::audit::FileAuditSink;
use crate::audit::StderrAuditSink;
use crate::event::parse_storage_event;
use crate::fs_source::FsArtifactSource;
use crate::s3_source::S3ArtifactSource;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Check recorded when the invocation event cannot be parsed.
pub const EVENT_PARSING_CHECK: &str = "eventParsing";
/// Check recorded when a run aborts unexpectedly.
pub const PIPELINE_FAULT_CHECK: &str = "pipelineFault";
/// Model identifier used when no location is known.
pub const UNKNOWN_MODEL_ID: &str = "unknown-model";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Service construction errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Artifact source could not be built.
    #[error("artifact source setup failed: {0}")]
    Source(#[from] SourceError),
    /// Results registry could not be opened.
    #[error("registry setup failed: {0}")]
    Registry(#[from] SqliteSinkError),
    /// Audit log could not be opened.
    #[error("audit log setup failed: {0}")]
    Audit(String),
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Result handed back to the invoker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationOutcome {
    /// Model identifier.
    pub model_id: String,
    /// Verdict label.
    pub status: VerificationStatus,
    /// Full report.
    pub report: VerificationReport,
    /// Lowercase hex SHA-256 of the retrieved bytes, when retrieval succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_sha256: Option<String>,
    /// Which persistence writes succeeded.
    #[serde(skip)]
    pub persistence: Option<PersistenceOutcome>,
}

impl VerificationOutcome {
    /// Returns true when the artifact was admitted.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        self.report.verified
    }

    /// Builds an outcome from a finished run.
    fn from_run(run: VerificationRun, persistence: Option<PersistenceOutcome>) -> Self {
        Self {
            model_id: run.report.model_id.clone(),
            status: run.status(),
            artifact_sha256: run.artifact_sha256,
            report: run.report,
            persistence,
        }
    }
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Verification service bound to one source, sink, and audit log.
#[derive(Clone)]
pub struct VerifyService {
    /// Shared verifier.
    verifier: Verifier,
    /// Artifact retrieval backend.
    source: Arc<dyn ArtifactSource>,
    /// Results registry.
    sink: Arc<dyn VerificationSink>,
    /// Audit sink shared with the verifier.
    audit: Arc<dyn AuditSink>,
}

impl VerifyService {
    /// Creates a service from explicit collaborators.
    #[must_use]
    pub fn new(
        verifier: Verifier,
        source: Arc<dyn ArtifactSource>,
        sink: Arc<dyn VerificationSink>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            verifier,
            source,
            sink,
            audit,
        }
    }

    /// Builds a service from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when a configured collaborator cannot be built.
    pub fn from_config(config: &ModelGateConfig) -> Result<Self, ServiceError> {
        let source: Arc<dyn ArtifactSource> = match &config.storage {
            StorageConfig::Filesystem(storage) => Arc::new(FsArtifactSource::new(&storage.root)),
            StorageConfig::S3(storage) => Arc::new(S3ArtifactSource::new(storage)?),
        };
        Self::from_config_with_source(config, source)
    }

    /// Builds a service from configuration with an explicit artifact source.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the registry or audit log cannot be opened.
    pub fn from_config_with_source(
        config: &ModelGateConfig,
        source: Arc<dyn ArtifactSource>,
    ) -> Result<Self, ServiceError> {
        let audit = audit_sink(config)?;
        let sink: Arc<dyn VerificationSink> = match config.registry.sqlite_config() {
            Some(store) => Arc::new(SqliteVerificationSink::new(&store)?),
            None => Arc::new(InMemoryVerificationSink::new()),
        };
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let verifier = Verifier::new(Arc::new(config.policy()), clock, Arc::clone(&audit));
        Ok(Self::new(verifier, source, sink, audit))
    }

    /// Returns the verifier.
    #[must_use]
    pub const fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    /// Verifies the artifact at `location` and persists the result.
    #[must_use]
    pub fn handle_location(&self, location: &ArtifactLocation) -> VerificationOutcome {
        let run = catch_unwind(AssertUnwindSafe(|| {
            self.verifier.verify(location, self.source.as_ref())
        }))
        .unwrap_or_else(|_| {
            self.verifier.failed_run(
                &fallback_model_id(&location.key),
                PIPELINE_FAULT_CHECK,
                "verification aborted by an internal fault",
            )
        });
        let persistence = self.verifier.persist(location, &run, self.sink.as_ref());
        VerificationOutcome::from_run(run, Some(persistence))
    }

    /// Parses an upload notification and verifies the artifact it names.
    ///
    /// A malformed event yields an outcome with a failed `eventParsing`
    /// check; nothing is persisted because no location is known.
    #[must_use]
    pub fn handle_event(&self, payload: &str) -> VerificationOutcome {
        match parse_storage_event(payload) {
            Ok(location) => self.handle_location(&location),
            Err(err) => {
                let message = err.to_string();
                self.audit.record(&AuditEvent::EventRejected {
                    error: message.clone(),
                });
                let run = self.verifier.failed_run(UNKNOWN_MODEL_ID, EVENT_PARSING_CHECK, &message);
                VerificationOutcome::from_run(run, None)
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the configured audit sink.
fn audit_sink(config: &ModelGateConfig) -> Result<Arc<dyn AuditSink>, ServiceError> {
    if !config.audit.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.audit.path {
        Some(path) => {
            let sink = FileAuditSink::new(Path::new(path))
                .map_err(|err| ServiceError::Audit(err.to_string()))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}
