// crates/model-gate-service/src/lib.rs
// ============================================================================
// Module: Model Gate Service
// Description: Invocation layer for storage-event driven verification.
// Purpose: Wire artifact sources, audit sinks, and the registry to the verifier.
// Dependencies: model-gate-core, model-gate-config, model-gate-store-sqlite, aws-sdk-s3, tokio
// ============================================================================

//! ## Overview
//! The service turns one storage notification (or one explicit location) into
//! one persisted verification report. Every input, malformed events and
//! internal faults included, yields an outcome with a verdict; nothing in
//! this layer returns an error once the service is built.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod event;
pub mod fs_source;
pub mod s3_source;
pub mod service;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::StderrAuditSink;
pub use event::EventError;
pub use event::parse_storage_event;
pub use fs_source::FsArtifactSource;
pub use s3_source::S3ArtifactSource;
pub use service::ServiceError;
pub use service::VerificationOutcome;
pub use service::VerifyService;
