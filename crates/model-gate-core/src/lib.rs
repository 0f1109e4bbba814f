// crates/model-gate-core/src/lib.rs
// ============================================================================
// Module: Model Gate Core Library
// Description: Public API surface for the model admission verifier.
// Purpose: Expose policy types, validators, scanners, and the pipeline.
// Dependencies: crate::{bytecode, core, extract, interfaces, runtime, source, validate}
// ============================================================================

//! ## Overview
//! Model Gate decides whether a submitted trading model artifact may enter
//! the model registry. Interpreted source bundles are analysed through a
//! syntax tree and compiled Java classes through their constant pools; no
//! submitted code is ever executed. Each run produces one verification
//! report whose verdict is derived from its recorded checks.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod bytecode;
pub mod core;
pub mod extract;
pub mod interfaces;
pub mod runtime;
pub mod source;
pub mod validate;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use extract::ExtractionError;
pub use extract::extract;
pub use interfaces::ArtifactLocation;
pub use interfaces::ArtifactSource;
pub use interfaces::AuditEvent;
pub use interfaces::AuditSink;
pub use interfaces::NoopAuditSink;
pub use interfaces::RegistryRecord;
pub use interfaces::SinkError;
pub use interfaces::SourceError;
pub use interfaces::UploadStatusUpdate;
pub use interfaces::VerificationSink;
pub use runtime::InMemoryVerificationSink;
pub use runtime::PersistenceOutcome;
pub use runtime::RecordingAuditSink;
pub use runtime::VerificationRun;
pub use runtime::Verifier;
