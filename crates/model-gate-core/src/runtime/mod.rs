// crates/model-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Model Gate Runtime
// Description: Verification pipeline and in-memory collaborators.
// Purpose: Execute verification runs against the shared policy.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules sequence the validators and scanners into one run per
//! artifact. Every invocation layer calls into the same [`Verifier`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod pipeline;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use pipeline::METADATA_FILE;
pub use pipeline::PersistenceOutcome;
pub use pipeline::VerificationRun;
pub use pipeline::Verifier;
pub use store::InMemoryVerificationSink;
pub use store::RecordingAuditSink;
