// crates/model-gate-core/src/core/mod.rs
// ============================================================================
// Module: Model Gate Core Types
// Description: Policy, submission tracks, bundles, reports, and time.
// Purpose: Provide the shared data model used by every verification stage.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Core types carry no I/O. The policy is read-only, bundles are owned by one
//! run, and reports move through an explicit open/closed state machine.

pub mod bundle;
pub mod policy;
pub mod report;
pub mod time;
pub mod track;

pub use bundle::ArtifactBundle;
pub use policy::ArtifactLimits;
pub use policy::BytecodePolicy;
pub use policy::PolicyConfig;
pub use policy::SourcePolicy;
pub use report::CheckResult;
pub use report::ClosedReport;
pub use report::OpenReport;
pub use report::VerificationReport;
pub use report::VerificationStatus;
pub use time::Clock;
pub use time::FixedClock;
pub use time::SystemClock;
pub use track::CheckNames;
pub use track::ContainerFamily;
pub use track::Gate;
pub use track::SubmissionKind;
pub use track::Track;
