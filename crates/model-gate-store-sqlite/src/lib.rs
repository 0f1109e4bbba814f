// crates/model-gate-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Verification Registry
// Description: Durable VerificationSink backend using SQLite WAL.
// Purpose: Persist verification results and upload status for admitted models.
// Dependencies: model-gate-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`VerificationSink`] that keeps one
//! registry row per model identifier plus the upload-tracking status the
//! submission front end polls. Writes are idempotent upserts, so replaying a
//! storage event leaves the registry unchanged.
//!
//! [`VerificationSink`]: model_gate_core::VerificationSink

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_REPORT_BYTES;
pub use store::SqliteSinkError;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::SqliteVerificationSink;
