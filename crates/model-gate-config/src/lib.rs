// crates/model-gate-config/src/lib.rs
// ============================================================================
// Module: Model Gate Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for model-gate.toml semantics.
// Dependencies: model-gate-core, model-gate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `model-gate-config` defines the configuration model for Model Gate. An
//! empty file yields the admission rules the service has always shipped
//! with; anything malformed fails closed before a verifier is built.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
