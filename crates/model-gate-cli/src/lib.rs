// crates/model-gate-cli/src/lib.rs
// ============================================================================
// Module: Model Gate CLI Library
// Description: Shared helpers for the `model-gate` binary.
// Purpose: Expose the message catalog to the binary and its tests.
// Dependencies: Standard library.
// ============================================================================

//! ## Overview
//! Library half of the CLI crate. The binary routes all user-facing text
//! through [`i18n`].

pub mod i18n;
