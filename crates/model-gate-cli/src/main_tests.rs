// crates/model-gate-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for bounded reads, path splitting, and rendering.
// Purpose: Ensure CLI helpers fail closed and map verdicts consistently.
// Dependencies: model-gate-cli main helpers
// ============================================================================

//! ## Overview
//! Validates `read_bytes_with_limit`, `local_location`, and outcome
//! rendering without spawning the binary.
//!
//! Security posture: CLI inputs are untrusted; size limits must fail closed.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;

use model_gate_core::CheckResult;
use model_gate_core::VerificationReport;
use model_gate_core::VerificationStatus;
use model_gate_service::VerificationOutcome;

use super::LOCAL_BUCKET;
use super::ReadLimitError;
use super::local_location;
use super::read_bytes_with_limit;
use super::render_outcome_text;
use super::verdict_exit_status;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn outcome(checks: BTreeMap<String, CheckResult>, verified: bool) -> VerificationOutcome {
    let report = VerificationReport {
        model_id: "momentum-v1".to_string(),
        verified,
        checks,
        overall_errors: Vec::new(),
        execution_time_ms: 12,
        timestamp: "1970-01-01T00:00:00Z".to_string(),
    };
    VerificationOutcome {
        model_id: report.model_id.clone(),
        status: report.status(),
        report,
        artifact_sha256: None,
        persistence: None,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn read_bytes_with_limit_allows_exact_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("event.json");
    fs::write(&path, b"abcd").unwrap();
    assert_eq!(read_bytes_with_limit(&path, 4).unwrap(), b"abcd");
}

#[test]
fn read_bytes_with_limit_rejects_oversized_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("event.json");
    fs::write(&path, b"abcde").unwrap();
    match read_bytes_with_limit(&path, 4) {
        Err(ReadLimitError::TooLarge {
            size,
            limit,
        }) => {
            assert_eq!(size, 5);
            assert_eq!(limit, 4);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn read_bytes_with_limit_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = read_bytes_with_limit(&dir.path().join("absent.json"), 16);
    assert!(matches!(result, Err(ReadLimitError::Io(_))));
}

#[test]
fn local_location_splits_root_and_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("valid_model.zip");
    fs::write(&path, [0_u8; 32]).unwrap();

    let (root, location) = local_location(&path).unwrap();

    assert_eq!(root, dir.path());
    assert_eq!(location.bucket, LOCAL_BUCKET);
    assert_eq!(location.key, "valid_model.zip");
    assert_eq!(location.declared_size, 32);
}

#[test]
fn local_location_rejects_directories() {
    let dir = tempfile::tempdir().unwrap();
    let err = local_location(dir.path()).unwrap_err();
    assert!(err.to_string().starts_with("Artifact path must name a file"));
}

#[test]
fn verdicts_map_to_distinct_exit_statuses() {
    assert_eq!(verdict_exit_status(true), 0);
    assert_eq!(verdict_exit_status(false), 2);
}

#[test]
fn text_rendering_lists_each_check() {
    let mut checks = BTreeMap::new();
    checks.insert(
        "file_size_validation".to_string(),
        CheckResult {
            passed: true,
            error: None,
            warning: None,
        },
    );
    checks.insert(
        "DISALLOWED_IMPORT".to_string(),
        CheckResult {
            passed: false,
            error: Some("Disallowed import 'os' found at line 1".to_string()),
            warning: None,
        },
    );
    checks.insert(
        "METHOD_SIGNATURE_MISMATCH".to_string(),
        CheckResult {
            passed: true,
            error: None,
            warning: Some("unexpected parameter names".to_string()),
        },
    );
    let rendered = render_outcome_text(&outcome(checks, false));
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines[0], "momentum-v1: INVALID (12 ms)");
    assert!(lines.contains(&"  FAIL DISALLOWED_IMPORT: Disallowed import 'os' found at line 1"));
    assert!(lines.contains(&"  WARN METHOD_SIGNATURE_MISMATCH: unexpected parameter names"));
    assert!(lines.contains(&"  PASS file_size_validation"));
    assert_eq!(outcome(BTreeMap::new(), true).status, VerificationStatus::Valid);
}
