// crates/model-gate-core/tests/pipeline.rs
// ============================================================================
// Module: Pipeline Tests
// Description: End-to-end verification runs for both submission tracks.
// ============================================================================
//! ## Overview
//! Drives [`Verifier::verify`] with real archives and class files and
//! asserts on the recorded checks, the derived verdict, and the model id.

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

mod common;

use std::thread;

use common::ClassFileBuilder;
use common::MemorySource;
use common::VALID_JAR_METADATA;
use common::VALID_MODEL_SOURCE;
use common::VALID_SOURCE_METADATA;
use common::location;
use common::model_jar;
use common::source_zip;
use common::tar_gz_bytes;
use common::verifier;
use common::verifier_with;
use common::verify_bytes;
use common::zip_bytes;
use model_gate_core::ArtifactLimits;
use model_gate_core::PolicyConfig;
use model_gate_core::VerificationReport;
use model_gate_core::VerificationStatus;
use model_gate_core::Verifier;

const MODEL_CLASS: &str = "com/example/MomentumModel";

fn check_names(report: &VerificationReport) -> Vec<&str> {
    report.checks.keys().map(String::as_str).collect()
}

fn error_of<'a>(report: &'a VerificationReport, check: &str) -> &'a str {
    let result = &report.checks[check];
    assert!(!result.passed, "{check} should have failed");
    result.error.as_deref().unwrap()
}

// ============================================================================
// SECTION: Source Track
// ============================================================================

#[test]
fn valid_source_zip_is_verified() {
    let run = verify_bytes("models/u1/momentum.zip", source_zip(VALID_MODEL_SOURCE));
    let report = &run.report;
    assert!(report.verified, "{:?}", report.overall_errors);
    assert_eq!(run.status(), VerificationStatus::Valid);
    assert_eq!(report.model_id, "momentum-v1");
    assert_eq!(
        check_names(report),
        vec![
            "archive_extraction",
            "artifact_retrieval",
            "class_structure_validation",
            "code_safety_scan",
            "file_size_validation",
            "metadata_validation",
            "structure_validation",
        ]
    );
    assert!(report.overall_errors.is_empty());
    assert_eq!(report.timestamp, "1970-01-01T00:00:00Z");
}

#[test]
fn valid_source_tarball_is_verified() {
    let bytes = tar_gz_bytes(&[
        ("valid_model/model.py", VALID_MODEL_SOURCE.as_bytes()),
        ("valid_model/metadata.json", VALID_SOURCE_METADATA.as_bytes()),
    ]);
    let run = verify_bytes("models/u1/valid_model.tar.gz", bytes);
    assert!(run.report.verified, "{:?}", run.report.overall_errors);
}

#[test]
fn blocked_import_fails_both_import_categories() {
    let source = format!("import os\n{VALID_MODEL_SOURCE}");
    let run = verify_bytes("models/u1/bad.zip", source_zip(&source));
    let report = &run.report;
    assert!(!report.verified);
    assert_eq!(report.model_id, "momentum-v1");
    assert_eq!(error_of(report, "DISALLOWED_IMPORT"), "Disallowed import 'os' found at line 1");
    assert_eq!(
        error_of(report, "IMPORT_NOT_WHITELISTED"),
        "Import 'os' at line 1 is not in the allowed list"
    );
    assert!(report.checks["class_structure_validation"].passed);
    assert!(!report.checks.contains_key("code_safety_scan"));
}

#[test]
fn syntax_error_halts_before_scanning() {
    let source = "class TradingModel:\n    def predict(self, stock_prices\n";
    let run = verify_bytes("m.zip", source_zip(source));
    let report = &run.report;
    assert!(error_of(report, "SYNTAX_ERROR").starts_with("model.py has syntax error at line "));
    assert!(!report.checks.contains_key("class_structure_validation"));
    assert!(!report.checks.contains_key("code_safety_scan"));
}

#[test]
fn deeply_nested_source_fails_as_syntax_error() {
    let source =
        format!("{VALID_MODEL_SOURCE}x = {}1{}\n", "(".repeat(1000), ")".repeat(1000));
    let run = verify_bytes("models/u1/nested.zip", source_zip(&source));
    let report = &run.report;
    assert!(!report.verified);
    assert_eq!(
        error_of(report, "SYNTAX_ERROR"),
        "model.py has syntax error at line 14: too many nesting levels"
    );
    assert!(!report.checks.contains_key("code_safety_scan"));
}

#[test]
fn blocked_import_and_statement_eval_are_both_reported() {
    let source = format!("import os\n{VALID_MODEL_SOURCE}eval(\"1+1\")\n");
    let eval_line = source.lines().count();
    let run = verify_bytes("models/u1/scenario-b.zip", source_zip(&source));
    let report = &run.report;
    assert!(!report.verified);
    assert_eq!(run.status(), VerificationStatus::Invalid);
    let errors = &report.overall_errors;
    assert!(errors.contains(&"DISALLOWED_IMPORT: Disallowed import 'os' found at line 1".to_string()));
    assert!(errors.contains(&format!(
        "DANGEROUS_PATTERN: Dangerous code pattern 'eval' found at line {eval_line}"
    )));
    assert!(errors.contains(&format!(
        "DISALLOWED_BUILTIN: Disallowed builtin function 'eval' called at line {eval_line}"
    )));
    assert!(!report.checks.contains_key("code_safety_scan"));
}

#[test]
fn missing_entry_type_is_a_contract_failure() {
    let source = "class Strategy:\n    def predict(self, stock_prices, volume, timestamps):\n        \
                  return {}\n";
    let run = verify_bytes("m.zip", source_zip(source));
    assert_eq!(
        error_of(&run.report, "MISSING_REQUIRED_CLASS"),
        "model.py must contain a class named 'TradingModel'"
    );
}

#[test]
fn renamed_parameters_warn_without_failing() {
    let source = "class TradingModel:\n    def predict(self, prices, volume, timestamps):\n        \
                  return {}\n";
    let run = verify_bytes("m.zip", source_zip(source));
    let report = &run.report;
    assert!(report.verified, "{:?}", report.overall_errors);
    let warning = &report.checks["METHOD_SIGNATURE_MISMATCH"];
    assert!(warning.passed);
    assert_eq!(
        warning.warning.as_deref(),
        Some("predict() parameter mismatch. Expected 'stock_prices' but found 'prices'")
    );
}

#[test]
fn missing_entry_file_fails_structure() {
    let bytes = zip_bytes(&[("metadata.json", VALID_SOURCE_METADATA.as_bytes())]);
    let run = verify_bytes("models/u1/incomplete.zip", bytes);
    let report = &run.report;
    assert_eq!(
        error_of(report, "MISSING_REQUIRED_FILES"),
        "Model package missing required files: model.py"
    );
    assert_eq!(report.model_id, "incomplete");
}

#[test]
fn metadata_failures_keep_the_declared_model_id() {
    let metadata = r#"{
        "model_id": "bad-meta",
        "version": 1,
        "author": "a",
        "expected_inputs": {"stock_prices": [], "volume": [], "timestamps": []},
        "output_format": {"signal": "", "confidence": 0}
    }"#;
    let bytes = zip_bytes(&[
        ("model.py", VALID_MODEL_SOURCE.as_bytes()),
        ("metadata.json", metadata.as_bytes()),
    ]);
    let run = verify_bytes("m.zip", bytes);
    let report = &run.report;
    assert_eq!(report.model_id, "bad-meta");
    assert_eq!(error_of(report, "INVALID_VERSION"), "version must be a string (e.g., '1.0.0')");
    assert!(!report.checks.contains_key("class_structure_validation"));
}

#[test]
fn corrupt_archive_fails_extraction() {
    let run = verify_bytes("models/u1/broken.zip", b"not a zip".to_vec());
    let report = &run.report;
    assert!(error_of(report, "INVALID_ARCHIVE").starts_with("Failed to extract archive: "));
    assert_eq!(report.model_id, "broken");
}

#[test]
fn retrieval_ceiling_applies_to_actual_bytes() {
    let policy = PolicyConfig {
        limits: ArtifactLimits {
            max_artifact_bytes: 64,
            ..ArtifactLimits::default()
        },
        ..PolicyConfig::default()
    };
    let (verifier, _audit) = verifier_with(policy);
    let bytes = source_zip(VALID_MODEL_SOURCE);
    let run = verifier.verify(&location("m.zip", 10), &MemorySource::new(bytes));
    let report = &run.report;
    assert!(report.checks["file_size_validation"].passed);
    assert!(error_of(report, "ARTIFACT_UNREADABLE").starts_with("Failed to read model file: "));
    assert!(run.artifact_sha256.is_none());
}

// ============================================================================
// SECTION: Bytecode Track
// ============================================================================

#[test]
fn valid_jar_is_verified() {
    let primary = ClassFileBuilder::model(MODEL_CLASS).build();
    let run = verify_bytes("models/u2/momentum.jar", model_jar(&primary, &[]));
    let report = &run.report;
    assert!(report.verified, "{:?}", report.overall_errors);
    assert_eq!(report.model_id, "java-momentum");
    assert_eq!(
        check_names(report),
        vec![
            "classFileValid",
            "fileReadable",
            "fileSize",
            "hasSimulateStep",
            "implementsInterface",
            "jarExtraction",
            "jarStructure",
            "metadataValid",
            "modelClassPresent",
            "securityScan",
        ]
    );
}

#[test]
fn blocked_reference_in_primary_class_fails_scan() {
    let primary = ClassFileBuilder::model(MODEL_CLASS)
        .method_ref("java/lang/Runtime", "exec", "(Ljava/lang/String;)Ljava/lang/Process;")
        .build();
    let run = verify_bytes("m.jar", model_jar(&primary, &[]));
    assert_eq!(
        error_of(&run.report, "securityScan"),
        "Blocked class: java/lang/Runtime; Blocked method: java/lang/Runtime.exec"
    );
}

#[test]
fn helper_class_findings_are_warnings_only() {
    let primary = ClassFileBuilder::model(MODEL_CLASS).build();
    let helper = ClassFileBuilder::new("com/example/Util").class_ref("java/lang/Thread").build();
    let bytes = model_jar(&primary, &[("com/example/Util.class", helper.as_slice())]);
    let (verifier, audit) = verifier();
    let size = u64::try_from(bytes.len()).unwrap();
    let run = verifier.verify(&location("m.jar", size), &MemorySource::new(bytes));
    let report = &run.report;
    assert!(report.verified, "{:?}", report.overall_errors);
    let helper_check = &report.checks["helperScan:com/example/Util.class"];
    assert!(helper_check.passed);
    assert_eq!(helper_check.warning.as_deref(), Some("Blocked class: java/lang/Thread"));
    assert!(audit.labels().contains(&"helper_violation"));
}

#[test]
fn helper_blocked_method_is_a_warning_only() {
    let primary = ClassFileBuilder::model(MODEL_CLASS).build();
    let helper = ClassFileBuilder::new("com/example/Shutdown")
        .method_ref("java/lang/System", "exit", "(I)V")
        .build();
    let bytes = model_jar(&primary, &[("com/example/Shutdown.class", helper.as_slice())]);
    let (verifier, audit) = verifier();
    let size = u64::try_from(bytes.len()).unwrap();
    let run = verifier.verify(&location("m.jar", size), &MemorySource::new(bytes));
    let report = &run.report;
    assert!(report.verified, "{:?}", report.overall_errors);
    assert!(report.checks["securityScan"].passed);
    let helper_check = &report.checks["helperScan:com/example/Shutdown.class"];
    assert!(helper_check.passed);
    assert_eq!(helper_check.warning.as_deref(), Some("Blocked method: java/lang/System.exit"));
    assert!(audit.labels().contains(&"helper_violation"));
}

#[test]
fn watched_fields_warn_on_the_scan_gate() {
    let primary = ClassFileBuilder::model(MODEL_CLASS)
        .field_ref("java/lang/System", "out", "Ljava/io/PrintStream;")
        .build();
    let run = verify_bytes("m.jar", model_jar(&primary, &[]));
    let scan = &run.report.checks["securityScan"];
    assert!(run.report.verified);
    assert_eq!(
        scan.warning.as_deref(),
        Some("Access to field 'java/lang/System.out' detected (may be for logging)")
    );
}

#[test]
fn jar_without_metadata_fails_structure() {
    let primary = ClassFileBuilder::model(MODEL_CLASS).build();
    let bytes = zip_bytes(&[("com/example/MomentumModel.class", primary.as_slice())]);
    let run = verify_bytes("models/u2/NoMeta.jar", bytes);
    let report = &run.report;
    assert_eq!(error_of(report, "jarStructure"), "Missing required files: metadata.json");
    assert_eq!(report.model_id, "NoMeta");
}

#[test]
fn missing_model_class_is_reported_with_expected_path() {
    let other = ClassFileBuilder::model("com/example/Other").build();
    let bytes = zip_bytes(&[
        ("metadata.json", VALID_JAR_METADATA.as_bytes()),
        ("com/example/Other.class", other.as_slice()),
    ]);
    let run = verify_bytes("m.jar", bytes);
    assert_eq!(
        error_of(&run.report, "modelClassPresent"),
        "Model class 'com.example.MomentumModel' not found in JAR (expected \
         com/example/MomentumModel.class)"
    );
}

#[test]
fn unsupported_class_version_fails_parse_gate() {
    let primary = ClassFileBuilder::model(MODEL_CLASS).major_version(70).build();
    let run = verify_bytes("m.jar", model_jar(&primary, &[]));
    let message = error_of(&run.report, "classFileValid");
    assert!(
        message.starts_with("Cannot parse com/example/MomentumModel.class: unsupported class file"),
        "{message}"
    );
    assert!(!run.report.checks.contains_key("implementsInterface"));
}

#[test]
fn missing_interface_halts_before_method_check() {
    let primary = ClassFileBuilder::new(MODEL_CLASS).method("simulateStep", "()V").build();
    let run = verify_bytes("m.jar", model_jar(&primary, &[]));
    let report = &run.report;
    assert!(error_of(report, "implementsInterface").contains("Found interfaces: none"));
    assert!(!report.checks.contains_key("hasSimulateStep"));
}

#[test]
fn lone_class_file_is_the_primary_unit() {
    let bytes = ClassFileBuilder::model(MODEL_CLASS).build();
    let run = verify_bytes("uploads/models/MomentumModel.class", bytes);
    let report = &run.report;
    assert!(report.verified, "{:?}", report.overall_errors);
    assert_eq!(report.model_id, "MomentumModel");
    assert_eq!(
        check_names(report),
        vec![
            "classFileValid",
            "fileReadable",
            "fileSize",
            "hasSimulateStep",
            "implementsInterface",
            "modelClassPresent",
            "securityScan",
        ]
    );
}

// ============================================================================
// SECTION: Concurrency
// ============================================================================

#[test]
fn one_verifier_serves_concurrent_runs() {
    let (verifier, _audit): (Verifier, _) = verifier();
    let source_bytes = source_zip(VALID_MODEL_SOURCE);
    let jar_bytes = model_jar(&ClassFileBuilder::model(MODEL_CLASS).build(), &[]);
    let (source_run, jar_run) = thread::scope(|scope| {
        let source_task = scope.spawn(|| {
            let size = u64::try_from(source_bytes.len()).unwrap();
            verifier.verify(&location("a.zip", size), &MemorySource::new(source_bytes.clone()))
        });
        let jar_task = scope.spawn(|| {
            let size = u64::try_from(jar_bytes.len()).unwrap();
            verifier.verify(&location("b.jar", size), &MemorySource::new(jar_bytes.clone()))
        });
        (source_task.join().unwrap(), jar_task.join().unwrap())
    });
    assert!(source_run.report.verified);
    assert!(jar_run.report.verified);
}
