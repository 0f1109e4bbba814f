// crates/model-gate-core/tests/source_scanner.rs
// ============================================================================
// Module: Source Scanner Tests
// Description: Policy scanning and entry-contract checks on model source.
// ============================================================================
//! ## Overview
//! Scans representative model sources end to end: parsing, category
//! grouping, line attribution, and the entry-type contract.

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

use common::VALID_MODEL_SOURCE;
use model_gate_core::SourcePolicy;
use model_gate_core::source::SourceScan;
use model_gate_core::source::ViolationCategory;
use model_gate_core::source::check_entry_contract;
use model_gate_core::source::contract::INVALID_SIGNATURE_CHECK;
use model_gate_core::source::contract::MISSING_CLASS_CHECK;
use model_gate_core::source::contract::MISSING_METHOD_CHECK;
use model_gate_core::source::contract::SYNTAX_ERROR_CHECK;
use model_gate_core::source::scan_source;

fn scan(source: &str) -> SourceScan {
    scan_source(source, &SourcePolicy::default()).unwrap()
}

fn messages(scan: &SourceScan, category: ViolationCategory) -> Vec<String> {
    scan.in_category(category).map(|violation| violation.message.clone()).collect()
}

// ============================================================================
// SECTION: Scanner
// ============================================================================

#[test]
fn valid_model_is_clean() {
    assert!(scan(VALID_MODEL_SOURCE).is_clean());
}

#[test]
fn allowed_submodule_imports_are_clean() {
    assert!(scan("from numpy.linalg import norm\nimport collections.abc\n").is_clean());
}

#[test]
fn blocked_imports_hit_both_import_categories() {
    let scan = scan("import os\nimport requests.adapters\n");
    assert_eq!(
        messages(&scan, ViolationCategory::DisallowedImport),
        vec![
            "Disallowed import 'os' found at line 1".to_string(),
            "Disallowed import 'requests' found at line 2".to_string(),
        ]
    );
    assert_eq!(
        messages(&scan, ViolationCategory::ImportNotWhitelisted),
        vec![
            "Import 'os' at line 1 is not in the allowed list".to_string(),
            "Import 'requests' at line 2 is not in the allowed list".to_string(),
        ]
    );
}

#[test]
fn unlisted_import_is_not_whitelisted_only() {
    let scan = scan("import numpy\nfrom scipy import stats\n");
    assert_eq!(messages(&scan, ViolationCategory::DisallowedImport), Vec::<String>::new());
    assert_eq!(
        messages(&scan, ViolationCategory::ImportNotWhitelisted),
        vec!["Import 'scipy' at line 2 is not in the allowed list".to_string()]
    );
}

#[test]
fn grouped_messages_follow_category_order() {
    let scan = scan("x = eval('1')\nimport os\n");
    let categories: Vec<ViolationCategory> =
        scan.grouped_messages().into_iter().map(|(category, _)| category).collect();
    assert_eq!(
        categories,
        vec![
            ViolationCategory::DisallowedImport,
            ViolationCategory::ImportNotWhitelisted,
            ViolationCategory::DisallowedBuiltin,
        ]
    );
}

#[test]
fn execution_primitive_as_statement_is_also_dangerous() {
    let scan = scan("value = 1\nexec('value = 2')\n");
    assert_eq!(
        messages(&scan, ViolationCategory::DisallowedBuiltin),
        vec!["Disallowed builtin function 'exec' called at line 2".to_string()]
    );
    assert_eq!(
        messages(&scan, ViolationCategory::DangerousPattern),
        vec!["Dangerous code pattern 'exec' found at line 2".to_string()]
    );
}

#[test]
fn execution_primitive_in_assignment_is_only_a_builtin_hit() {
    let scan = scan("result = eval('1 + 1')\n");
    assert_eq!(scan.violations.len(), 1);
    assert_eq!(scan.violations[0].category, ViolationCategory::DisallowedBuiltin);
}

#[test]
fn file_operations_are_receiver_agnostic() {
    let scan = scan("def load(path, frame):\n    handle = open(path)\n    frame.write(path)\n");
    let files = messages(&scan, ViolationCategory::DisallowedFileOperation);
    assert_eq!(
        files,
        vec![
            "File operation 'open()' found at line 2".to_string(),
            "File operation '.write()' found at line 3".to_string(),
        ]
    );
    assert_eq!(
        messages(&scan, ViolationCategory::DisallowedBuiltin),
        vec!["Disallowed builtin function 'open' called at line 2".to_string()]
    );
}

#[test]
fn network_operations_are_flagged_by_method_name() {
    let scan = scan("client.connect(address)\nreply = session.post(url, data)\n");
    assert_eq!(
        messages(&scan, ViolationCategory::DisallowedNetworkOperation),
        vec![
            "Network operation '.connect()' found at line 1".to_string(),
            "Network operation '.post()' found at line 2".to_string(),
        ]
    );
}

#[test]
fn reflective_attributes_are_dangerous() {
    let scan = scan("def peek(fn):\n    return fn.__globals__\n");
    assert_eq!(
        messages(&scan, ViolationCategory::DangerousPattern),
        vec!["Dangerous code pattern '.__globals__' found at line 2".to_string()]
    );
}

#[test]
fn dynamic_import_is_flagged_even_when_unblocked() {
    let mut policy = SourcePolicy::default();
    policy.blocked_operations.remove("__import__");
    let scan = scan_source("mod = __import__('os')\n", &policy).unwrap();
    assert_eq!(
        messages(&scan, ViolationCategory::DisallowedBuiltin),
        vec!["Disallowed builtin function '__import__' called at line 1".to_string()]
    );
}

#[test]
fn calls_inside_formatted_strings_are_scanned() {
    let scan = scan("label = f\"{eval('1')}\"\n");
    assert_eq!(
        messages(&scan, ViolationCategory::DisallowedBuiltin),
        vec!["Disallowed builtin function 'eval' called at line 1".to_string()]
    );
}

#[test]
fn unparsable_source_is_a_syntax_error() {
    let err = scan_source("def broken(:\n    pass\n", &SourcePolicy::default()).unwrap_err();
    assert_eq!(err.line, 1);
}

// ============================================================================
// SECTION: Entry Contract
// ============================================================================

#[test]
fn valid_model_satisfies_contract_without_warnings() {
    let outcome = check_entry_contract(VALID_MODEL_SOURCE, &SourcePolicy::default()).unwrap();
    assert_eq!(outcome.warning_message(), None);
}

#[test]
fn missing_entry_type_is_reported() {
    let source = "class Strategy:\n    def predict(self, a, b, c):\n        return {}\n";
    let violation = check_entry_contract(source, &SourcePolicy::default()).unwrap_err();
    assert_eq!(violation.check, MISSING_CLASS_CHECK);
    assert_eq!(violation.message, "model.py must contain a class named 'TradingModel'");
}

#[test]
fn missing_entry_method_is_reported() {
    let source = "class TradingModel:\n    def fit(self, data):\n        pass\n";
    let violation = check_entry_contract(source, &SourcePolicy::default()).unwrap_err();
    assert_eq!(violation.check, MISSING_METHOD_CHECK);
    assert_eq!(violation.message, "Class 'TradingModel' must have a method named 'predict'");
}

#[test]
fn short_parameter_list_is_invalid() {
    let source = "class TradingModel:\n    def predict(self, stock_prices):\n        pass\n";
    let violation = check_entry_contract(source, &SourcePolicy::default()).unwrap_err();
    assert_eq!(violation.check, INVALID_SIGNATURE_CHECK);
    assert_eq!(
        violation.message,
        "predict() method must accept parameters: self, stock_prices, volume, timestamps"
    );
}

#[test]
fn renamed_parameters_are_warnings() {
    let source =
        "class TradingModel:\n    def predict(this, prices, volume, ts, extra):\n        pass\n";
    let outcome = check_entry_contract(source, &SourcePolicy::default()).unwrap();
    assert_eq!(
        outcome.warnings,
        vec![
            "predict() parameter mismatch. Expected 'stock_prices' but found 'prices'".to_string(),
            "predict() parameter mismatch. Expected 'timestamps' but found 'ts'".to_string(),
        ]
    );
}

#[test]
fn contract_syntax_errors_name_the_entry_file() {
    let violation =
        check_entry_contract("class TradingModel\n    pass\n", &SourcePolicy::default())
            .unwrap_err();
    assert_eq!(violation.check, SYNTAX_ERROR_CHECK);
    assert!(violation.message.starts_with("model.py has syntax error at line 1: "));
}
