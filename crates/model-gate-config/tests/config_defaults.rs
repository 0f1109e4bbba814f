//! Default and loading tests for model-gate-config.
// crates/model-gate-config/tests/config_defaults.rs
// =============================================================================
// Module: Config Default Tests
// Description: Empty-file defaults, unknown keys, and file loading limits.
// Purpose: Ensure an empty file reproduces the shipped admission rules.
// =============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::fs;

use model_gate_config::AuditConfig;
use model_gate_config::ConfigError;
use model_gate_config::MAX_CONFIG_FILE_SIZE;
use model_gate_config::ModelGateConfig;
use model_gate_config::RegistryType;
use model_gate_config::StorageConfig;
use model_gate_core::PolicyConfig;
use tempfile::TempDir;

mod common;

#[test]
fn empty_file_yields_default_policy() {
    let config = ModelGateConfig::parse("").unwrap();
    assert_eq!(config.policy(), PolicyConfig::default());
    assert_eq!(config.limits.max_artifact_bytes, 10_485_760);
    assert_eq!(config.limits.max_extracted_bytes, 52_428_800);
    assert_eq!(config.limits.max_archive_entries, 4_096);
    assert_eq!(config.source.entry_type, "TradingModel");
    assert_eq!(config.bytecode.required_method, "simulateStep");
    assert!(matches!(config.storage, StorageConfig::Filesystem(_)));
    assert_eq!(config.registry.registry_type, RegistryType::Memory);
    assert_eq!(config.audit, AuditConfig::default());
}

#[test]
fn partial_sections_keep_remaining_defaults() {
    let config = ModelGateConfig::parse(
        r#"
        [limits]
        max_artifact_bytes = 2048

        [source]
        allowed_namespaces = ["numpy", "scipy"]
        "#,
    )
    .unwrap();
    assert_eq!(config.limits.max_artifact_bytes, 2048);
    assert_eq!(config.limits.max_archive_entries, 4_096);
    assert!(config.source.allowed_namespaces.contains("scipy"));
    assert!(!config.source.allowed_namespaces.contains("pandas"));
    assert_eq!(config.source.entry_method, "predict");
}

#[test]
fn unknown_keys_are_rejected_in_every_section() {
    for text in [
        "unexpected = 1",
        "[limits]\nmax_bytes = 1",
        "[source]\nentry = \"x\"",
        "[bytecode]\ninterface = \"x\"",
        "[storage]\ntype = \"filesystem\"\nbucket = \"x\"",
        "[registry]\nfile = \"x\"",
        "[audit]\nsink = \"file\"",
    ] {
        let err = ModelGateConfig::parse(text).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{text}: {err}");
    }
}

#[test]
fn effective_config_round_trips_through_toml() {
    let config = ModelGateConfig::parse(
        r#"
        [storage]
        type = "s3"
        region = "us-east-1"
        endpoint = "https://minio.internal"
        force_path_style = true

        [registry]
        type = "sqlite"
        path = "data/registry.db"
        journal_mode = "delete"
        "#,
    )
    .unwrap();
    let rendered = config.to_toml().unwrap();
    let reparsed = ModelGateConfig::parse(&rendered).unwrap();
    assert_eq!(reparsed, config);
}

#[test]
fn load_reads_explicit_path() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("model-gate.toml");
    fs::write(&path, "[audit]\nenabled = false\n").unwrap();
    let config = ModelGateConfig::load(Some(&path)).unwrap();
    assert!(!config.audit.enabled);
}

#[test]
fn load_rejects_oversized_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("model-gate.toml");
    let mut text = String::from("# padding\n");
    text.push_str(&"#".repeat(MAX_CONFIG_FILE_SIZE));
    fs::write(&path, text).unwrap();
    let err = ModelGateConfig::load(Some(&path)).unwrap_err();
    assert_eq!(err.to_string(), "invalid config: config file exceeds size limit");
}

#[test]
fn load_rejects_non_utf8() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("model-gate.toml");
    fs::write(&path, [0xff_u8, 0xfe, 0x00]).unwrap();
    let err = ModelGateConfig::load(Some(&path)).unwrap_err();
    assert_eq!(err.to_string(), "invalid config: config file must be utf-8");
}

#[test]
fn load_reports_missing_file_as_io() {
    let temp = TempDir::new().unwrap();
    let err = ModelGateConfig::load(Some(&temp.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn load_or_default_keeps_explicit_path_strict() {
    let temp = TempDir::new().unwrap();
    let err = ModelGateConfig::load_or_default(Some(&temp.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn load_or_default_reads_explicit_path() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("model-gate.toml");
    fs::write(&path, "[audit]\nenabled = false\n").unwrap();
    let config = ModelGateConfig::load_or_default(Some(&path)).unwrap();
    assert!(!config.audit.enabled);
}

#[test]
fn load_validates_after_parsing() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("model-gate.toml");
    fs::write(&path, "[limits]\nmax_archive_entries = 0\n").unwrap();
    common::assert_invalid(
        ModelGateConfig::load(Some(&path)).map(|_| ()),
        "limits.max_archive_entries must be greater than zero",
    )
    .unwrap();
}
