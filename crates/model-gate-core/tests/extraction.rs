// crates/model-gate-core/tests/extraction.rs
// ============================================================================
// Module: Extraction Tests
// Description: Container selection, entry keying, and extraction ceilings.
// ============================================================================
//! ## Overview
//! Validates that extraction is suffix-driven, bounded, and rejects unsafe
//! entries before anything reaches the validators.

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

use common::tar_gz_bytes;
use common::zip_bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use model_gate_core::ArtifactLimits;
use model_gate_core::ContainerFamily;
use model_gate_core::ExtractionError;
use model_gate_core::SubmissionKind;
use model_gate_core::Track;
use model_gate_core::extract;

fn limits() -> ArtifactLimits {
    ArtifactLimits::default()
}

#[test]
fn track_selection_is_a_function_of_the_suffix() {
    assert_eq!(
        SubmissionKind::from_path("models/u1/valid_model.tar.gz"),
        SubmissionKind::SourceBundle(ContainerFamily::TarGzip)
    );
    assert_eq!(
        SubmissionKind::from_path("m.TGZ"),
        SubmissionKind::SourceBundle(ContainerFamily::TarGzip)
    );
    assert_eq!(
        SubmissionKind::from_path("m.zip"),
        SubmissionKind::SourceBundle(ContainerFamily::Zip)
    );
    assert_eq!(SubmissionKind::from_path("m.jar").track(), Track::Bytecode);
    assert_eq!(SubmissionKind::from_path("a/B.class").track(), Track::Bytecode);
    assert_eq!(SubmissionKind::from_path("model.py").track(), Track::Source);
    assert_eq!(SubmissionKind::from_path("model.py"), SubmissionKind::Unsupported);
}

#[test]
fn source_zip_flattens_to_basenames_and_skips_directories() {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    writer.add_directory("pkg/", options).unwrap();
    writer.start_file("pkg/model.py", options).unwrap();
    std::io::Write::write_all(&mut writer, b"x = 1\n").unwrap();
    writer.start_file("metadata.json", options).unwrap();
    std::io::Write::write_all(&mut writer, b"{}").unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    let bundle = extract(&bytes, "uploads/m.zip", &limits()).unwrap();
    assert_eq!(bundle.len(), 2);
    assert_eq!(bundle.get("model.py"), Some(&b"x = 1\n"[..]));
    assert!(bundle.contains("metadata.json"));
    assert!(!bundle.contains("pkg/"));
}

#[test]
fn tar_gz_bundle_is_extracted() {
    let bytes = tar_gz_bytes(&[
        ("nested/model.py", "pass\n".as_bytes()),
        ("metadata.json", "{}".as_bytes()),
    ]);
    let bundle = extract(&bytes, "valid_model.tar.gz", &limits()).unwrap();
    let paths: Vec<&str> = bundle.iter().map(|(path, _)| path).collect();
    assert_eq!(paths, vec!["metadata.json", "model.py"]);
}

#[test]
fn jar_keeps_full_paths() {
    let bytes = zip_bytes(&[
        ("com/example/Model.class", &[0xCA_u8, 0xFE][..]),
        ("metadata.json", "{}".as_bytes()),
    ]);
    let bundle = extract(&bytes, "model.jar", &limits()).unwrap();
    assert!(bundle.contains("com/example/Model.class"));
    assert!(!bundle.contains("Model.class"));
}

#[test]
fn single_class_becomes_one_entry_bundle() {
    let bundle = extract(b"\xCA\xFE\xBA\xBE", "uploads/models/MyModel.class", &limits()).unwrap();
    assert_eq!(bundle.len(), 1);
    assert!(bundle.contains("MyModel.class"));
}

#[test]
fn unsupported_suffix_is_rejected() {
    let err = extract(b"data", "model.rar", &limits()).unwrap_err();
    assert_eq!(err, ExtractionError::Unsupported("model.rar".to_string()));
}

#[test]
fn traversal_entries_are_unsafe() {
    let bytes = zip_bytes(&[("../escape.py", "x".as_bytes())]);
    let err = extract(&bytes, "m.zip", &limits()).unwrap_err();
    assert!(matches!(err, ExtractionError::UnsafePath(path) if path == "../escape.py"));
}

#[test]
fn duplicate_basenames_are_rejected() {
    let bytes = zip_bytes(&[("a/model.py", "1".as_bytes()), ("b/model.py", "2".as_bytes())]);
    let err = extract(&bytes, "m.zip", &limits()).unwrap_err();
    assert_eq!(err, ExtractionError::DuplicateEntry("model.py".to_string()));
}

#[test]
fn entry_ceiling_is_enforced() {
    let bytes = zip_bytes(&[
        ("a.py", "1".as_bytes()),
        ("b.py", "2".as_bytes()),
        ("c.py", "3".as_bytes()),
    ]);
    let limits = ArtifactLimits {
        max_archive_entries: 2,
        ..ArtifactLimits::default()
    };
    let err = extract(&bytes, "m.zip", &limits).unwrap_err();
    assert!(matches!(err, ExtractionError::LimitExceeded(_)), "{err:?}");
}

#[test]
fn expanded_size_ceiling_is_enforced() {
    let big = vec![b'a'; 4096];
    let bytes = tar_gz_bytes(&[("model.py", big.as_slice())]);
    let limits = ArtifactLimits {
        max_extracted_bytes: 1024,
        ..ArtifactLimits::default()
    };
    let err = extract(&bytes, "m.tgz", &limits).unwrap_err();
    assert!(matches!(err, ExtractionError::LimitExceeded(_)), "{err:?}");
}

#[test]
fn skipped_entry_bodies_count_toward_expanded_size() {
    let padding = vec![0_u8; 4096];
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Directory);
    header.set_size(4096);
    header.set_mode(0o755);
    header.set_cksum();
    builder.append_data(&mut header, "padding/", padding.as_slice()).unwrap();
    let mut header = tar::Header::new_gnu();
    header.set_size(1);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, "model.py", &b"1"[..]).unwrap();
    let bytes = builder.into_inner().unwrap().finish().unwrap();

    let tight = ArtifactLimits {
        max_extracted_bytes: 1024,
        ..ArtifactLimits::default()
    };
    let err = extract(&bytes, "m.tar.gz", &tight).unwrap_err();
    assert!(matches!(err, ExtractionError::LimitExceeded(_)), "{err:?}");
    assert!(extract(&bytes, "m.tar.gz", &limits()).is_ok());
}

#[test]
fn raw_artifact_ceiling_is_checked_before_reading() {
    let limits = ArtifactLimits {
        max_artifact_bytes: 3,
        ..ArtifactLimits::default()
    };
    let err = extract(b"four", "m.zip", &limits).unwrap_err();
    assert_eq!(
        err,
        ExtractionError::TooLarge {
            max_bytes: 3,
            actual_bytes: 4,
        }
    );
}

#[test]
fn corrupt_containers_are_reported() {
    assert!(matches!(
        extract(b"not a zip", "m.zip", &limits()).unwrap_err(),
        ExtractionError::Corrupt(_)
    ));
    assert!(matches!(
        extract(b"not gzip", "m.tar.gz", &limits()).unwrap_err(),
        ExtractionError::Corrupt(_)
    ));
}
