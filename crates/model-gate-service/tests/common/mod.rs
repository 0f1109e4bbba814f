// crates/model-gate-service/tests/common/mod.rs
// ============================================================================
// Module: Service Test Fixtures
// Description: Sample submissions, storage events, and collaborator doubles.
// Purpose: Provide reusable fixtures for service-level verification tests.
// Dependencies: model-gate-core, model-gate-service, zip
// ============================================================================

//! ## Overview
//! Fixtures write real archives to a temporary storage root so the service
//! runs through the same filesystem source used by the CLI.

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Cursor;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use model_gate_core::ArtifactLocation;
use model_gate_core::ArtifactSource;
use model_gate_core::FixedClock;
use model_gate_core::InMemoryVerificationSink;
use model_gate_core::PolicyConfig;
use model_gate_core::RecordingAuditSink;
use model_gate_core::RegistryRecord;
use model_gate_core::SinkError;
use model_gate_core::SourceError;
use model_gate_core::UploadStatusUpdate;
use model_gate_core::VerificationSink;
use model_gate_core::Verifier;
use model_gate_service::FsArtifactSource;
use model_gate_service::VerifyService;
use time::OffsetDateTime;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

// ============================================================================
// SECTION: Sample Submissions
// ============================================================================

/// Source model satisfying the default entry contract and policy.
pub const VALID_MODEL_SOURCE: &str = "\
import numpy as np
from typing import Dict, List


class TradingModel:
    def __init__(self):
        self.window = 5

    def predict(self, stock_prices, volume, timestamps):
        recent = stock_prices[-self.window:]
        mean = np.mean(recent)
        signal = 'BUY' if stock_prices[-1] > mean else 'SELL'
        return {'signal': signal, 'confidence': 0.75}
";

/// Metadata satisfying the source-track schema.
pub const VALID_SOURCE_METADATA: &str = r#"{
  "model_id": "momentum-v1",
  "version": "1.0.0",
  "author": "quant-team",
  "expected_inputs": {"stock_prices": "list", "volume": "list", "timestamps": "list"},
  "output_format": {"signal": "str", "confidence": "float"}
}"#;

/// Builds a stored zip holding a source bundle around `model_source`.
pub fn source_zip(model_source: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, text) in [("model.py", model_source), ("metadata.json", VALID_SOURCE_METADATA)] {
        writer.start_file(name, options).unwrap();
        writer.write_all(text.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Writes `bytes` beneath `root` at `key` and returns its location.
pub fn stage_artifact(root: &Path, key: &str, bytes: &[u8]) -> ArtifactLocation {
    let path = root.join(key);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    ArtifactLocation {
        bucket: "uploads".to_string(),
        key: key.to_string(),
        declared_size: u64::try_from(bytes.len()).unwrap(),
    }
}

/// Renders an upload notification for one object.
pub fn storage_event(bucket: &str, key: &str, size: u64) -> String {
    serde_json::json!({
        "Records": [{
            "s3": {
                "bucket": {"name": bucket},
                "object": {"key": key, "size": size}
            }
        }]
    })
    .to_string()
}

// ============================================================================
// SECTION: Collaborator Doubles
// ============================================================================

/// Service wired to in-memory collaborators.
pub struct Harness {
    /// Service under test.
    pub service: VerifyService,
    /// Registry double; unused when an explicit sink is supplied.
    pub sink: InMemoryVerificationSink,
    /// Audit recorder.
    pub audit: RecordingAuditSink,
}

/// Builds a harness over explicit source and registry collaborators.
pub fn harness_with(source: Arc<dyn ArtifactSource>, sink: Arc<dyn VerificationSink>) -> Harness {
    let audit = RecordingAuditSink::new();
    let verifier = Verifier::new(
        Arc::new(PolicyConfig::default()),
        Arc::new(FixedClock::new(OffsetDateTime::UNIX_EPOCH)),
        Arc::new(audit.clone()),
    );
    Harness {
        service: VerifyService::new(verifier, source, sink, Arc::new(audit.clone())),
        sink: InMemoryVerificationSink::new(),
        audit,
    }
}

/// Builds a harness reading from a filesystem root with an in-memory registry.
pub fn harness(root: &Path) -> Harness {
    let audit = RecordingAuditSink::new();
    let sink = InMemoryVerificationSink::new();
    let verifier = Verifier::new(
        Arc::new(PolicyConfig::default()),
        Arc::new(FixedClock::new(OffsetDateTime::UNIX_EPOCH)),
        Arc::new(audit.clone()),
    );
    Harness {
        service: VerifyService::new(
            verifier,
            Arc::new(FsArtifactSource::new(root)),
            Arc::new(sink.clone()),
            Arc::new(audit.clone()),
        ),
        sink,
        audit,
    }
}

/// Source that aborts every fetch.
pub struct PanickingSource;

impl ArtifactSource for PanickingSource {
    fn fetch(&self, _location: &ArtifactLocation, _max_bytes: u64) -> Result<Vec<u8>, SourceError> {
        panic!("storage client invariant violated");
    }
}

/// Sink that rejects every write.
pub struct RejectingSink;

impl VerificationSink for RejectingSink {
    fn upsert_result(&self, _record: &RegistryRecord) -> Result<(), SinkError> {
        Err(SinkError::Backend("table unavailable".to_string()))
    }

    fn update_upload_status(&self, _update: &UploadStatusUpdate) -> Result<(), SinkError> {
        Err(SinkError::Backend("table unavailable".to_string()))
    }
}
