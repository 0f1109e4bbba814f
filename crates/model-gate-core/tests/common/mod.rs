// crates/model-gate-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Archive builders, class-file builder, and pipeline doubles.
// Purpose: Provide reusable fixtures for deterministic verification tests.
// Dependencies: model-gate-core, flate2, tar, zip
// ============================================================================

//! ## Overview
//! Builds real zip, tar+gzip, and class-file bytes so tests exercise the
//! same parsers production inputs go through.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unwrap_in_result,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::io::Cursor;
use std::io::Write;
use std::sync::Arc;

use flate2::Compression;
use flate2::write::GzEncoder;
use model_gate_core::ArtifactLocation;
use model_gate_core::ArtifactSource;
use model_gate_core::FixedClock;
use model_gate_core::PolicyConfig;
use model_gate_core::RecordingAuditSink;
use model_gate_core::SourceError;
use model_gate_core::Verifier;
use model_gate_core::VerificationRun;
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

/// Metadata satisfying the bytecode-track schema.
pub const VALID_JAR_METADATA: &str = r#"{
  "model_id": "java-momentum",
  "version": "2.1.0",
  "author": "quant-team",
  "model_class": "com.example.MomentumModel"
}"#;

/// Internal name of the default required interface.
pub const MODEL_INTERFACE: &str = "com/ttsudio/alphaback/Model";
/// Default required method descriptor.
pub const SIMULATE_STEP: &str = "(Lcom/ttsudio/alphaback/State;)Ljava/util/List;";

// ============================================================================
// SECTION: Archive Builders
// ============================================================================

/// Builds a stored zip archive from `(name, bytes)` entries.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, bytes) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Builds a gzip-compressed tar archive from `(name, bytes)` entries.
pub fn tar_gz_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, bytes) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(u64::try_from(bytes.len()).unwrap());
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *bytes).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Builds a valid source bundle zip around `model_source`.
pub fn source_zip(model_source: &str) -> Vec<u8> {
    zip_bytes(&[
        ("model.py", model_source.as_bytes()),
        ("metadata.json", VALID_SOURCE_METADATA.as_bytes()),
    ])
}

// ============================================================================
// SECTION: Class File Builder
// ============================================================================

/// Constant pool under construction.
#[derive(Default)]
struct PoolBuilder {
    /// Encoded entries.
    bytes: Vec<u8>,
    /// Next free index.
    next: u16,
    /// Interned text constants.
    utf8: HashMap<String, u16>,
    /// Interned class constants.
    classes: HashMap<String, u16>,
}

impl PoolBuilder {
    /// Creates a pool whose first free index is 1.
    fn new() -> Self {
        Self {
            next: 1,
            ..Self::default()
        }
    }

    /// Appends an encoded entry and returns its index.
    fn push(&mut self, encoded: &[u8]) -> u16 {
        self.bytes.extend_from_slice(encoded);
        let index = self.next;
        self.next += 1;
        index
    }

    /// Interns a text constant.
    fn utf8(&mut self, text: &str) -> u16 {
        if let Some(index) = self.utf8.get(text) {
            return *index;
        }
        let mut encoded = vec![1];
        encoded.extend_from_slice(&u16::try_from(text.len()).unwrap().to_be_bytes());
        encoded.extend_from_slice(text.as_bytes());
        let index = self.push(&encoded);
        self.utf8.insert(text.to_string(), index);
        index
    }

    /// Interns a class constant.
    fn class(&mut self, name: &str) -> u16 {
        if let Some(index) = self.classes.get(name) {
            return *index;
        }
        let name_index = self.utf8(name);
        let mut encoded = vec![7];
        encoded.extend_from_slice(&name_index.to_be_bytes());
        let index = self.push(&encoded);
        self.classes.insert(name.to_string(), index);
        index
    }

    /// Adds a member reference with its name-and-type entry.
    fn member(&mut self, tag: u8, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(owner);
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        let mut name_and_type = vec![12];
        name_and_type.extend_from_slice(&name.to_be_bytes());
        name_and_type.extend_from_slice(&descriptor.to_be_bytes());
        let name_and_type = self.push(&name_and_type);
        let mut encoded = vec![tag];
        encoded.extend_from_slice(&class.to_be_bytes());
        encoded.extend_from_slice(&name_and_type.to_be_bytes());
        self.push(&encoded)
    }
}

/// Reference added to the constant pool.
enum Reference {
    /// Class constant.
    Class(String),
    /// Field reference: owner, name, descriptor.
    Field(String, String, String),
    /// Method reference: owner, name, descriptor.
    Method(String, String, String),
    /// Interface method reference: owner, name, descriptor.
    InterfaceMethod(String, String, String),
}

/// Emits minimal but structurally valid class files.
pub struct ClassFileBuilder {
    /// Internal name of the class.
    this_class: String,
    /// Internal name of the superclass.
    super_class: String,
    /// Declared interfaces.
    interfaces: Vec<String>,
    /// Declared methods as name and descriptor.
    methods: Vec<(String, String)>,
    /// Extra constant-pool references in insertion order.
    references: Vec<Reference>,
    /// Class-file major version.
    major_version: u16,
}

impl ClassFileBuilder {
    /// Starts a class with the given internal name extending `java/lang/Object`.
    pub fn new(this_class: &str) -> Self {
        Self {
            this_class: this_class.to_string(),
            super_class: "java/lang/Object".to_string(),
            interfaces: Vec::new(),
            methods: Vec::new(),
            references: Vec::new(),
            major_version: 61,
        }
    }

    /// Builds a class implementing the default model contract.
    pub fn model(this_class: &str) -> Self {
        Self::new(this_class).implements(MODEL_INTERFACE).method("simulateStep", SIMULATE_STEP)
    }

    /// Declares an interface.
    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    /// Declares a method.
    pub fn method(mut self, name: &str, descriptor: &str) -> Self {
        self.methods.push((name.to_string(), descriptor.to_string()));
        self
    }

    /// Overrides the major version.
    pub fn major_version(mut self, major: u16) -> Self {
        self.major_version = major;
        self
    }

    /// Adds a class constant.
    pub fn class_ref(mut self, name: &str) -> Self {
        self.references.push(Reference::Class(name.to_string()));
        self
    }

    /// Adds a field reference.
    pub fn field_ref(mut self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.references.push(Reference::Field(
            owner.to_string(),
            name.to_string(),
            descriptor.to_string(),
        ));
        self
    }

    /// Adds a method reference.
    pub fn method_ref(mut self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.references.push(Reference::Method(
            owner.to_string(),
            name.to_string(),
            descriptor.to_string(),
        ));
        self
    }

    /// Adds an interface method reference.
    pub fn interface_method_ref(mut self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.references.push(Reference::InterfaceMethod(
            owner.to_string(),
            name.to_string(),
            descriptor.to_string(),
        ));
        self
    }

    /// Encodes the class file.
    pub fn build(&self) -> Vec<u8> {
        let mut pool = PoolBuilder::new();
        let this_index = pool.class(&self.this_class);
        let super_index = pool.class(&self.super_class);
        let interface_indexes: Vec<u16> =
            self.interfaces.iter().map(|name| pool.class(name)).collect();
        for reference in &self.references {
            match reference {
                Reference::Class(name) => {
                    pool.class(name);
                }
                Reference::Field(owner, name, descriptor) => {
                    pool.member(9, owner, name, descriptor);
                }
                Reference::Method(owner, name, descriptor) => {
                    pool.member(10, owner, name, descriptor);
                }
                Reference::InterfaceMethod(owner, name, descriptor) => {
                    pool.member(11, owner, name, descriptor);
                }
            }
        }
        let method_indexes: Vec<(u16, u16)> = self
            .methods
            .iter()
            .map(|(name, descriptor)| (pool.utf8(name), pool.utf8(descriptor)))
            .collect();

        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFE_BABE_u32.to_be_bytes());
        out.extend_from_slice(&0_u16.to_be_bytes());
        out.extend_from_slice(&self.major_version.to_be_bytes());
        out.extend_from_slice(&pool.next.to_be_bytes());
        out.extend_from_slice(&pool.bytes);
        out.extend_from_slice(&0x0021_u16.to_be_bytes());
        out.extend_from_slice(&this_index.to_be_bytes());
        out.extend_from_slice(&super_index.to_be_bytes());
        out.extend_from_slice(&u16::try_from(interface_indexes.len()).unwrap().to_be_bytes());
        for index in interface_indexes {
            out.extend_from_slice(&index.to_be_bytes());
        }
        out.extend_from_slice(&0_u16.to_be_bytes());
        out.extend_from_slice(&u16::try_from(method_indexes.len()).unwrap().to_be_bytes());
        for (name, descriptor) in method_indexes {
            out.extend_from_slice(&0x0001_u16.to_be_bytes());
            out.extend_from_slice(&name.to_be_bytes());
            out.extend_from_slice(&descriptor.to_be_bytes());
            out.extend_from_slice(&0_u16.to_be_bytes());
        }
        out.extend_from_slice(&0_u16.to_be_bytes());
        out
    }
}

/// Builds a jar with metadata, the primary class, and any extra entries.
pub fn model_jar(primary: &[u8], extra: &[(&str, &[u8])]) -> Vec<u8> {
    let mut entries: Vec<(&str, &[u8])> = vec![
        ("META-INF/MANIFEST.MF", &b"Manifest-Version: 1.0\n"[..]),
        ("metadata.json", VALID_JAR_METADATA.as_bytes()),
        ("com/example/MomentumModel.class", primary),
    ];
    entries.extend_from_slice(extra);
    zip_bytes(&entries)
}

// ============================================================================
// SECTION: Pipeline Doubles
// ============================================================================

/// Artifact source serving fixed bytes for every location.
pub struct MemorySource {
    /// Bytes returned by every fetch.
    bytes: Vec<u8>,
}

impl MemorySource {
    /// Creates a source serving `bytes`.
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
        }
    }
}

impl ArtifactSource for MemorySource {
    fn fetch(&self, location: &ArtifactLocation, max_bytes: u64) -> Result<Vec<u8>, SourceError> {
        let actual_bytes = u64::try_from(self.bytes.len()).unwrap();
        if actual_bytes > max_bytes {
            return Err(SourceError::TooLarge {
                path: location.key.clone(),
                max_bytes,
                actual_bytes,
            });
        }
        Ok(self.bytes.clone())
    }
}

/// Builds a verifier with the default policy, a frozen clock, and a recorder.
pub fn verifier() -> (Verifier, RecordingAuditSink) {
    verifier_with(PolicyConfig::default())
}

/// Builds a verifier with `policy`, a frozen clock, and a recorder.
pub fn verifier_with(policy: PolicyConfig) -> (Verifier, RecordingAuditSink) {
    let audit = RecordingAuditSink::new();
    let verifier = Verifier::new(
        Arc::new(policy),
        Arc::new(FixedClock::new(OffsetDateTime::UNIX_EPOCH)),
        Arc::new(audit.clone()),
    );
    (verifier, audit)
}

/// Verifies `bytes` declared at `key` with the default policy.
pub fn verify_bytes(key: &str, bytes: Vec<u8>) -> VerificationRun {
    let (verifier, _audit) = verifier();
    let location = location(key, u64::try_from(bytes.len()).unwrap());
    verifier.verify(&location, &MemorySource::new(bytes))
}

/// Builds a location in the `uploads` bucket.
pub fn location(key: &str, declared_size: u64) -> ArtifactLocation {
    ArtifactLocation {
        bucket: "uploads".to_string(),
        key: key.to_string(),
        declared_size,
    }
}
