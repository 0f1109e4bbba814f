// crates/model-gate-core/src/extract/mod.rs
// ============================================================================
// Module: Model Gate Artifact Extractor
// Description: Bounded zip and tar+gzip unpacking into an artifact bundle.
// Purpose: Turn raw submission bytes into a path-to-bytes map without executing anything.
// Dependencies: flate2, tar, zip, thiserror
// ============================================================================

//! ## Overview
//! The container family is chosen from the declared path suffix, never from
//! content. Extraction enforces the artifact ceiling before reading, then an
//! entry-count ceiling and an expanded-byte ceiling while reading. Entry paths
//! are normalized; absolute paths, parent traversal, links, and device nodes
//! are rejected as unsafe. Directory entries are skipped.
//! Security posture: archive contents are untrusted and adversarial.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Cursor;
use std::io::Read;

use flate2::read::GzDecoder;
use thiserror::Error;

use crate::core::ArtifactBundle;
use crate::core::ArtifactLimits;
use crate::core::ContainerFamily;
use crate::core::SubmissionKind;
use crate::core::track::basename;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Unix file-type mask for zip external attributes.
const UNIX_FILE_TYPE_MASK: u32 = 0o170_000;
/// Unix symlink file type.
const UNIX_SYMLINK: u32 = 0o120_000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Extraction failures. Every variant is fatal for the run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// Declared path suffix names no supported container.
    #[error("unsupported container format for '{0}'")]
    Unsupported(String),
    /// Raw artifact exceeds the configured ceiling.
    #[error("artifact size {actual_bytes} bytes exceeds maximum {max_bytes} bytes")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: u64,
        /// Actual size in bytes.
        actual_bytes: u64,
    },
    /// Container is structurally invalid.
    #[error("corrupt archive: {0}")]
    Corrupt(String),
    /// Entry path or type is unsafe to materialize.
    #[error("unsafe archive entry '{0}'")]
    UnsafePath(String),
    /// Two entries map to the same bundle path.
    #[error("duplicate archive entry '{0}'")]
    DuplicateEntry(String),
    /// Entry count or expanded size exceeded a ceiling.
    #[error("archive limit exceeded: {0}")]
    LimitExceeded(String),
}

// ============================================================================
// SECTION: Entry Keying
// ============================================================================

/// How extracted entries are keyed in the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKeying {
    /// Flatten to the final path segment.
    Basename,
    /// Keep the normalized relative path.
    FullPath,
}

impl EntryKeying {
    /// Returns the bundle key for a normalized entry path.
    fn key(self, normalized: &str) -> String {
        match self {
            Self::Basename => basename(normalized).to_string(),
            Self::FullPath => normalized.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Extracts `bytes` into a bundle using the container selected by `declared_path`.
///
/// Source bundles flatten entries to basenames, Java archives keep full
/// paths, and a lone `.class` becomes a one-entry bundle keyed by basename.
///
/// # Errors
///
/// Returns [`ExtractionError`] when the suffix is unsupported, a ceiling is
/// exceeded, the container is corrupt, or an entry is unsafe.
pub fn extract(
    bytes: &[u8],
    declared_path: &str,
    limits: &ArtifactLimits,
) -> Result<ArtifactBundle, ExtractionError> {
    let actual_bytes = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    if actual_bytes > limits.max_artifact_bytes {
        return Err(ExtractionError::TooLarge {
            max_bytes: limits.max_artifact_bytes,
            actual_bytes,
        });
    }
    match SubmissionKind::from_path(declared_path) {
        SubmissionKind::SourceBundle(ContainerFamily::Zip) => {
            extract_zip(bytes, limits, EntryKeying::Basename)
        }
        SubmissionKind::SourceBundle(ContainerFamily::TarGzip) => {
            extract_tar_gz(bytes, limits, EntryKeying::Basename)
        }
        SubmissionKind::JarBundle => extract_zip(bytes, limits, EntryKeying::FullPath),
        SubmissionKind::ClassFile => {
            let mut bundle = ArtifactBundle::new();
            bundle.insert(basename(declared_path).to_string(), bytes.to_vec());
            Ok(bundle)
        }
        SubmissionKind::Unsupported => {
            Err(ExtractionError::Unsupported(basename(declared_path).to_string()))
        }
    }
}

/// Extracts a zip-family container.
fn extract_zip(
    bytes: &[u8],
    limits: &ArtifactLimits,
    keying: EntryKeying,
) -> Result<ArtifactBundle, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| ExtractionError::Corrupt(err.to_string()))?;
    if archive.len() > limits.max_archive_entries {
        return Err(ExtractionError::LimitExceeded(format!(
            "{} entries (max {})",
            archive.len(),
            limits.max_archive_entries
        )));
    }
    let mut budget = ExpansionBudget::new(limits.max_extracted_bytes);
    let mut bundle = ArtifactBundle::new();
    for index in 0 .. archive.len() {
        let mut file =
            archive.by_index(index).map_err(|err| ExtractionError::Corrupt(err.to_string()))?;
        let raw_name = file.name().to_string();
        if file.is_dir() {
            continue;
        }
        if file.unix_mode().is_some_and(|mode| mode & UNIX_FILE_TYPE_MASK == UNIX_SYMLINK) {
            return Err(ExtractionError::UnsafePath(raw_name));
        }
        let normalized = normalize_entry_path(&raw_name)
            .ok_or_else(|| ExtractionError::UnsafePath(raw_name.clone()))?;
        let content = budget.read(&mut file)?;
        let key = keying.key(&normalized);
        if !bundle.insert(key.clone(), content) {
            return Err(ExtractionError::DuplicateEntry(key));
        }
    }
    Ok(bundle)
}

/// Extracts a tar stream wrapped in gzip.
fn extract_tar_gz(
    bytes: &[u8],
    limits: &ArtifactLimits,
    keying: EntryKeying,
) -> Result<ArtifactBundle, ExtractionError> {
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    let entries = archive.entries().map_err(|err| ExtractionError::Corrupt(err.to_string()))?;
    let mut budget = ExpansionBudget::new(limits.max_extracted_bytes);
    let mut bundle = ArtifactBundle::new();
    let mut entry_count = 0usize;
    for entry in entries {
        let mut entry = entry.map_err(|err| ExtractionError::Corrupt(err.to_string()))?;
        entry_count = entry_count.saturating_add(1);
        if entry_count > limits.max_archive_entries {
            return Err(ExtractionError::LimitExceeded(format!(
                "more than {} entries",
                limits.max_archive_entries
            )));
        }
        let raw_name = {
            let path = entry.path().map_err(|err| ExtractionError::Corrupt(err.to_string()))?;
            path.to_str()
                .map(str::to_string)
                .ok_or_else(|| ExtractionError::UnsafePath(path.to_string_lossy().into_owned()))?
        };
        let entry_type = entry.header().entry_type();
        if entry_type.is_symlink()
            || entry_type.is_hard_link()
            || entry_type.is_character_special()
            || entry_type.is_block_special()
            || entry_type.is_fifo()
        {
            return Err(ExtractionError::UnsafePath(raw_name));
        }
        if !entry_type.is_file() {
            // Skipped bodies are still decompressed while the reader advances.
            budget.charge(entry.size())?;
            continue;
        }
        let normalized = normalize_entry_path(&raw_name)
            .ok_or_else(|| ExtractionError::UnsafePath(raw_name.clone()))?;
        let content = budget.read(&mut entry)?;
        let key = keying.key(&normalized);
        if !bundle.insert(key.clone(), content) {
            return Err(ExtractionError::DuplicateEntry(key));
        }
    }
    Ok(bundle)
}

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Running total of expanded bytes across one archive.
struct ExpansionBudget {
    /// Bytes still available.
    remaining: u64,
    /// Configured ceiling, for messages.
    max_bytes: u64,
}

impl ExpansionBudget {
    /// Creates a budget with `max_bytes` available.
    const fn new(max_bytes: u64) -> Self {
        Self {
            remaining: max_bytes,
            max_bytes,
        }
    }

    /// Reads one entry to the end, charging it against the budget.
    fn read<R: Read>(&mut self, reader: &mut R) -> Result<Vec<u8>, ExtractionError> {
        let mut content = Vec::new();
        reader
            .take(self.remaining.saturating_add(1))
            .read_to_end(&mut content)
            .map_err(|err| ExtractionError::Corrupt(err.to_string()))?;
        self.charge(u64::try_from(content.len()).unwrap_or(u64::MAX))?;
        Ok(content)
    }

    /// Charges `bytes` against the budget without reading them.
    fn charge(&mut self, bytes: u64) -> Result<(), ExtractionError> {
        if bytes > self.remaining {
            return Err(ExtractionError::LimitExceeded(format!(
                "expanded size exceeds {} bytes",
                self.max_bytes
            )));
        }
        self.remaining -= bytes;
        Ok(())
    }
}

/// Normalizes an archive entry path, returning `None` when it is unsafe.
fn normalize_entry_path(raw: &str) -> Option<String> {
    if raw.contains('\0') {
        return None;
    }
    let path = raw.replace('\\', "/");
    if path.starts_with('/') {
        return None;
    }
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        return None;
    }
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            other => segments.push(other),
        }
    }
    if segments.is_empty() { None } else { Some(segments.join("/")) }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
