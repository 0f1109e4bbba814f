// crates/model-gate-service/src/fs_source.rs
// ============================================================================
// Module: Filesystem Artifact Source
// Description: ArtifactSource reading object keys beneath a local root.
// Purpose: Serve local verification and tests without object storage.
// Dependencies: model-gate-core
// ============================================================================

//! ## Overview
//! [`FsArtifactSource`] resolves an object key beneath one root directory.
//! The bucket is a label only. Keys are validated component by component:
//! absolute paths, parent references, and backslashes are rejected before
//! the filesystem is touched, and reads stop one byte past the limit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::ErrorKind;
use std::io::Read;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use model_gate_core::ArtifactLocation;
use model_gate_core::ArtifactSource;
use model_gate_core::SourceError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a single key segment.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total key length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Source
// ============================================================================

/// Artifact source rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsArtifactSource {
    /// Directory object keys resolve beneath.
    root: PathBuf,
}

impl FsArtifactSource {
    /// Creates a source rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a key to a path beneath the root.
    fn resolve(&self, key: &str) -> Result<PathBuf, SourceError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

impl ArtifactSource for FsArtifactSource {
    fn fetch(&self, location: &ArtifactLocation, max_bytes: u64) -> Result<Vec<u8>, SourceError> {
        let path = self.resolve(&location.key)?;
        let file = File::open(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => SourceError::NotFound(location.key.clone()),
            _ => SourceError::Io(err.to_string()),
        })?;
        let metadata = file.metadata().map_err(|err| SourceError::Io(err.to_string()))?;
        if !metadata.is_file() {
            return Err(SourceError::Invalid(format!("{} is not a file", location.key)));
        }
        if metadata.len() > max_bytes {
            return Err(SourceError::TooLarge {
                path: location.key.clone(),
                max_bytes,
                actual_bytes: metadata.len(),
            });
        }
        let mut bytes = Vec::new();
        file.take(max_bytes.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(|err| SourceError::Io(err.to_string()))?;
        let actual_bytes = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        if actual_bytes > max_bytes {
            return Err(SourceError::TooLarge {
                path: location.key.clone(),
                max_bytes,
                actual_bytes,
            });
        }
        Ok(bytes)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates an object key as a relative path without traversal.
fn validate_key(key: &str) -> Result<(), SourceError> {
    if key.trim().is_empty() {
        return Err(SourceError::Invalid("object key is empty".to_string()));
    }
    if key.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SourceError::Invalid("object key exceeds max length".to_string()));
    }
    if key.contains('\\') {
        return Err(SourceError::Invalid(format!("object key '{key}' contains backslashes")));
    }
    for component in Path::new(key).components() {
        match component {
            Component::Normal(segment) => {
                if segment.len() > MAX_PATH_COMPONENT_LENGTH {
                    return Err(SourceError::Invalid(format!(
                        "object key '{key}' has an overlong segment"
                    )));
                }
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(SourceError::Invalid(format!(
                    "object key '{key}' escapes the storage root"
                )));
            }
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
