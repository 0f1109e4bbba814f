// crates/model-gate-core/src/core/bundle.rs
// ============================================================================
// Module: Model Gate Artifact Bundle
// Description: Extracted path-to-bytes mapping owned by one run.
// Purpose: Give validators and scanners a read-only view of submission files.
// Dependencies: std
// ============================================================================

//! ## Overview
//! An [`ArtifactBundle`] holds the leaf files of one submission. Paths are
//! unique and directory entries never appear. Source bundles are keyed by
//! basename; Java archives keep full relative paths so package directories
//! stay meaningful for class lookup.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

// ============================================================================
// SECTION: Artifact Bundle
// ============================================================================

/// Extracted submission contents.
///
/// # Invariants
/// - Keys are unique, normalized, slash-separated relative paths.
/// - Values are exactly the stored entry bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactBundle {
    /// Entries keyed by path.
    entries: BTreeMap<String, Vec<u8>>,
}

impl ArtifactBundle {
    /// Creates an empty bundle.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Inserts an entry, returning false when the path was already present.
    pub fn insert(&mut self, path: String, bytes: Vec<u8>) -> bool {
        if self.entries.contains_key(&path) {
            return false;
        }
        self.entries.insert(path, bytes);
        true
    }

    /// Returns the bytes stored at `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    /// Returns true when `path` is present.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Returns the first entry whose path equals or ends with `/<name>`.
    #[must_use]
    pub fn find_by_suffix(&self, name: &str) -> Option<(&str, &[u8])> {
        let nested = format!("/{name}");
        self.entries
            .iter()
            .find(|(path, _)| path.as_str() == name || path.ends_with(&nested))
            .map(|(path, bytes)| (path.as_str(), bytes.as_slice()))
    }

    /// Iterates entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(path, bytes)| (path.as_str(), bytes.as_slice()))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the bundle holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
