// crates/model-gate-service/src/event.rs
// ============================================================================
// Module: Storage Event Parsing
// Description: Object-storage upload notifications to artifact locations.
// Purpose: Extract bucket, key, and declared size from an invocation event.
// Dependencies: model-gate-core, serde, serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! Upload notifications follow the object-storage shape
//! `{"Records":[{"s3":{"bucket":{"name"},"object":{"key","size"}}}]}`. Only
//! the first record is used. Object keys arrive form-encoded (`+` for space,
//! `%XX` escapes) and are decoded before they are used as storage keys.
//!
//! Security posture: events are untrusted; oversize payloads are rejected
//! before decoding.

// ============================================================================
// SECTION: Imports
// ============================================================================

use model_gate_core::ArtifactLocation;
use serde::Deserialize;
use thiserror::Error;
use url::form_urlencoded;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted event payload size.
pub const MAX_EVENT_BYTES: usize = 256 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Storage event errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// Payload is not a storage notification.
    #[error("Invalid event structure: {0}")]
    Malformed(String),
    /// Notification carries no records.
    #[error("Invalid event structure: no records")]
    NoRecords,
    /// Object key is empty or not decodable.
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
    /// Payload exceeds the size limit.
    #[error("event payload exceeds {MAX_EVENT_BYTES} bytes")]
    TooLarge,
}

// ============================================================================
// SECTION: Event Shape
// ============================================================================

/// Upload notification.
#[derive(Deserialize)]
struct StorageEvent {
    /// Notification records.
    #[serde(rename = "Records")]
    records: Vec<EventRecord>,
}

/// Single notification record.
#[derive(Deserialize)]
struct EventRecord {
    /// Storage section.
    s3: S3Entity,
}

/// Storage entity of a record.
#[derive(Deserialize)]
struct S3Entity {
    /// Bucket reference.
    bucket: BucketEntity,
    /// Object reference.
    object: ObjectEntity,
}

/// Bucket reference.
#[derive(Deserialize)]
struct BucketEntity {
    /// Bucket name.
    name: String,
}

/// Object reference.
#[derive(Deserialize)]
struct ObjectEntity {
    /// Form-encoded object key.
    key: String,
    /// Object size in bytes.
    size: u64,
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses an upload notification into the location of the first record.
///
/// # Errors
///
/// Returns [`EventError`] when the payload is not a notification, has no
/// records, or carries an undecodable key.
pub fn parse_storage_event(payload: &str) -> Result<ArtifactLocation, EventError> {
    if payload.len() > MAX_EVENT_BYTES {
        return Err(EventError::TooLarge);
    }
    let event: StorageEvent =
        serde_json::from_str(payload).map_err(|err| EventError::Malformed(err.to_string()))?;
    let record = event.records.into_iter().next().ok_or(EventError::NoRecords)?;
    let key = decode_object_key(&record.s3.object.key)?;
    if record.s3.bucket.name.trim().is_empty() {
        return Err(EventError::Malformed("bucket name is empty".to_string()));
    }
    Ok(ArtifactLocation {
        bucket: record.s3.bucket.name,
        key,
        declared_size: record.s3.object.size,
    })
}

/// Decodes a form-encoded object key.
///
/// Literal `&` and `=` are escaped first so the whole key decodes as a single
/// form name.
fn decode_object_key(raw: &str) -> Result<String, EventError> {
    let escaped = raw.replace('&', "%26").replace('=', "%3D");
    let key = form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(name, _)| name.into_owned())
        .unwrap_or_default();
    if key.contains(char::REPLACEMENT_CHARACTER) && !raw.contains(char::REPLACEMENT_CHARACTER) {
        return Err(EventError::InvalidKey(format!("'{raw}' does not decode to utf-8")));
    }
    if key.trim().is_empty() {
        return Err(EventError::InvalidKey("object key is empty".to_string()));
    }
    Ok(key)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
