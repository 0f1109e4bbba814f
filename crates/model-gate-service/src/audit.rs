// crates/model-gate-service/src/audit.rs
// ============================================================================
// Module: Verification Audit Logging
// Description: JSON-line audit sinks for verification events.
// Purpose: Emit structured audit logs without hard dependencies.
// Dependencies: model-gate-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Sinks serialize each [`AuditEvent`] as one JSON line stamped with the
//! emission time, so deployments can route events to their preferred
//! logging pipeline. Write failures are swallowed; auditing never changes a
//! verdict.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use model_gate_core::AuditEvent;
use model_gate_core::AuditSink;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Audit line payload.
#[derive(Debug, Serialize)]
struct AuditLine<'a> {
    /// Event timestamp (milliseconds since epoch).
    timestamp_ms: u128,
    /// Event body, tagged by `event`.
    #[serde(flatten)]
    event: &'a AuditEvent,
}

/// Serializes an event as one JSON line.
fn audit_line(event: &AuditEvent) -> Option<String> {
    let timestamp_ms =
        SystemTime::now().duration_since(UNIX_EPOCH).map(|duration| duration.as_millis()).unwrap_or(0);
    serde_json::to_string(&AuditLine {
        timestamp_ms,
        event,
    })
    .ok()
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink that writes JSON lines to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Some(payload) = audit_line(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle guarded for concurrent writes.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens a file-backed audit sink.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Some(payload) = audit_line(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
        }
    }
}
