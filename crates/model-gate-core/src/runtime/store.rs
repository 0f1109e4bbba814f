// crates/model-gate-core/src/runtime/store.rs
// ============================================================================
// Module: Model Gate In-Memory Collaborators
// Description: In-memory verification sink and recording audit sink.
// Purpose: Provide deterministic collaborators for tests and local runs.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! In-memory implementations of [`VerificationSink`] and [`AuditSink`]. They
//! are not intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::interfaces::AuditEvent;
use crate::interfaces::AuditSink;
use crate::interfaces::RegistryRecord;
use crate::interfaces::SinkError;
use crate::interfaces::UploadStatusUpdate;
use crate::interfaces::VerificationSink;

// ============================================================================
// SECTION: Verification Sink
// ============================================================================

/// In-memory results registry and upload tracker.
#[derive(Debug, Default, Clone)]
pub struct InMemoryVerificationSink {
    /// Registry rows keyed by model identifier.
    records: Arc<Mutex<BTreeMap<String, RegistryRecord>>>,
    /// Upload status keyed by model identifier.
    uploads: Arc<Mutex<BTreeMap<String, UploadStatusUpdate>>>,
}

impl InMemoryVerificationSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the registry row for a model.
    #[must_use]
    pub fn record(&self, model_id: &str) -> Option<RegistryRecord> {
        self.records.lock().ok().and_then(|guard| guard.get(model_id).cloned())
    }

    /// Returns the upload status for a model.
    #[must_use]
    pub fn upload_status(&self, model_id: &str) -> Option<UploadStatusUpdate> {
        self.uploads.lock().ok().and_then(|guard| guard.get(model_id).cloned())
    }

    /// Returns the number of registry rows.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.lock().map_or(0, |guard| guard.len())
    }
}

impl VerificationSink for InMemoryVerificationSink {
    fn upsert_result(&self, record: &RegistryRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .map_err(|_| SinkError::Backend("registry mutex poisoned".to_string()))?
            .insert(record.model_id.clone(), record.clone());
        Ok(())
    }

    fn update_upload_status(&self, update: &UploadStatusUpdate) -> Result<(), SinkError> {
        self.uploads
            .lock()
            .map_err(|_| SinkError::Backend("upload status mutex poisoned".to_string()))?
            .insert(update.model_id.clone(), update.clone());
        Ok(())
    }
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// Audit sink that keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingAuditSink {
    /// Recorded events in emission order.
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl RecordingAuditSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    /// Returns the labels of the recorded events.
    #[must_use]
    pub fn labels(&self) -> Vec<&'static str> {
        self.events().iter().map(AuditEvent::label).collect()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event.clone());
        }
    }
}
