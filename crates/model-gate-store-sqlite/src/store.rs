// crates/model-gate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Verification Registry
// Description: Durable VerificationSink backed by SQLite WAL.
// Purpose: Upsert registry rows and upload status keyed by model identifier.
// Dependencies: model-gate-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements [`VerificationSink`] using `SQLite`. The
//! `model_registry` table holds the latest verdict for each model identifier,
//! together with the full serialized report; `upload_status` holds the
//! completion flag polled by the submission front end. Both writes are
//! `INSERT .. ON CONFLICT DO UPDATE`, so a repeated write is a no-op.
//! Security posture: database contents are untrusted on read and are size
//! checked before decoding.

// ============================================================================//
// SECTION: Imports
// ============================================================================//

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use model_gate_core::RegistryRecord;
use model_gate_core::SinkError;
use model_gate_core::UploadStatusUpdate;
use model_gate_core::VerificationReport;
use model_gate_core::VerificationSink;
use model_gate_core::VerificationStatus;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================//
// SECTION: Constants
// ============================================================================//

/// `SQLite` schema version for the registry.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum serialized report size accepted by the registry.
pub const MAX_REPORT_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================//
// SECTION: Config
// ============================================================================//

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` verification registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Returns a config for `path` with default pragmas.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
#[must_use]
pub const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================//
// SECTION: Errors
// ============================================================================//

/// `SQLite` registry errors.
#[derive(Debug, Error)]
pub enum SqliteSinkError {
    /// Store I/O error.
    #[error("sqlite registry io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite registry db error: {0}")]
    Db(String),
    /// Stored row disagrees with its key or payload.
    #[error("sqlite registry corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite registry version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite registry invalid data: {0}")]
    Invalid(String),
    /// Stored report exceeded the size limit.
    #[error("sqlite registry payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteSinkError> for SinkError {
    fn from(error: SqliteSinkError) -> Self {
        match error {
            SqliteSinkError::Invalid(message) => Self::Encoding(message),
            SqliteSinkError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Encoding(format!(
                "report_json exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
            other => Self::Backend(other.to_string()),
        }
    }
}

// ============================================================================//
// SECTION: Store
// ============================================================================//

/// `SQLite`-backed results registry and upload tracker.
#[derive(Clone)]
pub struct SqliteVerificationSink {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteVerificationSink {
    /// Opens the registry, creating the schema on first use.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteSinkError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteSinkError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Loads the registry row for a model identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteSinkError`] when the row cannot be read or decoded.
    pub fn get_record(&self, model_id: &str) -> Result<Option<RegistryRecord>, SqliteSinkError> {
        let row = {
            let guard = self
                .connection
                .lock()
                .map_err(|_| SqliteSinkError::Db("mutex poisoned".to_string()))?;
            let length: Option<i64> = guard
                .query_row(
                    "SELECT length(report_json) FROM model_registry WHERE model_id = ?1",
                    params![model_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|err| SqliteSinkError::Db(err.to_string()))?;
            let Some(length) = length else {
                return Ok(None);
            };
            let length = usize::try_from(length).map_err(|_| {
                SqliteSinkError::Invalid(format!("negative report length for model {model_id}"))
            })?;
            if length > MAX_REPORT_BYTES {
                return Err(SqliteSinkError::TooLarge {
                    max_bytes: MAX_REPORT_BYTES,
                    actual_bytes: length,
                });
            }
            let row = guard
                .query_row(
                    "SELECT bucket, object_key, status, timestamp, passed_checks, errors, \
                     execution_time_ms, artifact_sha256, report_json FROM model_registry WHERE \
                     model_id = ?1",
                    params![model_id],
                    |row| {
                        Ok(StoredRow {
                            bucket: row.get(0)?,
                            key: row.get(1)?,
                            status: row.get(2)?,
                            timestamp: row.get(3)?,
                            passed_checks: row.get(4)?,
                            errors: row.get(5)?,
                            execution_time_ms: row.get(6)?,
                            artifact_sha256: row.get(7)?,
                            report_json: row.get(8)?,
                        })
                    },
                )
                .map_err(|err| SqliteSinkError::Db(err.to_string()))?;
            drop(guard);
            row
        };
        row.into_record(model_id).map(Some)
    }

    /// Loads the upload-tracking status for a model identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteSinkError`] when the row cannot be read or decoded.
    pub fn get_upload_status(
        &self,
        model_id: &str,
    ) -> Result<Option<UploadStatusUpdate>, SqliteSinkError> {
        let row: Option<(String, String, bool)> = {
            let guard = self
                .connection
                .lock()
                .map_err(|_| SqliteSinkError::Db("mutex poisoned".to_string()))?;
            let row = guard
                .query_row(
                    "SELECT status, timestamp, verification_complete FROM upload_status WHERE \
                     model_id = ?1",
                    params![model_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()
                .map_err(|err| SqliteSinkError::Db(err.to_string()))?;
            drop(guard);
            row
        };
        row.map(|(status, timestamp, verification_complete)| {
            Ok(UploadStatusUpdate {
                model_id: model_id.to_string(),
                status: parse_status(&status)?,
                timestamp,
                verification_complete,
            })
        })
        .transpose()
    }

    /// Upserts a registry row.
    fn write_record(&self, record: &RegistryRecord) -> Result<(), SqliteSinkError> {
        let report_json = serde_json::to_vec(&record.report)
            .map_err(|err| SqliteSinkError::Invalid(err.to_string()))?;
        if report_json.len() > MAX_REPORT_BYTES {
            return Err(SqliteSinkError::TooLarge {
                max_bytes: MAX_REPORT_BYTES,
                actual_bytes: report_json.len(),
            });
        }
        let passed_checks = serde_json::to_string(&record.passed_checks)
            .map_err(|err| SqliteSinkError::Invalid(err.to_string()))?;
        let errors = serde_json::to_string(&record.errors)
            .map_err(|err| SqliteSinkError::Invalid(err.to_string()))?;
        let execution_time_ms = i64::try_from(record.execution_time_ms)
            .map_err(|_| SqliteSinkError::Invalid("execution_time_ms too large".to_string()))?;
        let updated_at = unix_millis();
        let mut guard =
            self.connection.lock().map_err(|_| SqliteSinkError::Db("mutex poisoned".to_string()))?;
        let tx = guard.transaction().map_err(|err| SqliteSinkError::Db(err.to_string()))?;
        tx.execute(
            "INSERT INTO model_registry (model_id, bucket, object_key, status, timestamp, \
             passed_checks, errors, execution_time_ms, artifact_sha256, report_json, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) ON CONFLICT(model_id) DO \
             UPDATE SET bucket = excluded.bucket, object_key = excluded.object_key, status = \
             excluded.status, timestamp = excluded.timestamp, passed_checks = \
             excluded.passed_checks, errors = excluded.errors, execution_time_ms = \
             excluded.execution_time_ms, artifact_sha256 = excluded.artifact_sha256, report_json \
             = excluded.report_json, updated_at = excluded.updated_at",
            params![
                record.model_id,
                record.bucket,
                record.key,
                record.status.as_str(),
                record.timestamp,
                passed_checks,
                errors,
                execution_time_ms,
                record.artifact_sha256,
                report_json,
                updated_at
            ],
        )
        .map_err(|err| SqliteSinkError::Db(err.to_string()))?;
        tx.commit().map_err(|err| SqliteSinkError::Db(err.to_string()))?;
        drop(guard);
        Ok(())
    }

    /// Upserts an upload-status row.
    fn write_upload_status(&self, update: &UploadStatusUpdate) -> Result<(), SqliteSinkError> {
        let updated_at = unix_millis();
        let guard =
            self.connection.lock().map_err(|_| SqliteSinkError::Db("mutex poisoned".to_string()))?;
        guard
            .execute(
                "INSERT INTO upload_status (model_id, status, timestamp, verification_complete, \
                 updated_at) VALUES (?1, ?2, ?3, ?4, ?5) ON CONFLICT(model_id) DO UPDATE SET \
                 status = excluded.status, timestamp = excluded.timestamp, verification_complete \
                 = excluded.verification_complete, updated_at = excluded.updated_at",
                params![
                    update.model_id,
                    update.status.as_str(),
                    update.timestamp,
                    update.verification_complete,
                    updated_at
                ],
            )
            .map_err(|err| SqliteSinkError::Db(err.to_string()))?;
        drop(guard);
        Ok(())
    }
}

impl VerificationSink for SqliteVerificationSink {
    fn upsert_result(&self, record: &RegistryRecord) -> Result<(), SinkError> {
        self.write_record(record).map_err(SinkError::from)
    }

    fn update_upload_status(&self, update: &UploadStatusUpdate) -> Result<(), SinkError> {
        self.write_upload_status(update).map_err(SinkError::from)
    }
}

// ============================================================================//
// SECTION: Row Decoding
// ============================================================================//

/// Raw `model_registry` columns.
struct StoredRow {
    /// Storage bucket.
    bucket: String,
    /// Storage key.
    key: String,
    /// Status label.
    status: String,
    /// Report timestamp.
    timestamp: String,
    /// JSON array of passed check names.
    passed_checks: String,
    /// JSON array of flattened errors.
    errors: String,
    /// Run duration.
    execution_time_ms: i64,
    /// Artifact digest.
    artifact_sha256: Option<String>,
    /// Serialized report.
    report_json: Vec<u8>,
}

impl StoredRow {
    /// Decodes the row and checks it against its key.
    fn into_record(self, model_id: &str) -> Result<RegistryRecord, SqliteSinkError> {
        let report: VerificationReport = serde_json::from_slice(&self.report_json)
            .map_err(|err| SqliteSinkError::Invalid(err.to_string()))?;
        if report.model_id != model_id {
            return Err(SqliteSinkError::Corrupt(format!(
                "model_id mismatch between key {model_id} and stored report"
            )));
        }
        let status = parse_status(&self.status)?;
        if status != report.status() {
            return Err(SqliteSinkError::Corrupt(format!(
                "status column disagrees with stored report for model {model_id}"
            )));
        }
        let passed_checks: Vec<String> = serde_json::from_str(&self.passed_checks)
            .map_err(|err| SqliteSinkError::Invalid(err.to_string()))?;
        let errors: Vec<String> = serde_json::from_str(&self.errors)
            .map_err(|err| SqliteSinkError::Invalid(err.to_string()))?;
        let execution_time_ms = u64::try_from(self.execution_time_ms).map_err(|_| {
            SqliteSinkError::Invalid(format!("negative execution_time_ms for model {model_id}"))
        })?;
        Ok(RegistryRecord {
            model_id: model_id.to_string(),
            bucket: self.bucket,
            key: self.key,
            status,
            timestamp: self.timestamp,
            passed_checks,
            errors,
            execution_time_ms,
            artifact_sha256: self.artifact_sha256,
            report,
        })
    }
}

/// Parses a stored status label.
fn parse_status(label: &str) -> Result<VerificationStatus, SqliteSinkError> {
    match label {
        "VALID" => Ok(VerificationStatus::Valid),
        "INVALID" => Ok(VerificationStatus::Invalid),
        other => Err(SqliteSinkError::Invalid(format!("unsupported status label: {other}"))),
    }
}

// ============================================================================//
// SECTION: Helpers
// ============================================================================//

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteSinkError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteSinkError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteSinkError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteSinkError> {
    let path_string = path.display().to_string();
    if path_string.trim().is_empty() {
        return Err(SqliteSinkError::Invalid("store path must be non-empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteSinkError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteSinkError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteSinkError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteSinkError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteSinkError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(connection: &Connection, config: &SqliteStoreConfig) -> Result<(), SqliteSinkError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteSinkError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteSinkError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteSinkError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteSinkError> {
    let tx = connection.transaction().map_err(|err| SqliteSinkError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteSinkError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteSinkError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteSinkError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS model_registry (
                    model_id TEXT PRIMARY KEY,
                    bucket TEXT NOT NULL,
                    object_key TEXT NOT NULL,
                    status TEXT NOT NULL,
                    timestamp TEXT NOT NULL,
                    passed_checks TEXT NOT NULL,
                    errors TEXT NOT NULL,
                    execution_time_ms INTEGER NOT NULL,
                    artifact_sha256 TEXT,
                    report_json BLOB NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS upload_status (
                    model_id TEXT PRIMARY KEY,
                    status TEXT NOT NULL,
                    timestamp TEXT NOT NULL,
                    verification_complete INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );",
            )
            .map_err(|err| SqliteSinkError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteSinkError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteSinkError::Db(err.to_string()))?;
    Ok(())
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
