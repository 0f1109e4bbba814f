// crates/model-gate-config/src/config.rs
// ============================================================================
// Module: Model Gate Configuration
// Description: Configuration loading and validation for Model Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: model-gate-core, model-gate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section rejects unknown keys. The `[limits]`, `[source]` and
//! `[bytecode]` sections become the immutable [`PolicyConfig`]; the remaining
//! sections select collaborators for the service and CLI.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use model_gate_core::ArtifactLimits;
use model_gate_core::BytecodePolicy;
use model_gate_core::PolicyConfig;
use model_gate_core::SourcePolicy;
use model_gate_store_sqlite::SqliteStoreConfig;
use model_gate_store_sqlite::SqliteStoreMode;
use model_gate_store_sqlite::SqliteSyncMode;
use model_gate_store_sqlite::store::default_busy_timeout_ms;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "model-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "MODEL_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error while reading config.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parse or encode error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Validation error.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Model Gate configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelGateConfig {
    /// Size and entry ceilings.
    pub limits: ArtifactLimits,
    /// Interpreted-source track rules.
    pub source: SourcePolicy,
    /// Compiled-bytecode track rules.
    pub bytecode: BytecodePolicy,
    /// Artifact storage backend.
    pub storage: StorageConfig,
    /// Results registry backend.
    pub registry: RegistryConfig,
    /// Audit logging.
    pub audit: AuditConfig,
}

impl ModelGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: `path`, then `MODEL_GATE_CONFIG`, then
    /// `model-gate.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::parse(content)
    }

    /// Loads configuration, falling back to defaults when no file is named.
    ///
    /// An explicit path or `MODEL_GATE_CONFIG` must resolve to a readable
    /// file; only an absent `model-gate.toml` in the working directory yields
    /// the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a named file fails to load or validate.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if path.is_none()
            && env::var_os(CONFIG_ENV_VAR).is_none()
            && !Path::new(DEFAULT_CONFIG_NAME).exists()
        {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_limits(&self.limits)?;
        validate_source_policy(&self.source)?;
        validate_bytecode_policy(&self.bytecode)?;
        self.storage.validate()?;
        self.registry.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Returns the verification policy described by this configuration.
    #[must_use]
    pub fn policy(&self) -> PolicyConfig {
        PolicyConfig {
            limits: self.limits,
            source: self.source.clone(),
            bytecode: self.bytecode.clone(),
        }
    }

    /// Renders the effective configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when encoding fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|err| ConfigError::Parse(err.to_string()))
    }
}

// ============================================================================
// SECTION: Storage
// ============================================================================

/// Artifact storage backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Artifacts are read from a local directory tree.
    Filesystem(FilesystemStorageConfig),
    /// Artifacts are read from S3-compatible object storage.
    S3(S3StorageConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem(FilesystemStorageConfig::default())
    }
}

impl StorageConfig {
    /// Validates storage configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Filesystem(config) => {
                validate_path_string("storage.root", &config.root.to_string_lossy())
            }
            Self::S3(config) => config.validate(),
        }
    }
}

/// Local directory storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilesystemStorageConfig {
    /// Root directory; object keys resolve beneath it.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

impl Default for FilesystemStorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

/// S3-compatible storage. The bucket comes from each storage event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct S3StorageConfig {
    /// Optional region (defaults to environment).
    #[serde(default)]
    pub region: Option<String>,
    /// Optional S3-compatible endpoint.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Force path-style addressing.
    #[serde(default)]
    pub force_path_style: bool,
    /// Allow non-TLS endpoints (explicit opt-in).
    #[serde(default)]
    pub allow_http: bool,
}

impl S3StorageConfig {
    /// Validates object-store configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when object-store settings are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(region) = &self.region
            && region.trim().is_empty()
        {
            return Err(ConfigError::Invalid("storage.region must be non-empty".to_string()));
        }
        if let Some(endpoint) = &self.endpoint {
            let trimmed = endpoint.trim();
            if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
                return Err(ConfigError::Invalid(
                    "storage.endpoint must include http:// or https://".to_string(),
                ));
            }
            if trimmed.starts_with("http://") && !self.allow_http {
                return Err(ConfigError::Invalid(
                    "storage.endpoint uses http:// without allow_http".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Results registry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Registry backend type.
    #[serde(rename = "type", default)]
    pub registry_type: RegistryType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_type: RegistryType::default(),
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl RegistryConfig {
    /// Validates registry configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.registry_type {
            RegistryType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory registry must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            RegistryType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite registry requires path".to_string())
                })?;
                validate_path_string("registry.path", &path.to_string_lossy())
            }
        }
    }

    /// Returns the `SQLite` store config when the sqlite backend is selected.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match (self.registry_type, &self.path) {
            (RegistryType::Sqlite, Some(path)) => Some(SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
            _ => None,
        }
    }
}

/// Registry backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegistryType {
    /// Keep results in process memory.
    #[default]
    Memory,
    /// Use the `SQLite`-backed durable registry.
    Sqlite,
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Policy Validation
// ============================================================================

/// Validates size ceilings.
fn validate_limits(limits: &ArtifactLimits) -> Result<(), ConfigError> {
    if limits.max_artifact_bytes == 0 {
        return Err(ConfigError::Invalid(
            "limits.max_artifact_bytes must be greater than zero".to_string(),
        ));
    }
    if limits.max_extracted_bytes == 0 {
        return Err(ConfigError::Invalid(
            "limits.max_extracted_bytes must be greater than zero".to_string(),
        ));
    }
    if limits.max_archive_entries == 0 {
        return Err(ConfigError::Invalid(
            "limits.max_archive_entries must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Validates the interpreted-source rules.
fn validate_source_policy(policy: &SourcePolicy) -> Result<(), ConfigError> {
    require_name("source.entry_file", &policy.entry_file)?;
    require_name("source.entry_type", &policy.entry_type)?;
    require_name("source.entry_method", &policy.entry_method)?;
    if policy.entry_parameters.is_empty() {
        return Err(ConfigError::Invalid("source.entry_parameters must be non-empty".to_string()));
    }
    for parameter in &policy.entry_parameters {
        require_name("source.entry_parameters", parameter)?;
    }
    require_entries("source.required_files", &policy.required_files)?;
    require_entries("source.required_metadata_fields", &policy.required_metadata_fields)?;
    require_entries("source.allowed_namespaces", &policy.allowed_namespaces)?;
    require_entries("source.blocked_namespaces", &policy.blocked_namespaces)?;
    require_entries("source.blocked_operations", &policy.blocked_operations)?;
    if let Some(overlap) = policy.allowed_namespaces.intersection(&policy.blocked_namespaces).next()
    {
        return Err(ConfigError::Invalid(format!(
            "source namespace '{overlap}' is both allowed and blocked"
        )));
    }
    Ok(())
}

/// Validates the compiled-bytecode rules.
fn validate_bytecode_policy(policy: &BytecodePolicy) -> Result<(), ConfigError> {
    require_name("bytecode.required_interface", &policy.required_interface)?;
    require_name("bytecode.required_method", &policy.required_method)?;
    let signature = policy.required_method_signature.trim();
    if !signature.starts_with('(') || !signature.contains(')') {
        return Err(ConfigError::Invalid(
            "bytecode.required_method_signature must be a method descriptor".to_string(),
        ));
    }
    require_entries("bytecode.required_files", &policy.required_files)?;
    require_entries("bytecode.required_metadata_fields", &policy.required_metadata_fields)?;
    require_entries("bytecode.blocked_namespaces", &policy.blocked_namespaces)?;
    require_entries("bytecode.blocked_type_references", &policy.blocked_type_references)?;
    require_entries("bytecode.blocked_method_references", &policy.blocked_method_references)?;
    for entry in &policy.blocked_method_references {
        let well_formed = entry
            .rsplit_once('.')
            .is_some_and(|(owner, member)| !owner.is_empty() && !member.is_empty());
        if !well_formed {
            return Err(ConfigError::Invalid(format!(
                "bytecode.blocked_method_references entry '{entry}' must be <owner>.<member>"
            )));
        }
    }
    Ok(())
}

/// Rejects a blank name.
fn require_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    Ok(())
}

/// Rejects blank entries in a rule set.
fn require_entries(field: &str, values: &BTreeSet<String>) -> Result<(), ConfigError> {
    if values.iter().any(|value| value.trim().is_empty()) {
        return Err(ConfigError::Invalid(format!("{field} must not contain empty entries")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Default storage root.
fn default_storage_root() -> PathBuf {
    PathBuf::from(".")
}

/// Default audit enablement.
const fn default_audit_enabled() -> bool {
    true
}

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
