// crates/model-gate-core/src/runtime/pipeline.rs
// ============================================================================
// Module: Model Gate Verification Pipeline
// Description: Fixed-order gate sequencing for both submission tracks.
// Purpose: Turn one artifact location into exactly one verification report.
// Dependencies: crate::{bytecode, core, extract, interfaces, source, validate}, sha2
// ============================================================================

//! ## Overview
//! [`Verifier`] runs the gates of one submission in a fixed order: declared
//! size, retrieval, extraction, structure, metadata, the track's entry
//! contract, then the policy scan. The first failing gate of the primary unit
//! halts the run. Helper classes in a Java archive are scanned after the
//! primary class and only ever contribute warnings.
//!
//! Every path through [`Verifier::verify`] returns a report; collaborator
//! failures become failed checks or audit events, never errors.
//!
//! Security posture: artifact bytes are untrusted and are never executed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use sha2::Digest;
use sha2::Sha256;

use crate::bytecode::ParsedClass;
use crate::bytecode::check_has_method;
use crate::bytecode::check_implements_interface;
use crate::bytecode::parse_class;
use crate::bytecode::scan_class;
use crate::bytecode::scan_parsed;
use crate::core::ArtifactBundle;
use crate::core::BytecodePolicy;
use crate::core::CheckNames;
use crate::core::Clock;
use crate::core::OpenReport;
use crate::core::PolicyConfig;
use crate::core::SubmissionKind;
use crate::core::Track;
use crate::core::VerificationReport;
use crate::core::VerificationStatus;
use crate::core::track::CLASS_FILE_VALID;
use crate::core::track::MODEL_CLASS_PRESENT;
use crate::core::track::basename;
use crate::core::track::fallback_model_id;
use crate::core::track::helper_check_name;
use crate::core::track::method_check_name;
use crate::extract::extract;
use crate::interfaces::ArtifactLocation;
use crate::interfaces::ArtifactSource;
use crate::interfaces::AuditEvent;
use crate::interfaces::AuditSink;
use crate::interfaces::RegistryRecord;
use crate::interfaces::SinkError;
use crate::interfaces::UploadStatusUpdate;
use crate::interfaces::VerificationSink;
use crate::source::Module;
use crate::source::SourceSyntaxError;
use crate::source::check_module_contract;
use crate::source::contract::SIGNATURE_MISMATCH_CHECK;
use crate::source::contract::syntax_violation;
use crate::source::parse_module;
use crate::source::scan_module;
use crate::validate::check_jar_structure;
use crate::validate::check_size;
use crate::validate::class_path_for;
use crate::validate::is_class_path;
use crate::validate::metadata::MetadataCode;
use crate::validate::metadata::MetadataViolation;
use crate::validate::metadata::ModelMetadata;
use crate::validate::metadata::extract_model_id;
use crate::validate::metadata::validate_metadata;
use crate::validate::missing_files;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Metadata document name inside a bundle.
pub const METADATA_FILE: &str = "metadata.json";
/// Bytes per mebibyte, used in size messages.
const MEBIBYTE: u64 = 1024 * 1024;

/// Gate outcome: the updated report and the stage value, or the halted report.
type Stage<T> = Result<(OpenReport, T), OpenReport>;

// ============================================================================
// SECTION: Run Output
// ============================================================================

/// Result of one verification run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRun {
    /// Generated report.
    pub report: VerificationReport,
    /// Lowercase hex SHA-256 of the retrieved bytes, when retrieval succeeded.
    pub artifact_sha256: Option<String>,
}

impl VerificationRun {
    /// Returns the registry status for the verdict.
    #[must_use]
    pub const fn status(&self) -> VerificationStatus {
        self.report.status()
    }
}

/// Which persistence writes succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceOutcome {
    /// Registry upsert succeeded.
    pub registry_written: bool,
    /// Upload-status update succeeded.
    pub status_written: bool,
}

/// Values discovered while gates run.
#[derive(Debug, Default)]
struct RunState {
    /// Model identifier from metadata, when one was found.
    model_id: Option<String>,
    /// Digest of the retrieved bytes.
    artifact_sha256: Option<String>,
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Verification pipeline bound to one immutable policy.
///
/// # Invariants
/// - The policy is never mutated; one verifier may serve concurrent runs.
#[derive(Clone)]
pub struct Verifier {
    /// Shared rule set.
    policy: Arc<PolicyConfig>,
    /// Timestamp source for reports.
    clock: Arc<dyn Clock>,
    /// Audit sink for stage events.
    audit: Arc<dyn AuditSink>,
}

impl Verifier {
    /// Creates a verifier.
    #[must_use]
    pub fn new(policy: Arc<PolicyConfig>, clock: Arc<dyn Clock>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            policy,
            clock,
            audit,
        }
    }

    /// Returns the policy this verifier enforces.
    #[must_use]
    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Verifies the artifact at `location`, fetching it through `source`.
    #[must_use]
    pub fn verify(&self, location: &ArtifactLocation, source: &dyn ArtifactSource) -> VerificationRun {
        let kind = SubmissionKind::from_path(&location.key);
        self.audit.record(&AuditEvent::VerificationStarted {
            bucket: location.bucket.clone(),
            key: location.key.clone(),
            track: kind.track(),
        });
        let mut state = RunState::default();
        let report = self
            .run_gates(location, source, kind, &mut state, OpenReport::start())
            .unwrap_or_else(|halted| halted);
        let model_id = state.model_id.unwrap_or_else(|| fallback_model_id(&location.key));
        self.finish(&model_id, report, state.artifact_sha256)
    }

    /// Builds a run holding a single failed check.
    ///
    /// Used by invocation layers for failures that precede the pipeline, such
    /// as an unparsable event or a fault caught around a run.
    #[must_use]
    pub fn failed_run(&self, model_id: &str, check: &str, message: &str) -> VerificationRun {
        let report = self.fail(OpenReport::start(), check, message);
        self.finish(model_id, report, None)
    }

    /// Writes the run to the results registry and the upload tracker.
    ///
    /// Failures are audited and reported in the outcome; the run itself is
    /// never altered.
    pub fn persist(
        &self,
        location: &ArtifactLocation,
        run: &VerificationRun,
        sink: &dyn VerificationSink,
    ) -> PersistenceOutcome {
        let report = &run.report;
        let record = RegistryRecord {
            model_id: report.model_id.clone(),
            bucket: location.bucket.clone(),
            key: location.key.clone(),
            status: report.status(),
            timestamp: report.timestamp.clone(),
            passed_checks: report
                .checks
                .iter()
                .filter(|(_, check)| check.passed)
                .map(|(name, _)| name.clone())
                .collect(),
            errors: report.overall_errors.clone(),
            execution_time_ms: report.execution_time_ms,
            artifact_sha256: run.artifact_sha256.clone(),
            report: report.clone(),
        };
        let update = UploadStatusUpdate {
            model_id: report.model_id.clone(),
            status: report.status(),
            timestamp: report.timestamp.clone(),
            verification_complete: true,
        };
        PersistenceOutcome {
            registry_written: self.audit_write(
                &report.model_id,
                "upsert_result",
                sink.upsert_result(&record),
            ),
            status_written: self.audit_write(
                &report.model_id,
                "update_upload_status",
                sink.update_upload_status(&update),
            ),
        }
    }

    /// Closes the report and emits the completion event.
    fn finish(
        &self,
        model_id: &str,
        report: OpenReport,
        artifact_sha256: Option<String>,
    ) -> VerificationRun {
        let report = report.close().generate(model_id, self.clock.as_ref());
        self.audit.record(&AuditEvent::VerificationCompleted {
            model_id: report.model_id.clone(),
            verified: report.verified,
            execution_time_ms: report.execution_time_ms,
        });
        VerificationRun {
            report,
            artifact_sha256,
        }
    }

    /// Audits a failed persistence write; returns true on success.
    fn audit_write(&self, model_id: &str, operation: &str, result: Result<(), SinkError>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                self.audit.record(&AuditEvent::PersistenceFailed {
                    model_id: model_id.to_string(),
                    operation: operation.to_string(),
                    error: err.to_string(),
                });
                false
            }
        }
    }

    // ========================================================================
    // SECTION: Recording
    // ========================================================================

    /// Records and audits a passing gate.
    fn pass(&self, report: OpenReport, name: impl Into<String>) -> OpenReport {
        let name = name.into();
        self.audit.record(&AuditEvent::StageCompleted {
            stage: name.clone(),
            passed: true,
        });
        report.record_pass(name)
    }

    /// Records and audits a failing gate.
    fn fail(
        &self,
        report: OpenReport,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> OpenReport {
        let name = name.into();
        self.audit.record(&AuditEvent::StageCompleted {
            stage: name.clone(),
            passed: false,
        });
        report.record_fail(name, message)
    }

    // ========================================================================
    // SECTION: Shared Gates
    // ========================================================================

    /// Runs every gate for the submission.
    fn run_gates(
        &self,
        location: &ArtifactLocation,
        source: &dyn ArtifactSource,
        kind: SubmissionKind,
        state: &mut RunState,
        report: OpenReport,
    ) -> Result<OpenReport, OpenReport> {
        let names = kind.track().checks();
        let max_bytes = self.policy.limits.max_artifact_bytes;
        if !check_size(location.declared_size, max_bytes) {
            return Err(self.fail(
                report,
                names.size.failed,
                format!(
                    "Model file size ({}MB) exceeds maximum allowed ({}MB)",
                    megabytes(location.declared_size),
                    megabytes(max_bytes)
                ),
            ));
        }
        let report = self.pass(report, names.size.passed);

        let bytes = match source.fetch(location, max_bytes) {
            Ok(bytes) => bytes,
            Err(err) => {
                return Err(self.fail(
                    report,
                    names.retrieval.failed,
                    format!("Failed to read model file: {err}"),
                ));
            }
        };
        let report = self.pass(report, names.retrieval.passed);
        state.artifact_sha256 = Some(sha256_hex(&bytes));

        match kind {
            SubmissionKind::SourceBundle(_) | SubmissionKind::Unsupported => {
                self.source_track(location, &bytes, state, report)
            }
            SubmissionKind::JarBundle => self.jar_track(location, &bytes, state, report),
            SubmissionKind::ClassFile => self.class_track(location, &bytes, report),
        }
    }

    /// Extracts the container into a bundle.
    fn extraction(
        &self,
        location: &ArtifactLocation,
        bytes: &[u8],
        names: &CheckNames,
        report: OpenReport,
    ) -> Stage<ArtifactBundle> {
        match extract(bytes, &location.key, &self.policy.limits) {
            Ok(bundle) => Ok((self.pass(report, names.extraction.passed), bundle)),
            Err(err) => Err(self.fail(
                report,
                names.extraction.failed,
                format!("Failed to extract archive: {err}"),
            )),
        }
    }

    /// Validates the metadata document and captures the model identifier.
    fn metadata(
        &self,
        bundle: &ArtifactBundle,
        track: Track,
        state: &mut RunState,
        report: OpenReport,
    ) -> Stage<ModelMetadata> {
        let names = track.checks();
        let (raw, required) = match track {
            Track::Source => (bundle.get(METADATA_FILE), &self.policy.source.required_metadata_fields),
            Track::Bytecode => (
                bundle.find_by_suffix(METADATA_FILE).map(|(_, bytes)| bytes),
                &self.policy.bytecode.required_metadata_fields,
            ),
        };
        let Some(raw) = raw else {
            return Err(self.fail(
                report,
                names.metadata.failed,
                format!("{METADATA_FILE} not found in bundle"),
            ));
        };
        let Ok(text) = std::str::from_utf8(raw) else {
            return Err(self.fail(
                report,
                MetadataCode::InvalidJson.as_str(),
                format!("{METADATA_FILE} is not valid UTF-8"),
            ));
        };
        match validate_metadata(text, track, required) {
            Ok(metadata) => {
                state.model_id = metadata.model_id().map(ToString::to_string);
                Ok((self.pass(report, names.metadata.passed), metadata))
            }
            Err(violations) => {
                state.model_id = extract_model_id(text).filter(|id| !id.trim().is_empty());
                let report = grouped_metadata(&violations)
                    .into_iter()
                    .fold(report, |report, (code, message)| self.fail(report, code, message));
                Err(report)
            }
        }
    }

    // ========================================================================
    // SECTION: Source Track
    // ========================================================================

    /// Runs the interpreted-source gates after retrieval.
    fn source_track(
        &self,
        location: &ArtifactLocation,
        bytes: &[u8],
        state: &mut RunState,
        report: OpenReport,
    ) -> Result<OpenReport, OpenReport> {
        let policy = &self.policy.source;
        let names = Track::Source.checks();
        let (report, bundle) = self.extraction(location, bytes, names, report)?;

        let mut missing = missing_files(&bundle, &policy.required_files);
        if !bundle.contains(&policy.entry_file) && !missing.contains(&policy.entry_file) {
            missing.push(policy.entry_file.clone());
        }
        if !missing.is_empty() {
            return Err(self.fail(
                report,
                names.structure.failed,
                format!("Model package missing required files: {}", missing.join(", ")),
            ));
        }
        let report = self.pass(report, names.structure.passed);

        let (report, _metadata) = self.metadata(&bundle, Track::Source, state, report)?;

        let raw = bundle.get(&policy.entry_file).unwrap_or_default();
        let module = match parse_entry(raw) {
            Ok(module) => module,
            Err(err) => {
                let violation = syntax_violation(&policy.entry_file, &err);
                return Err(self.fail(report, violation.check, violation.message));
            }
        };
        let outcome = match check_module_contract(&module, policy) {
            Ok(outcome) => outcome,
            Err(violation) => return Err(self.fail(report, violation.check, violation.message)),
        };
        let mut report = self.pass(report, names.entry_contract.passed);
        if let Some(warning) = outcome.warning_message() {
            report = report.record_warning(SIGNATURE_MISMATCH_CHECK, warning);
        }

        let scan = scan_module(&module, policy);
        if scan.is_clean() {
            return Ok(self.pass(report, names.policy_scan.passed));
        }
        let report = scan
            .grouped_messages()
            .into_iter()
            .fold(report, |report, (category, message)| {
                self.fail(report, category.as_str(), message)
            });
        Err(report)
    }

    // ========================================================================
    // SECTION: Bytecode Track
    // ========================================================================

    /// Runs the Java archive gates after retrieval.
    fn jar_track(
        &self,
        location: &ArtifactLocation,
        bytes: &[u8],
        state: &mut RunState,
        report: OpenReport,
    ) -> Result<OpenReport, OpenReport> {
        let policy = &self.policy.bytecode;
        let names = Track::Bytecode.checks();
        let (report, bundle) = self.extraction(location, bytes, names, report)?;

        if let Err(violation) =
            check_jar_structure(&bundle, &policy.required_files, names.structure.failed)
        {
            return Err(self.fail(report, violation.check, violation.message));
        }
        let report = self.pass(report, names.structure.passed);

        let (report, metadata) = self.metadata(&bundle, Track::Bytecode, state, report)?;
        let Some(model_class) = metadata.model_class() else {
            return Err(self.fail(
                report,
                MODEL_CLASS_PRESENT.failed,
                format!("{METADATA_FILE} does not declare model_class"),
            ));
        };
        let class_path = class_path_for(model_class);
        let primary = bundle
            .get(&class_path)
            .map(|bytes| (class_path.as_str(), bytes))
            .or_else(|| bundle.find_by_suffix(&class_path));
        let Some((primary_path, primary_bytes)) = primary else {
            return Err(self.fail(
                report,
                MODEL_CLASS_PRESENT.failed,
                format!("Model class '{model_class}' not found in JAR (expected {class_path})"),
            ));
        };
        let report = self.pass(report, MODEL_CLASS_PRESENT.passed);

        let (report, parsed) = self.primary_class(primary_path, primary_bytes, policy, report)?;
        let report = self.security_scan(&parsed, policy, report);
        let report = self.helper_scans(&bundle, primary_path, policy, report);
        if report.failed(names.policy_scan.failed) { Err(report) } else { Ok(report) }
    }

    /// Runs the single-class gates after retrieval; the class is the primary unit.
    fn class_track(
        &self,
        location: &ArtifactLocation,
        bytes: &[u8],
        report: OpenReport,
    ) -> Result<OpenReport, OpenReport> {
        let policy = &self.policy.bytecode;
        let report = self.pass(report, MODEL_CLASS_PRESENT.passed);
        let (report, parsed) = self.primary_class(basename(&location.key), bytes, policy, report)?;
        let report = self.security_scan(&parsed, policy, report);
        if report.failed(Track::Bytecode.checks().policy_scan.failed) {
            Err(report)
        } else {
            Ok(report)
        }
    }

    /// Parses the primary class and checks its interface and required method.
    fn primary_class(
        &self,
        path: &str,
        bytes: &[u8],
        policy: &BytecodePolicy,
        report: OpenReport,
    ) -> Stage<ParsedClass> {
        let parsed = match parse_class(bytes) {
            Ok(parsed) => parsed,
            Err(err) => {
                return Err(self.fail(
                    report,
                    CLASS_FILE_VALID.failed,
                    format!("Cannot parse {path}: {err}"),
                ));
            }
        };
        let report = self.pass(report, CLASS_FILE_VALID.passed);

        let names = Track::Bytecode.checks();
        if let Err(err) = check_implements_interface(&parsed.descriptor, &policy.required_interface)
        {
            return Err(self.fail(report, names.entry_contract.failed, err.to_string()));
        }
        let report = self.pass(report, names.entry_contract.passed);

        let method_check = method_check_name(&policy.required_method);
        if let Err(err) = check_has_method(
            &parsed.descriptor,
            &policy.required_method,
            &policy.required_method_signature,
        ) {
            return Err(self.fail(report, method_check, err.to_string()));
        }
        Ok((self.pass(report, method_check), parsed))
    }

    /// Scans the primary class; watched-field hits become warnings on the gate.
    fn security_scan(
        &self,
        class: &ParsedClass,
        policy: &BytecodePolicy,
        report: OpenReport,
    ) -> OpenReport {
        let gate = Track::Bytecode.checks().policy_scan;
        let scan = scan_parsed(class, policy);
        let report = if scan.is_clean() {
            self.pass(report, gate.passed)
        } else {
            self.fail(report, gate.failed, scan.violations.join("; "))
        };
        if scan.warnings.is_empty() {
            report
        } else {
            report.record_warning(gate.passed, scan.warnings.join("; "))
        }
    }

    /// Scans every other class in the bundle; hits are warnings only.
    fn helper_scans(
        &self,
        bundle: &ArtifactBundle,
        primary_path: &str,
        policy: &BytecodePolicy,
        report: OpenReport,
    ) -> OpenReport {
        let mut report = report;
        for (path, bytes) in bundle.iter() {
            if path == primary_path || !is_class_path(path) {
                continue;
            }
            let message = match scan_class(bytes, policy) {
                Ok(scan) if scan.is_clean() => continue,
                Ok(scan) => scan.violations.join("; "),
                Err(err) => format!("Cannot parse {path}: {err}"),
            };
            self.audit.record(&AuditEvent::HelperViolation {
                class_path: path.to_string(),
                message: message.clone(),
            });
            report = report.record_warning(helper_check_name(path), message);
        }
        report
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Decodes and parses the entry file.
fn parse_entry(raw: &[u8]) -> Result<Module, SourceSyntaxError> {
    let text = std::str::from_utf8(raw).map_err(|err| {
        let valid = raw.get(.. err.valid_up_to()).unwrap_or_default();
        let line = valid.iter().filter(|byte| **byte == b'\n').count() + 1;
        SourceSyntaxError::new(line, "source is not valid UTF-8")
    })?;
    parse_module(text)
}

/// Groups metadata violations by code, joining messages with `"; "`.
fn grouped_metadata(violations: &[MetadataViolation]) -> BTreeMap<&'static str, String> {
    let mut grouped: BTreeMap<&'static str, String> = BTreeMap::new();
    for violation in violations {
        grouped
            .entry(violation.code.as_str())
            .and_modify(|joined| {
                joined.push_str("; ");
                joined.push_str(&violation.message);
            })
            .or_insert_with(|| violation.message.clone());
    }
    grouped
}

/// Formats a byte count as mebibytes with two decimals.
fn megabytes(bytes: u64) -> String {
    let hundredths = bytes.saturating_mul(100) / MEBIBYTE;
    format!("{}.{:02}", hundredths / 100, hundredths % 100)
}

/// Returns the lowercase hex SHA-256 of `bytes`.
fn sha256_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}
