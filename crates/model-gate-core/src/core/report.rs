// crates/model-gate-core/src/core/report.rs
// ============================================================================
// Module: Model Gate Verification Report
// Description: Open/closed report state machine and serialized report.
// Purpose: Accumulate named check outcomes and derive the verdict.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! A run starts with an [`OpenReport`]. Every stage consumes the report and
//! returns the updated value, so ordering is explicit in the pipeline code and
//! no stage can hold a stale reference. [`OpenReport::close`] stops the timer
//! and yields a [`ClosedReport`], which only offers read access and report
//! generation. There is no transition back to the open state.
//!
//! The verdict is derived, never stored: a report is verified iff at least one
//! check was recorded and every recorded check passed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;

use crate::core::time::Clock;
use crate::core::time::format_timestamp;

// ============================================================================
// SECTION: Check Result
// ============================================================================

/// Outcome of one named gate. The gate name is the map key in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Whether the gate passed.
    pub passed: bool,
    /// Failure message for failed gates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Non-fatal warning attached to the gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl CheckResult {
    /// Creates a passing result.
    #[must_use]
    pub const fn pass() -> Self {
        Self {
            passed: true,
            error: None,
            warning: None,
        }
    }

    /// Creates a failing result with a message.
    #[must_use]
    pub const fn fail(message: String) -> Self {
        Self {
            passed: false,
            error: Some(message),
            warning: None,
        }
    }
}

// ============================================================================
// SECTION: Open Report
// ============================================================================

/// Report in the `OPEN` state: timing started, checks may be recorded.
#[derive(Debug, Clone)]
pub struct OpenReport {
    /// Instant the run started.
    started: Instant,
    /// Recorded checks keyed by canonical name.
    checks: BTreeMap<String, CheckResult>,
}

impl OpenReport {
    /// Starts a new report and its timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            checks: BTreeMap::new(),
        }
    }

    /// Records a passing check, replacing any earlier entry of the same name.
    #[must_use]
    pub fn record_pass(mut self, name: impl Into<String>) -> Self {
        self.checks.insert(name.into(), CheckResult::pass());
        self
    }

    /// Records a failing check, replacing any earlier entry of the same name.
    #[must_use]
    pub fn record_fail(mut self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.checks.insert(name.into(), CheckResult::fail(message.into()));
        self
    }

    /// Attaches a warning to a check.
    ///
    /// An existing entry keeps its pass/fail state; an absent entry is created
    /// as passed so warnings never flip the verdict.
    #[must_use]
    pub fn record_warning(mut self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.checks.entry(name.into()).or_insert_with(CheckResult::pass).warning =
            Some(message.into());
        self
    }

    /// Returns the recorded checks.
    #[must_use]
    pub const fn checks(&self) -> &BTreeMap<String, CheckResult> {
        &self.checks
    }

    /// Returns true when the named check was recorded as failed.
    #[must_use]
    pub fn failed(&self, name: &str) -> bool {
        self.checks.get(name).is_some_and(|check| !check.passed)
    }

    /// Returns true when at least one check is recorded and all passed.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        verdict(&self.checks)
    }

    /// Stops the timer and moves the report to the terminal `CLOSED` state.
    #[must_use]
    pub fn close(self) -> ClosedReport {
        let elapsed = self.started.elapsed().as_millis();
        ClosedReport {
            checks: self.checks,
            execution_time_ms: u64::try_from(elapsed).unwrap_or(u64::MAX),
        }
    }
}

// ============================================================================
// SECTION: Closed Report
// ============================================================================

/// Report in the terminal `CLOSED` state.
///
/// # Invariants
/// - No mutation is possible; repeated generation yields identical checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedReport {
    /// Final checks keyed by canonical name.
    checks: BTreeMap<String, CheckResult>,
    /// Wall-clock duration of the run.
    execution_time_ms: u64,
}

impl ClosedReport {
    /// Returns the final checks.
    #[must_use]
    pub const fn checks(&self) -> &BTreeMap<String, CheckResult> {
        &self.checks
    }

    /// Returns the run duration in milliseconds.
    #[must_use]
    pub const fn execution_time_ms(&self) -> u64 {
        self.execution_time_ms
    }

    /// Returns the derived verdict.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        verdict(&self.checks)
    }

    /// Returns `"<check>: <message>"` for every failed check, ordered by check name.
    #[must_use]
    pub fn overall_errors(&self) -> Vec<String> {
        self.checks
            .iter()
            .filter(|(_, check)| !check.passed)
            .map(|(name, check)| format!("{name}: {}", check.error.as_deref().unwrap_or("failed")))
            .collect()
    }

    /// Returns the names of every passed check.
    #[must_use]
    pub fn passed_checks(&self) -> Vec<String> {
        self.checks.iter().filter(|(_, check)| check.passed).map(|(name, _)| name.clone()).collect()
    }

    /// Generates the serializable report stamped with the clock's current time.
    #[must_use]
    pub fn generate(&self, model_id: &str, clock: &dyn Clock) -> VerificationReport {
        VerificationReport {
            model_id: model_id.to_string(),
            verified: self.is_verified(),
            checks: self.checks.clone(),
            overall_errors: self.overall_errors(),
            execution_time_ms: self.execution_time_ms,
            timestamp: format_timestamp(clock.now()),
        }
    }
}

/// Verdict rule shared by both states.
fn verdict(checks: &BTreeMap<String, CheckResult>) -> bool {
    !checks.is_empty() && checks.values().all(|check| check.passed)
}

// ============================================================================
// SECTION: Verification Report
// ============================================================================

/// Serialized verification report handed to persistence and callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    /// Model identifier (from metadata or the declared path).
    pub model_id: String,
    /// Final verdict.
    pub verified: bool,
    /// Per-check outcomes.
    pub checks: BTreeMap<String, CheckResult>,
    /// Flattened failure list.
    pub overall_errors: Vec<String>,
    /// Run duration in milliseconds.
    pub execution_time_ms: u64,
    /// ISO-8601 UTC timestamp ending in `Z`.
    pub timestamp: String,
}

impl VerificationReport {
    /// Returns the registry status label for the verdict.
    #[must_use]
    pub const fn status(&self) -> VerificationStatus {
        if self.verified { VerificationStatus::Valid } else { VerificationStatus::Invalid }
    }
}

/// Registry status derived from the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    /// Every check passed.
    Valid,
    /// At least one check failed, or nothing ran.
    Invalid,
}

impl VerificationStatus {
    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Invalid => "INVALID",
        }
    }
}
