// crates/model-gate-core/src/core/time.rs
// ============================================================================
// Module: Model Gate Time Source
// Description: Injectable wall clock for report timestamps.
// Purpose: Keep report generation replayable under test.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Report timestamps are read through a [`Clock`] so hosts use the system
//! clock while tests freeze time. Timestamps are rendered as RFC 3339 in UTC
//! with a trailing `Z`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::OffsetDateTime;
use time::UtcOffset;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of wall-clock time for generated reports.
pub trait Clock: Send + Sync {
    /// Returns the current instant in UTC.
    fn now(&self) -> OffsetDateTime;
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock that always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    /// Frozen instant.
    instant: OffsetDateTime,
}

impl FixedClock {
    /// Creates a clock frozen at `instant`.
    #[must_use]
    pub const fn new(instant: OffsetDateTime) -> Self {
        Self {
            instant,
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.instant
    }
}

// ============================================================================
// SECTION: Formatting
// ============================================================================

/// Formats an instant as an ISO-8601 UTC timestamp ending in `Z`.
#[must_use]
pub fn format_timestamp(instant: OffsetDateTime) -> String {
    let utc = instant.to_offset(UtcOffset::UTC);
    utc.format(&Rfc3339).unwrap_or_else(|_| {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            utc.year(),
            u8::from(utc.month()),
            utc.day(),
            utc.hour(),
            utc.minute(),
            utc.second()
        )
    })
}
