//! Verdict records and the run outcome derived from them.
//!
//! Each triggered test handler appends exactly one [`VerdictRecord`] to the
//! feed partition of its run. The aggregator folds those records into a
//! single [`RunOutcome`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Maximum accepted length of a test name.
pub const MAX_TEST_NAME_LEN: u64 = 128;

/// Maximum accepted length of the free-form failure details.
pub const MAX_DETAILS_LEN: u64 = 4096;

// ---------------------------------------------------------------------------
// VerdictRecord
// ---------------------------------------------------------------------------

/// One handler's self-reported result. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictRecord {
    /// Name of the test that produced this verdict, unique within a run.
    pub test_name: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Set by the feed when the record is accepted.
    pub recorded_at: Timestamp,
}

impl VerdictRecord {
    /// Stamp a verdict with the current time.
    pub fn new(test_name: impl Into<String>, passed: bool, details: Option<String>) -> Self {
        Self {
            test_name: test_name.into(),
            passed,
            details,
            recorded_at: Utc::now(),
        }
    }

    pub fn pass(test_name: impl Into<String>) -> Self {
        Self::new(test_name, true, None)
    }

    pub fn fail(test_name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(test_name, false, Some(details.into()))
    }
}

// ---------------------------------------------------------------------------
// VerdictReport (inbound payload)
// ---------------------------------------------------------------------------

/// Body a test handler submits when reporting its verdict.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerdictReport {
    #[validate(length(min = 1, max = 128), custom(function = "not_blank"))]
    pub test_name: String,
    pub passed: bool,
    #[validate(length(max = 4096))]
    pub details: Option<String>,
}

impl VerdictReport {
    /// Validate the report and stamp it into a [`VerdictRecord`].
    pub fn into_record(self) -> Result<VerdictRecord, CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        Ok(VerdictRecord::new(self.test_name, self.passed, self.details))
    }
}

/// Whitespace-only names pass the length check but identify nothing.
fn not_blank(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// RunOutcome
// ---------------------------------------------------------------------------

/// Terminal verdict of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every expected test reported and all of them passed.
    Pass,
    /// The first failing report, carried verbatim.
    Fail {
        test_name: String,
        details: Option<String>,
    },
}

impl RunOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, RunOutcome::Pass)
    }
}

impl From<&VerdictRecord> for RunOutcome {
    fn from(record: &VerdictRecord) -> Self {
        if record.passed {
            RunOutcome::Pass
        } else {
            RunOutcome::Fail {
                test_name: record.test_name.clone(),
                details: record.details.clone(),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
