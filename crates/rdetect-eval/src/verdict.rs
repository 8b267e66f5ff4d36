//! Validation verdicts: the immutable record of one validation attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::runner::{CaseResult, ConfusionMetrics};
use crate::score::{Recommendation, Scores};

/// The validation stage a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stage {
    Parse,
    Field,
    Match,
    Coverage,
}

/// One recorded defect.
///
/// Only `Parse` aborts validation early; `Field`, `Match`, and `Coverage`
/// failures accumulate so a single verdict reports everything the next
/// generation attempt has to fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub stage: Stage,
    /// Index of the offending test case, for `Match` failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case: Option<usize>,
    pub message: String,
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.stage {
            Stage::Parse => write!(f, "PARSE: {}", self.message),
            Stage::Field => write!(f, "FIELD: {}", self.message),
            Stage::Match => write!(f, "MATCH: {}", self.message),
            Stage::Coverage => write!(f, "COVERAGE: {}", self.message),
        }
    }
}

/// The full outcome of validating one candidate rule.
///
/// Immutable once produced; the orchestrator feeds it back verbatim to the
/// generation collaborator and appends it to the session history. Serializes
/// to the JSON report artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub rule_name: String,
    pub syntax_valid: bool,
    pub fields_valid: bool,
    pub scores: Scores,
    pub failures: Vec<Failure>,
    pub warnings: Vec<String>,
    pub metrics: ConfusionMetrics,
    pub cases: Vec<CaseResult>,
    pub recommendation: Recommendation,
    pub validated_at: DateTime<Utc>,
}

impl ValidationVerdict {
    pub fn is_approved(&self) -> bool {
        self.recommendation == Recommendation::Approve
    }

    /// Failures at the named stage.
    pub fn failures_at(&self, stage: Stage) -> impl Iterator<Item = &Failure> {
        self.failures.iter().filter(move |f| f.stage == stage)
    }
}
