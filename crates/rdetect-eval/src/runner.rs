//! Test-case execution and confusion metrics.

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::matcher::{CompiledQuery, FieldTrace};
use crate::rule::{TestCase, TestKind};
use crate::verdict::{Failure, Stage};

/// The outcome of one executed test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub index: usize,
    pub kind: TestKind,
    pub description: String,
    pub expected: bool,
    pub actual: bool,
    pub passed: bool,
    pub trace: Vec<FieldTrace>,
}

/// Confusion counts plus the derived quality metrics.
///
/// Counts come from expected versus actual outcomes, not from the advisory
/// case labels: expected-true/actual-true is a TP, expected-true/actual-false
/// an FN, expected-false/actual-true an FP, expected-false/actual-false a TN.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfusionMetrics {
    pub true_positives: u32,
    pub false_negatives: u32,
    pub false_positives: u32,
    pub true_negatives: u32,
    pub total: u32,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub accuracy: f64,
}

impl ConfusionMetrics {
    /// Derive the quality metrics from raw confusion counts.
    pub fn from_counts(tp: u32, fn_: u32, fp: u32, tn: u32) -> Self {
        let total = tp + fn_ + fp + tn;
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ConfusionMetrics {
            true_positives: tp,
            false_negatives: fn_,
            false_positives: fp,
            true_negatives: tn,
            total,
            precision,
            recall,
            f1_score,
            accuracy: ratio(tp + tn, total),
        }
    }
}

fn ratio(num: u32, den: u32) -> f64 {
    if den == 0 { 0.0 } else { f64::from(num) / f64::from(den) }
}

/// Run every test case of a rule against its compiled query.
///
/// Each mismatch becomes a `MATCH` failure naming the case. Execution never
/// aborts early; one run reports every defect.
pub fn run_cases(
    compiled: &CompiledQuery,
    cases: &[TestCase],
) -> (Vec<CaseResult>, Vec<Failure>, ConfusionMetrics) {
    let mut results = Vec::with_capacity(cases.len());
    let mut failures = Vec::new();
    let (mut tp, mut fn_, mut fp, mut tn) = (0u32, 0u32, 0u32, 0u32);

    for (index, case) in cases.iter().enumerate() {
        let doc = Document::from_json(&case.log_entry);
        let outcome = compiled.matches(&doc);
        let actual = outcome.matched;
        let expected = case.expected_match;

        match (expected, actual) {
            (true, true) => tp += 1,
            (true, false) => fn_ += 1,
            (false, true) => fp += 1,
            (false, false) => tn += 1,
        }

        let passed = actual == expected;
        if !passed {
            failures.push(Failure {
                stage: Stage::Match,
                test_case: Some(index),
                message: format!(
                    "case {index} [{}] '{}' expected match={expected}, got {actual}",
                    case.kind, case.description
                ),
            });
        }

        results.push(CaseResult {
            index,
            kind: case.kind,
            description: case.description.clone(),
            expected,
            actual,
            passed,
            trace: outcome.trace,
        });
    }

    (results, failures, ConfusionMetrics::from_counts(tp, fn_, fp, tn))
}

/// Minimum per-category counts a rule's test suite must carry.
const MIN_TP: usize = 2;
const MIN_FN: usize = 1;
const MIN_FP: usize = 1;
const MIN_TN: usize = 1;

/// Check the coverage policy: at least 2 TP, 1 FN, 1 FP, and 1 TN cases.
///
/// Each missing category is one `COVERAGE` failure, independent of how the
/// cases actually execute.
pub fn coverage_failures(cases: &[TestCase]) -> Vec<Failure> {
    let count = |kind: TestKind| cases.iter().filter(|c| c.kind == kind).count();

    let mut failures = Vec::new();
    for (kind, minimum) in [
        (TestKind::TruePositive, MIN_TP),
        (TestKind::FalseNegative, MIN_FN),
        (TestKind::FalsePositive, MIN_FP),
        (TestKind::TrueNegative, MIN_TN),
    ] {
        let have = count(kind);
        if have < minimum {
            failures.push(Failure {
                stage: Stage::Coverage,
                test_case: None,
                message: format!("need at least {minimum} {kind} case(s), have {have}"),
            });
        }
    }
    failures
}
