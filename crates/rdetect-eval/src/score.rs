//! Scoring policy: component scores, weights, and the recommendation.

use serde::{Deserialize, Serialize};

use rdetect_parser::{MatchKind, Query};

use crate::rule::{TestCase, TestKind};
use crate::verdict::{Failure, Stage};

/// Approval threshold on the overall score.
pub const APPROVE_THRESHOLD: f64 = 0.75;
/// Below this the rule is not worth another generation attempt.
pub const REVISE_THRESHOLD: f64 = 0.40;

/// Performance-risk penalty per leading-wildcard term.
const SUFFIX_PENALTY: f64 = 0.05;
/// Performance-risk penalty per double-ended-wildcard term.
const INFIX_PENALTY: f64 = 0.08;
/// A parseable query never scores below this on syntax.
const SYNTAX_FLOOR: f64 = 0.5;

/// Relative weight of each component in the overall score.
///
/// Logic carries the most weight because it is the behavioral signal;
/// coverage the least because missing categories additionally surface as
/// `COVERAGE` failures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub syntax: f64,
    pub field_mapping: f64,
    pub logic: f64,
    pub coverage: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            syntax: 0.25,
            field_mapping: 0.25,
            logic: 0.35,
            coverage: 0.15,
        }
    }
}

/// Component scores plus the weighted overall, all in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Scores {
    pub syntax: f64,
    pub field_mapping: f64,
    pub logic: f64,
    pub coverage: f64,
    pub overall: f64,
}

impl Scores {
    pub fn weighted(
        weights: &ScoreWeights,
        syntax: f64,
        field_mapping: f64,
        logic: f64,
        coverage: f64,
    ) -> Self {
        let overall = weights.syntax * syntax
            + weights.field_mapping * field_mapping
            + weights.logic * logic
            + weights.coverage * coverage;
        Scores {
            syntax,
            field_mapping,
            logic,
            coverage,
            overall,
        }
    }

    /// The all-zero scores of an unparseable rule.
    pub fn zero() -> Self {
        Scores::default()
    }
}

/// What the validator recommends doing with the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Approve,
    Revise,
    Reject,
}

/// Score the query syntax: 1.0 minus the per-term performance-risk
/// penalties, floored. Each penalized term also produces a warning line.
pub fn syntax_score(query: &Query, warnings: &mut Vec<String>) -> f64 {
    let mut score = 1.0;
    for fp in query.field_patterns() {
        match fp.kind {
            MatchKind::WildcardSuffix => {
                score -= SUFFIX_PENALTY;
                warnings.push(format!(
                    "leading wildcard '{}' on '{}' defeats index prefixing",
                    fp.pattern, fp.field
                ));
            }
            MatchKind::WildcardInfix => {
                score -= INFIX_PENALTY;
                warnings.push(format!(
                    "double-ended wildcard '{}' on '{}' forces a full scan",
                    fp.pattern, fp.field
                ));
            }
            MatchKind::Exact | MatchKind::WildcardPrefix => {}
        }
    }
    score.max(SYNTAX_FLOOR)
}

/// Decide the recommendation from the scores, the accumulated failures, and
/// the submitted test suite.
///
/// `Approve` additionally requires a clean parse and field mapping, plus at
/// least one TP and one FN case so the rule demonstrates both a detection
/// and a documented evasion.
pub fn recommend(scores: &Scores, failures: &[Failure], cases: &[TestCase]) -> Recommendation {
    let hard_failure = failures
        .iter()
        .any(|f| matches!(f.stage, Stage::Parse | Stage::Field));
    let has_tp = cases.iter().any(|c| c.kind == TestKind::TruePositive);
    let has_fn = cases.iter().any(|c| c.kind == TestKind::FalseNegative);

    if scores.overall >= APPROVE_THRESHOLD && !hard_failure && has_tp && has_fn {
        Recommendation::Approve
    } else if scores.overall >= REVISE_THRESHOLD {
        Recommendation::Revise
    } else {
        Recommendation::Reject
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tp_fn_cases() -> Vec<TestCase> {
        vec![
            TestCase {
                kind: TestKind::TruePositive,
                description: "hit".into(),
                log_entry: json!({}),
                expected_match: true,
                evasion_technique: None,
            },
            TestCase {
                kind: TestKind::FalseNegative,
                description: "evasion".into(),
                log_entry: json!({}),
                expected_match: false,
                evasion_technique: Some("renamed binary".into()),
            },
        ]
    }

    #[test]
    fn default_weights_sum_to_one() {
        let w = ScoreWeights::default();
        assert!((w.syntax + w.field_mapping + w.logic + w.coverage - 1.0).abs() < 1e-9);
    }

    #[test]
    fn syntax_penalties_accumulate() {
        let mut warnings = Vec::new();
        let q = Query::parse("a:*x* AND b:*y AND c:z*").unwrap();
        let score = syntax_score(&q, &mut warnings);
        // one infix (0.08) + one suffix (0.05); the prefix is free
        assert!((score - 0.87).abs() < 1e-9);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn syntax_score_is_floored() {
        let q = Query::parse(
            "a:*1* b:*2* c:*3* d:*4* e:*5* f:*6* g:*7* h:*8* i:*9*",
        )
        .unwrap();
        let score = syntax_score(&q, &mut Vec::new());
        assert_eq!(score, 0.5);
    }

    #[test]
    fn approval_needs_tp_and_fn_cases() {
        let scores = Scores::weighted(&ScoreWeights::default(), 1.0, 1.0, 1.0, 1.0);
        assert_eq!(
            recommend(&scores, &[], &tp_fn_cases()),
            Recommendation::Approve
        );
        // same scores, but the suite documents no evasion
        let only_tp = &tp_fn_cases()[..1];
        assert_eq!(recommend(&scores, &[], only_tp), Recommendation::Revise);
    }

    #[test]
    fn field_failure_blocks_approval() {
        let scores = Scores::weighted(&ScoreWeights::default(), 1.0, 0.9, 1.0, 1.0);
        let failures = vec![Failure {
            stage: Stage::Field,
            test_case: None,
            message: "unknown field 'proces.name'".into(),
        }];
        assert_eq!(
            recommend(&scores, &failures, &tp_fn_cases()),
            Recommendation::Revise
        );
    }

    #[test]
    fn low_overall_rejects() {
        let scores = Scores::weighted(&ScoreWeights::default(), 0.5, 0.0, 0.2, 0.0);
        assert_eq!(
            recommend(&scores, &[], &tp_fn_cases()),
            Recommendation::Reject
        );
    }

    #[test]
    fn recommendation_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&Recommendation::Approve).unwrap(),
            "\"APPROVE\""
        );
    }
}
