//! Single-rule validation: parse, field check, test run, score.

use chrono::Utc;
use tracing::debug;

use rdetect_parser::Query;

use crate::cancel::CancelFlag;
use crate::catalog::FieldCatalog;
use crate::error::{EvalError, Result};
use crate::matcher::CompiledQuery;
use crate::rule::CandidateRule;
use crate::runner::{ConfusionMetrics, coverage_failures, run_cases};
use crate::score::{Recommendation, ScoreWeights, Scores, recommend, syntax_score};
use crate::verdict::{Failure, Stage, ValidationVerdict};

/// Validates candidate rules against a field catalog.
///
/// Pure and synchronous: the same rule and catalog always produce the same
/// verdict (modulo the timestamp). Orchestration concerns live in
/// [`Orchestrator`](crate::orchestrator::Orchestrator).
#[derive(Debug, Clone)]
pub struct Validator {
    catalog: FieldCatalog,
    weights: ScoreWeights,
}

impl Validator {
    pub fn new(catalog: FieldCatalog) -> Self {
        Validator {
            catalog,
            weights: ScoreWeights::default(),
        }
    }

    pub fn with_weights(catalog: FieldCatalog, weights: ScoreWeights) -> Self {
        Validator { catalog, weights }
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    /// Validate one rule end to end.
    pub fn validate(&self, rule: &CandidateRule) -> ValidationVerdict {
        let query = match Query::parse(&rule.query) {
            Ok(q) => q,
            Err(e) => return self.unparseable(rule, e.to_string()),
        };
        let compiled = match CompiledQuery::compile(&query, &self.catalog) {
            Ok(c) => c,
            Err(e) => return self.unparseable(rule, e.to_string()),
        };
        self.assess(rule, &query, &compiled)
    }

    /// Validate with cooperative cancellation, checked between stages.
    pub fn validate_cancellable(
        &self,
        rule: &CandidateRule,
        cancel: &CancelFlag,
    ) -> Result<ValidationVerdict> {
        if cancel.is_cancelled() {
            return Err(EvalError::Cancelled);
        }
        let query = match Query::parse(&rule.query) {
            Ok(q) => q,
            Err(e) => return Ok(self.unparseable(rule, e.to_string())),
        };
        let compiled = match CompiledQuery::compile(&query, &self.catalog) {
            Ok(c) => c,
            Err(e) => return Ok(self.unparseable(rule, e.to_string())),
        };
        if cancel.is_cancelled() {
            return Err(EvalError::Cancelled);
        }
        Ok(self.assess(rule, &query, &compiled))
    }

    /// Field check, coverage, case execution, and scoring for a rule whose
    /// query already parsed and compiled.
    fn assess(
        &self,
        rule: &CandidateRule,
        query: &Query,
        compiled: &CompiledQuery,
    ) -> ValidationVerdict {
        let mut failures = Vec::new();
        let mut warnings = Vec::new();

        // Field mapping: every referenced field must exist in the catalog
        let referenced = query.referenced_fields();
        let known = referenced
            .iter()
            .filter(|f| self.catalog.contains(f))
            .count();
        for field in &referenced {
            if !self.catalog.contains(field) {
                failures.push(Failure {
                    stage: Stage::Field,
                    test_case: None,
                    message: format!("field '{field}' is not in the catalog"),
                });
            }
        }
        // A query always carries at least one field term
        let field_mapping = known as f64 / referenced.len() as f64;
        let fields_valid = known == referenced.len();

        let coverage = coverage_failures(&rule.test_cases);
        let coverage_score = if coverage.is_empty() { 1.0 } else { 0.0 };
        failures.extend(coverage);

        let (cases, case_failures, metrics) = run_cases(compiled, &rule.test_cases);
        let passed = cases.iter().filter(|c| c.passed).count();
        let logic = if cases.is_empty() {
            0.0
        } else {
            passed as f64 / cases.len() as f64
        };
        failures.extend(case_failures);

        let syntax = syntax_score(query, &mut warnings);
        let scores = Scores::weighted(
            &self.weights,
            syntax,
            field_mapping,
            logic,
            coverage_score,
        );
        let recommendation = recommend(&scores, &failures, &rule.test_cases);
        debug!(
            rule = %rule.name,
            overall = scores.overall,
            failures = failures.len(),
            ?recommendation,
            "rule validated"
        );

        ValidationVerdict {
            rule_name: rule.name.clone(),
            syntax_valid: true,
            fields_valid,
            scores,
            failures,
            warnings,
            metrics,
            cases,
            recommendation,
            validated_at: Utc::now(),
        }
    }

    /// The terminal verdict of a rule whose query does not parse or compile.
    fn unparseable(&self, rule: &CandidateRule, message: String) -> ValidationVerdict {
        debug!(rule = %rule.name, %message, "query rejected at parse stage");
        ValidationVerdict {
            rule_name: rule.name.clone(),
            syntax_valid: false,
            fields_valid: false,
            scores: Scores::zero(),
            failures: vec![Failure {
                stage: Stage::Parse,
                test_case: None,
                message,
            }],
            warnings: Vec::new(),
            metrics: ConfusionMetrics::default(),
            cases: Vec::new(),
            recommendation: Recommendation::Reject,
            validated_at: Utc::now(),
        }
    }
}
