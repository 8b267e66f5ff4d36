//! Async orchestration: bounded regenerate-on-failure loops and batches.
//!
//! The orchestrator owns no I/O. Rule regeneration is delegated to a
//! [`RuleGenerator`] collaborator through explicit request/response records;
//! each generation call runs under a timeout, and every failure burns retry
//! budget so the loop always terminates.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::cancel::CancelFlag;
use crate::error::{EvalError, Result};
use crate::rule::CandidateRule;
use crate::session::{SessionOutcome, SessionState, Termination, ValidationSession};
use crate::validator::Validator;
use crate::verdict::ValidationVerdict;

/// What the upstream content risk scan decided about a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskGateAction {
    Allow,
    Flag,
    Block,
}

/// The structured feedback handed to the generation collaborator when a
/// rule needs another attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub rule_name: String,
    /// 1-based number of the attempt the replacement is for.
    pub attempt: u32,
    /// The verdict the previous candidate earned.
    pub feedback: ValidationVerdict,
}

/// Produces a replacement candidate rule from validation feedback.
///
/// Implementations wrap whatever actually writes rules (a generative model,
/// a template engine, a human queue). The orchestrator only sees the record
/// exchange.
#[async_trait]
pub trait RuleGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<CandidateRule>;
}

#[async_trait]
impl<G: RuleGenerator + ?Sized> RuleGenerator for Arc<G> {
    async fn generate(&self, request: &GenerationRequest) -> Result<CandidateRule> {
        (**self).generate(request).await
    }
}

/// Orchestration knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Validation attempts per rule before terminal rejection.
    pub max_retries: u32,
    /// Budget for one generation call.
    pub generation_timeout: Duration,
    /// Concurrent sessions in a batch.
    pub concurrency: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            max_retries: 3,
            generation_timeout: Duration::from_secs(30),
            concurrency: 4,
        }
    }
}

/// Drives validation sessions to a terminal state.
pub struct Orchestrator<G> {
    validator: Validator,
    generator: G,
    config: OrchestratorConfig,
}

impl<G: RuleGenerator> Orchestrator<G> {
    pub fn new(validator: Validator, generator: G, config: OrchestratorConfig) -> Self {
        Orchestrator {
            validator,
            generator,
            config,
        }
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Validate one rule to a terminal state, regenerating on non-approval
    /// while retry budget remains.
    ///
    /// Cancellation and budget exhaustion are ordinary outcomes (`Rejected`
    /// with notes), not errors; `Err` is reserved for conditions outside the
    /// session, which currently do not arise here.
    pub async fn validate_rule(
        &self,
        rule: CandidateRule,
        cancel: &CancelFlag,
    ) -> Result<SessionOutcome> {
        let mut session = ValidationSession::new(rule.name.clone(), self.config.max_retries);
        let mut current = rule;

        'attempts: loop {
            if cancel.is_cancelled() {
                session.cancel();
                return Ok(session.into_outcome());
            }
            session.begin_attempt();
            let verdict = match self.validator.validate_cancellable(&current, cancel) {
                Ok(v) => v,
                Err(EvalError::Cancelled) => {
                    session.cancel();
                    return Ok(session.into_outcome());
                }
                Err(e) => return Err(e),
            };
            let feedback = verdict.clone();
            session.record(verdict);

            match session.state() {
                SessionState::Approved => {
                    info!(
                        rule = %feedback.rule_name,
                        attempts = session.attempts(),
                        "rule approved"
                    );
                    return Ok(session.into_outcome());
                }
                SessionState::Rejected => {
                    warn!(
                        rule = %feedback.rule_name,
                        attempts = session.attempts(),
                        "rule rejected, retry budget exhausted"
                    );
                    return Ok(session.into_outcome());
                }
                // Revising: ask the collaborator for a replacement. Failed
                // or timed-out generation calls burn budget too, so this
                // inner loop is bounded by the same counter.
                _ => loop {
                    if cancel.is_cancelled() {
                        session.cancel();
                        return Ok(session.into_outcome());
                    }
                    let request = GenerationRequest {
                        rule_name: feedback.rule_name.clone(),
                        attempt: session.attempts() + 1,
                        feedback: feedback.clone(),
                    };
                    let generated = tokio::time::timeout(
                        self.config.generation_timeout,
                        self.generator.generate(&request),
                    )
                    .await;
                    match generated {
                        Ok(Ok(replacement)) => {
                            current = replacement;
                            session.resume();
                            continue 'attempts;
                        }
                        Ok(Err(e)) => {
                            warn!(rule = %request.rule_name, error = %e, "generation failed");
                            session.note_generation_failure(format!("generation failed: {e}"));
                        }
                        Err(_) => {
                            warn!(rule = %request.rule_name, "generation timed out");
                            session.note_generation_timeout(self.config.generation_timeout);
                        }
                    }
                    if session.is_terminal() {
                        return Ok(session.into_outcome());
                    }
                },
            }
        }
    }

    /// Validate a batch of rules as independent sessions, bounded by the
    /// configured concurrency limit.
    ///
    /// A `Block` risk gate short-circuits the whole batch before any
    /// validation; `Flag` proceeds with a logged warning.
    pub async fn validate_batch(
        &self,
        rules: Vec<CandidateRule>,
        gate: RiskGateAction,
        cancel: &CancelFlag,
    ) -> Result<Vec<SessionOutcome>> {
        match gate {
            RiskGateAction::Block => return Err(EvalError::Blocked),
            RiskGateAction::Flag => {
                warn!(rules = rules.len(), "risk gate flagged the batch, proceeding");
            }
            RiskGateAction::Allow => {}
        }

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let tasks = rules.into_iter().map(|rule| {
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return Err(EvalError::Cancelled),
                };
                self.validate_rule(rule, &cancel).await
            }
        });

        futures::future::join_all(tasks).await.into_iter().collect()
    }
}

/// Unwrap an outcome into its approved verdict, or the error that explains
/// why the rule never got there.
pub fn require_approved(outcome: SessionOutcome) -> Result<ValidationVerdict> {
    if outcome.is_approved() {
        if let Some(verdict) = outcome.history.last() {
            return Ok(verdict.clone());
        }
    }
    match outcome.termination {
        Some(Termination::Cancelled) => Err(EvalError::Cancelled),
        Some(Termination::GenerationTimeout { after }) => Err(EvalError::Timeout(after)),
        Some(Termination::BudgetExhausted) | None => Err(EvalError::RetryBudgetExhausted {
            attempts: outcome.attempts,
        }),
    }
}
