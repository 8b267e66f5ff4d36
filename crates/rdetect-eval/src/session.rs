//! Per-rule validation session: the bounded retry state machine.
//!
//! `Pending → Parsing → Matching → Scoring → {Approved | Revising | Rejected}`
//! with `Revising → Pending` on resume. `Revising` is only reachable while
//! the attempt counter is under the retry budget; an exhausted budget lands
//! in terminal `Rejected` with the full verdict history attached.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::score::Recommendation;
use crate::verdict::ValidationVerdict;

/// Where a session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Pending,
    Parsing,
    Matching,
    Scoring,
    Approved,
    Revising,
    Rejected,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Approved | SessionState::Rejected)
    }
}

/// Why a session landed in terminal `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The caller raised the cancellation flag mid-session.
    Cancelled,
    /// Every retry was spent on verdicts or failed generation calls.
    BudgetExhausted,
    /// The final retry was spent on a generation call that exceeded its
    /// time budget.
    GenerationTimeout { after: Duration },
}

/// The summary a finished session hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub rule_name: String,
    pub state: SessionState,
    pub attempts: u32,
    /// Every verdict produced, oldest first.
    pub history: Vec<ValidationVerdict>,
    /// Generation failures, cancellations, and budget notes.
    pub notes: Vec<String>,
    /// Set on rejection; `None` for approved sessions.
    pub termination: Option<Termination>,
}

impl SessionOutcome {
    pub fn is_approved(&self) -> bool {
        self.state == SessionState::Approved
    }

    pub fn final_verdict(&self) -> Option<&ValidationVerdict> {
        self.history.last()
    }
}

/// Tracks one rule through validation attempts.
#[derive(Debug, Clone)]
pub struct ValidationSession {
    rule_name: String,
    max_retries: u32,
    attempts: u32,
    state: SessionState,
    history: Vec<ValidationVerdict>,
    notes: Vec<String>,
    termination: Option<Termination>,
}

impl ValidationSession {
    pub fn new(rule_name: impl Into<String>, max_retries: u32) -> Self {
        ValidationSession {
            rule_name: rule_name.into(),
            max_retries,
            attempts: 0,
            state: SessionState::Pending,
            history: Vec::new(),
            notes: Vec::new(),
            termination: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Start a validation attempt: `Pending → Parsing`, consuming one unit
    /// of the retry budget.
    pub fn begin_attempt(&mut self) {
        debug_assert_eq!(self.state, SessionState::Pending);
        self.attempts += 1;
        self.state = SessionState::Parsing;
        debug!(rule = %self.rule_name, attempt = self.attempts, "attempt started");
    }

    /// Record a finished verdict, walking `Parsing → Matching → Scoring`
    /// into the terminal or revising state.
    pub fn record(&mut self, verdict: ValidationVerdict) {
        self.state = SessionState::Matching;
        debug!(rule = %self.rule_name, state = ?self.state, "cases executed");
        self.state = SessionState::Scoring;
        debug!(rule = %self.rule_name, state = ?self.state, "scores aggregated");
        self.state = match verdict.recommendation {
            Recommendation::Approve => SessionState::Approved,
            Recommendation::Revise | Recommendation::Reject => {
                if self.attempts < self.max_retries {
                    SessionState::Revising
                } else {
                    self.notes.push(format!(
                        "retry budget exhausted after {} attempts",
                        self.attempts
                    ));
                    self.termination = Some(Termination::BudgetExhausted);
                    SessionState::Rejected
                }
            }
        };
        debug!(
            rule = %self.rule_name,
            state = ?self.state,
            overall = verdict.scores.overall,
            "verdict recorded"
        );
        self.history.push(verdict);
    }

    /// Re-arm a revising session for its next attempt: `Revising → Pending`.
    pub fn resume(&mut self) {
        debug_assert_eq!(self.state, SessionState::Revising);
        self.state = SessionState::Pending;
    }

    /// A generation attempt failed before producing a replacement rule.
    /// Consumes one unit of the retry budget; exhaustion is terminal.
    pub fn note_generation_failure(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
        self.burn_retry(Termination::BudgetExhausted);
    }

    /// A generation call exceeded its time budget. Burns a retry unit like
    /// any other generation failure, but if that exhausts the budget the
    /// timeout is recorded as the typed termination reason.
    pub fn note_generation_timeout(&mut self, after: Duration) {
        self.notes.push(format!("generation timed out after {after:?}"));
        self.burn_retry(Termination::GenerationTimeout { after });
    }

    fn burn_retry(&mut self, reason: Termination) {
        self.attempts += 1;
        if self.attempts >= self.max_retries {
            self.notes.push(format!(
                "retry budget exhausted after {} attempts",
                self.attempts
            ));
            self.termination = Some(reason);
            self.state = SessionState::Rejected;
        }
    }

    /// Cancel the session: terminal `Rejected` with a note, whatever the
    /// current state.
    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            self.notes.push("session cancelled".to_string());
            self.termination = Some(Termination::Cancelled);
            self.state = SessionState::Rejected;
        }
    }

    pub fn into_outcome(self) -> SessionOutcome {
        SessionOutcome {
            rule_name: self.rule_name,
            state: self.state,
            attempts: self.attempts,
            history: self.history,
            notes: self.notes,
            termination: self.termination,
        }
    }
}
