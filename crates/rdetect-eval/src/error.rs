//! Evaluation- and orchestration-layer error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during compilation, rule loading, or orchestration.
///
/// Per-case and per-field validation defects are not errors: they accumulate
/// as [`Failure`](crate::verdict::Failure) entries inside a verdict. This
/// enum covers the conditions that abort an attempt or a batch.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The rule query failed to parse.
    #[error("query error: {0}")]
    Parse(#[from] rdetect_parser::ParseError),

    /// A wildcard pattern compiled to an invalid regex.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A rule or catalog file could not be loaded.
    #[error("failed to load {path}: {message}")]
    Rule { path: String, message: String },

    /// The generation collaborator did not answer within the budget.
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    /// The generation collaborator answered with an error.
    #[error("generation failed: {0}")]
    Generator(String),

    /// The session was cancelled between validation stages.
    #[error("validation cancelled")]
    Cancelled,

    /// Every retry was spent without reaching an approval.
    #[error("retry budget exhausted after {attempts} attempts")]
    RetryBudgetExhausted { attempts: u32 },

    /// The content risk gate blocked the batch before validation.
    #[error("batch blocked by risk gate")]
    Blocked,

    /// An underlying I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, EvalError>;
