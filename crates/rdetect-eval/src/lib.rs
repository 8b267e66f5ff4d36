//! # rdetect-eval
//!
//! Deterministic validation and test execution for detection rules.
//!
//! This crate consumes the query AST produced by [`rdetect_parser`] and
//! judges candidate rules against their own test suites using a
//! compile-then-evaluate model:
//!
//! - **Documents** are flattened JSON log entries with dotted-path access.
//! - **Matching** compiles a query once against a [`FieldCatalog`] and then
//!   evaluates documents deterministically, with a trace of the field terms
//!   that fired.
//! - **Validation** runs a rule's TP/FN/FP/TN test cases, aggregates
//!   component scores, and emits an immutable [`ValidationVerdict`] with an
//!   `APPROVE` / `REVISE` / `REJECT` recommendation.
//! - **Orchestration** drives bounded regenerate-on-failure sessions over an
//!   async [`RuleGenerator`] collaborator, with batch concurrency limits and
//!   cooperative cancellation.
//!
//! ## Quick start
//!
//! ```rust
//! use rdetect_parser::Query;
//! use rdetect_eval::{Document, FieldCatalog, match_query};
//! use serde_json::json;
//!
//! let query = Query::parse("event.code:1 AND process.name:*vssadmin*").unwrap();
//! let event = json!({
//!     "event": {"code": "1"},
//!     "process": {"name": "C:\\Windows\\System32\\vssadmin.exe"}
//! });
//! let doc = Document::from_json(&event);
//! let outcome = match_query(&query, &doc, &FieldCatalog::ecs_subset()).unwrap();
//! assert!(outcome.matched);
//! ```

pub mod cancel;
pub mod catalog;
pub mod document;
pub mod error;
pub mod matcher;
pub mod orchestrator;
pub mod rule;
pub mod runner;
pub mod score;
pub mod session;
pub mod validator;
pub mod verdict;

// Re-export the most commonly used types at crate root
pub use cancel::CancelFlag;
pub use catalog::{FieldCatalog, FieldDataType, FieldMode, FieldSpec};
pub use document::{Document, FieldValue};
pub use error::{EvalError, Result};
pub use matcher::{CompiledQuery, FieldTrace, MatchOutcome, match_query};
pub use orchestrator::{
    GenerationRequest, Orchestrator, OrchestratorConfig, RiskGateAction, RuleGenerator,
    require_approved,
};
pub use rule::{CandidateRule, TestCase, TestKind, load_rule_dir, load_rule_file};
pub use runner::{CaseResult, ConfusionMetrics};
pub use score::{Recommendation, ScoreWeights, Scores};
pub use session::{SessionOutcome, SessionState, Termination, ValidationSession};
pub use validator::Validator;
pub use verdict::{Failure, Stage, ValidationVerdict};
