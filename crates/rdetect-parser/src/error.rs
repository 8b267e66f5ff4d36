use thiserror::Error;

/// A query parse error, pinned to the byte offset where it was detected.
///
/// Parsing is deterministic: the same input always produces the same AST or
/// the same `ParseError`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at byte {position}: {reason}")]
pub struct ParseError {
    /// Byte offset into the query string.
    pub position: usize,
    /// What went wrong.
    pub reason: ParseReason,
}

impl ParseError {
    pub fn new(position: usize, reason: ParseReason) -> Self {
        ParseError { position, reason }
    }
}

/// The specific reason a query failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseReason {
    #[error("reserved character '{0}' must be escaped")]
    ReservedChar(char),

    #[error("dangling escape at end of input")]
    DanglingEscape,

    #[error("unterminated quoted phrase")]
    UnterminatedPhrase,

    #[error("empty field name before ':'")]
    EmptyFieldName,

    #[error("invalid field name '{0}'")]
    InvalidFieldName(String),

    #[error("term '{0}' has no field qualifier")]
    TermWithoutField(String),

    #[error("field '{0}' is missing a value")]
    MissingValue(String),

    #[error("unbalanced parenthesis")]
    UnbalancedParen,

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("unexpected end of query")]
    UnexpectedEnd,

    #[error("empty query")]
    EmptyQuery,
}

pub type Result<T> = std::result::Result<T, ParseError>;
