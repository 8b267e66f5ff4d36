//! # rdetect-parser
//!
//! Parser for the Lucene-style query language used by detection rules.
//!
//! Queries combine `field:pattern` terms with `AND` / `OR` / `NOT` (and the
//! `&&` / `||` aliases), parenthesized groups, quoted phrases, and the
//! grouped-value shorthand `field:(p1 OR p2)`. Patterns use `*` as a
//! multi-character wildcard; every other reserved character
//! (`+ - = && || > < ! ( ) { } [ ] ^ " ~ * ? : \ /`) must be escaped with a
//! backslash outside its structural position.
//!
//! Parsing is deterministic and total: the same input always yields a
//! structurally identical AST or the same [`ParseError`] with a byte
//! position.
//!
//! ## Quick start
//!
//! ```rust
//! use rdetect_parser::{MatchKind, Query};
//!
//! let q = Query::parse("event.code:1 AND process.name:*vssadmin*").unwrap();
//! assert_eq!(q.referenced_fields(), vec!["event.code", "process.name"]);
//! assert_eq!(q.field_patterns()[1].kind, MatchKind::WildcardInfix);
//! ```

pub mod ast;
pub mod error;
mod lexer;
pub mod parser;
pub mod pattern;

pub use ast::{FieldPattern, Query, QueryNode};
pub use error::{ParseError, ParseReason, Result};
pub use parser::parse_query;
pub use pattern::{MatchKind, Pattern, PatternPart};
