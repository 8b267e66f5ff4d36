//! Query AST.
//!
//! A parsed query is a tree of boolean nodes over field/pattern leaves. The
//! tree is owned by the [`Query`] it was parsed from and is never mutated;
//! re-validation reparses from source.

use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::pattern::{MatchKind, Pattern};

/// One `field:pattern` leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldPattern {
    /// Dotted field path, e.g. `process.command_line`.
    pub field: String,
    pub pattern: Pattern,
    /// Wildcard shape, classified once at parse time.
    pub kind: MatchKind,
}

impl FieldPattern {
    pub fn new(field: String, pattern: Pattern) -> Self {
        let kind = pattern.kind();
        FieldPattern {
            field,
            pattern,
            kind,
        }
    }
}

impl fmt::Display for FieldPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.pattern)
    }
}

/// A node in the query tree.
///
/// `And`/`Or` are n-ary and flattened: `a AND b AND c` parses to a single
/// `And` with three children. Explicit parentheses are preserved as `Group`
/// nodes so the printed tree round-trips the author's precedence intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum QueryNode {
    And(Vec<QueryNode>),
    Or(Vec<QueryNode>),
    Not(Box<QueryNode>),
    Group(Box<QueryNode>),
    Field(FieldPattern),
}

impl QueryNode {
    /// Visit every `FieldPattern` leaf in evaluation order.
    pub fn walk_fields<'a>(&'a self, visit: &mut impl FnMut(&'a FieldPattern)) {
        match self {
            QueryNode::And(children) | QueryNode::Or(children) => {
                for child in children {
                    child.walk_fields(visit);
                }
            }
            QueryNode::Not(child) | QueryNode::Group(child) => child.walk_fields(visit),
            QueryNode::Field(fp) => visit(fp),
        }
    }
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(
            f: &mut fmt::Formatter<'_>,
            children: &[QueryNode],
            sep: &str,
        ) -> fmt::Result {
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    write!(f, " {sep} ")?;
                }
                write!(f, "{child}")?;
            }
            Ok(())
        }

        match self {
            QueryNode::And(children) => join(f, children, "AND"),
            QueryNode::Or(children) => join(f, children, "OR"),
            QueryNode::Not(child) => write!(f, "NOT {child}"),
            QueryNode::Group(child) => write!(f, "({child})"),
            QueryNode::Field(fp) => write!(f, "{fp}"),
        }
    }
}

/// A parsed query: raw source plus the AST it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    raw: String,
    ast: QueryNode,
}

impl Query {
    /// Parse a query string. Deterministic: the same input yields a
    /// structurally identical AST or an identical error.
    pub fn parse(input: &str) -> Result<Query> {
        crate::parser::parse_query(input)
    }

    pub(crate) fn from_parts(raw: String, ast: QueryNode) -> Self {
        Query { raw, ast }
    }

    /// The original query string.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn ast(&self) -> &QueryNode {
        &self.ast
    }

    /// Every field path the query references, deduplicated, in first-seen
    /// order. Feeds the field-mapping validation stage.
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        self.ast.walk_fields(&mut |fp| {
            if !seen.contains(&fp.field.as_str()) {
                seen.push(fp.field.as_str());
            }
        });
        seen
    }

    /// Every `FieldPattern` leaf, in evaluation order.
    pub fn field_patterns(&self) -> Vec<&FieldPattern> {
        let mut out = Vec::new();
        self.ast.walk_fields(&mut |fp| out.push(fp));
        out
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ast)
    }
}
