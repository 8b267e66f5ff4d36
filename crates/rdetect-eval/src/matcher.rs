//! Compiled query evaluation against documents.
//!
//! Queries are compiled once against a [`FieldCatalog`] and then matched any
//! number of times. Wildcard patterns compile to anchored regexes (escape
//! plain text, `*` becomes `.*`); plain patterns on exact fields stay
//! literal string comparisons on the hot path.
//!
//! Type mismatches are match results, not errors: a wildcard pattern on a
//! numeric field evaluates false, an absent field evaluates false, and `NOT`
//! inverts both.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use rdetect_parser::{FieldPattern, PatternPart, Query, QueryNode};

use crate::catalog::{FieldCatalog, FieldDataType, FieldMode, FieldSpec};
use crate::document::{Document, FieldValue};
use crate::error::Result;

/// One field term that evaluated true, with the stored value it hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldTrace {
    pub field: String,
    pub pattern: String,
    pub value: Value,
}

/// The outcome of matching one query against one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub matched: bool,
    /// Field terms that evaluated true, in evaluation order. Short-circuited
    /// branches leave no trace.
    pub trace: Vec<FieldTrace>,
}

/// Build the anchored regex source for a wildcard pattern.
///
/// `*` is "zero or more characters" with no delimiter sensitivity, so the
/// regex runs in dot-matches-newline mode.
pub fn pattern_to_regex(parts: &[PatternPart], case_insensitive: bool) -> String {
    let mut source = String::from(if case_insensitive { "(?is)" } else { "(?s)" });
    source.push('^');
    for part in parts {
        match part {
            PatternPart::Text(text) => source.push_str(&regex::escape(text)),
            PatternPart::Wildcard => source.push_str(".*"),
        }
    }
    source.push('$');
    source
}

/// A query compiled against a catalog, ready for repeated matching.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    root: CompiledNode,
}

impl CompiledQuery {
    /// Compile a parsed query. Field modes and data types come from the
    /// catalog; a field absent from the catalog gets exact keyword semantics.
    pub fn compile(query: &Query, catalog: &FieldCatalog) -> Result<Self> {
        let root = compile_node(query.ast(), catalog)?;
        Ok(CompiledQuery { root })
    }

    /// Match one document. Deterministic: children evaluate left to right
    /// with short-circuiting.
    pub fn matches(&self, doc: &Document) -> MatchOutcome {
        let mut trace = Vec::new();
        let matched = self.root.eval(doc, &mut trace);
        MatchOutcome { matched, trace }
    }
}

/// One-shot convenience: compile and match in a single call.
pub fn match_query(
    query: &Query,
    doc: &Document,
    catalog: &FieldCatalog,
) -> Result<MatchOutcome> {
    Ok(CompiledQuery::compile(query, catalog)?.matches(doc))
}

#[derive(Debug, Clone)]
enum CompiledNode {
    And(Vec<CompiledNode>),
    Or(Vec<CompiledNode>),
    Not(Box<CompiledNode>),
    Field(CompiledField),
}

fn compile_node(node: &QueryNode, catalog: &FieldCatalog) -> Result<CompiledNode> {
    Ok(match node {
        QueryNode::And(children) => CompiledNode::And(
            children
                .iter()
                .map(|c| compile_node(c, catalog))
                .collect::<Result<_>>()?,
        ),
        QueryNode::Or(children) => CompiledNode::Or(
            children
                .iter()
                .map(|c| compile_node(c, catalog))
                .collect::<Result<_>>()?,
        ),
        QueryNode::Not(child) => CompiledNode::Not(Box::new(compile_node(child, catalog)?)),
        // Grouping only affects parse shape
        QueryNode::Group(child) => compile_node(child, catalog)?,
        QueryNode::Field(fp) => CompiledNode::Field(CompiledField::compile(fp, catalog)?),
    })
}

impl CompiledNode {
    fn eval(&self, doc: &Document, trace: &mut Vec<FieldTrace>) -> bool {
        match self {
            CompiledNode::And(children) => children.iter().all(|c| c.eval(doc, trace)),
            CompiledNode::Or(children) => children.iter().any(|c| c.eval(doc, trace)),
            CompiledNode::Not(child) => !child.eval(doc, trace),
            CompiledNode::Field(cf) => {
                // Multi-valued fields: any stored value matching is a match
                for value in doc.values(&cf.field) {
                    if cf.value_matches(value) {
                        trace.push(FieldTrace {
                            field: cf.field.clone(),
                            pattern: cf.original.clone(),
                            value: value.to_json(),
                        });
                        return true;
                    }
                }
                false
            }
        }
    }
}

/// One compiled `field:pattern` term.
#[derive(Debug, Clone)]
struct CompiledField {
    field: String,
    /// Pattern source text, for traces.
    original: String,
    mode: FieldMode,
    data_type: FieldDataType,
    matcher: ValueMatcher,
    /// Plain pattern text, when the pattern has no wildcards.
    plain: Option<String>,
    /// Plain pattern parsed as a number, for Long/Float/Date fields.
    numeric: Option<f64>,
}

#[derive(Debug, Clone)]
enum ValueMatcher {
    /// Case-sensitive literal comparison (plain pattern on an exact field).
    Literal(String),
    /// Anchored regex (wildcard pattern, or anything on an analyzed field).
    Regex(Regex),
}

impl CompiledField {
    fn compile(fp: &FieldPattern, catalog: &FieldCatalog) -> Result<Self> {
        let spec = catalog
            .get(&fp.field)
            .copied()
            .unwrap_or(FieldSpec::new(FieldMode::Exact, FieldDataType::Keyword));
        let plain = fp.pattern.as_plain();
        let analyzed = spec.mode == FieldMode::Analyzed;

        let matcher = match (&plain, analyzed) {
            (Some(text), false) => ValueMatcher::Literal(text.clone()),
            _ => ValueMatcher::Regex(Regex::new(&pattern_to_regex(
                &fp.pattern.parts,
                analyzed,
            ))?),
        };

        Ok(CompiledField {
            field: fp.field.clone(),
            original: fp.pattern.original.clone(),
            mode: spec.mode,
            data_type: spec.data_type,
            matcher,
            numeric: plain.as_deref().and_then(|t| t.parse::<f64>().ok()),
            plain,
        })
    }

    fn value_matches(&self, value: &FieldValue) -> bool {
        match value {
            FieldValue::Null => false,
            FieldValue::Bool(b) => self.plain.as_deref() == Some(if *b { "true" } else { "false" }),
            FieldValue::Number(n) => self.match_number(*n),
            FieldValue::String(s) => self.match_string(s),
        }
    }

    fn match_number(&self, n: f64) -> bool {
        match self.data_type {
            FieldDataType::Long | FieldDataType::Float | FieldDataType::Date => {
                self.numeric.is_some_and(|expected| expected == n)
            }
            // A number stored under a keyword-typed field compares through
            // its canonical string rendering
            _ => self.match_string(&format_number(n)),
        }
    }

    fn match_string(&self, s: &str) -> bool {
        match self.data_type {
            FieldDataType::Long | FieldDataType::Float => self
                .numeric
                .is_some_and(|expected| s.parse::<f64>().ok() == Some(expected)),
            // Dates compare literally; wildcards over timestamps are a type
            // mismatch and evaluate false
            FieldDataType::Date => self.plain.as_deref() == Some(s),
            _ => match self.mode {
                FieldMode::Analyzed => self.analyzed_match(s),
                _ => match &self.matcher {
                    ValueMatcher::Literal(expected) => s == expected,
                    ValueMatcher::Regex(re) => re.is_match(s),
                },
            },
        }
    }

    /// Analyzed semantics: the pattern matches the whole stored string, or
    /// any contiguous token sequence joined by single spaces.
    fn analyzed_match(&self, s: &str) -> bool {
        let ValueMatcher::Regex(re) = &self.matcher else {
            return false;
        };
        if re.is_match(s) {
            return true;
        }
        let tokens: Vec<&str> = s
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|t| !t.is_empty())
            .collect();
        for start in 0..tokens.len() {
            let mut joined = String::new();
            for (offset, token) in tokens[start..].iter().enumerate() {
                if offset > 0 {
                    joined.push(' ');
                }
                joined.push_str(token);
                if re.is_match(&joined) {
                    return true;
                }
            }
        }
        false
    }
}

/// Integers render without a trailing `.0` so `event.code:1` compares equal
/// to a stored numeric `1` on keyword fields.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
