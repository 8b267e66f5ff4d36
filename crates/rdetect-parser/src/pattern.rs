//! Wildcard pattern values and their cost classification.
//!
//! Term values use `*` as a multi-character wildcard ("zero or more
//! characters, no delimiter sensitivity"). Backslash `\` escapes the next
//! character and is always consumed, so `C\:\\Windows` parses to the literal
//! text `C:\Windows`.

use std::fmt;

use serde::Serialize;

/// A part of a [`Pattern`]: literal text or a multi-character wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PatternPart {
    Text(String),
    Wildcard,
}

/// Wildcard shape of a term value, in increasing evaluation cost.
///
/// The cost class feeds the scoring stage: a leading wildcard cannot use an
/// index prefix and a double-ended wildcard forces a full scan, so both carry
/// a performance-risk penalty downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchKind {
    /// No wildcards at all.
    Exact,
    /// Trailing or internal wildcards only (`value*`, `val*ue`); cheap.
    WildcardPrefix,
    /// A single leading wildcard (`*value`); costly.
    WildcardSuffix,
    /// Leading wildcard plus at least one more (`*value*`); most costly.
    WildcardInfix,
}

impl MatchKind {
    /// Returns `true` for the kinds that carry a performance-risk penalty.
    pub fn is_penalized(self) -> bool {
        matches!(self, MatchKind::WildcardSuffix | MatchKind::WildcardInfix)
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchKind::Exact => "exact",
            MatchKind::WildcardPrefix => "wildcard-prefix",
            MatchKind::WildcardSuffix => "wildcard-suffix",
            MatchKind::WildcardInfix => "wildcard-infix",
        };
        write!(f, "{s}")
    }
}

/// A term value that may contain wildcards.
///
/// The `original` string is the raw source text (escapes intact) so traces
/// and error messages can show what the rule author wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pattern {
    pub parts: Vec<PatternPart>,
    pub original: String,
}

impl Pattern {
    /// Parse a raw term value, interpreting `*` as a wildcard and `\` as an
    /// escape. The lexer has already rejected unescaped reserved characters,
    /// so every escaped character becomes a literal.
    pub fn parse(raw: &str) -> Self {
        let mut parts: Vec<PatternPart> = Vec::new();
        let mut acc = String::new();
        let mut escaped = false;

        for c in raw.chars() {
            if escaped {
                acc.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '*' {
                if !acc.is_empty() {
                    parts.push(PatternPart::Text(std::mem::take(&mut acc)));
                }
                parts.push(PatternPart::Wildcard);
            } else {
                acc.push(c);
            }
        }
        // Trailing backslash is a lexer error; by the time a value reaches
        // here the escape is always complete.
        if !acc.is_empty() {
            parts.push(PatternPart::Text(acc));
        }

        Pattern {
            parts,
            original: raw.to_string(),
        }
    }

    /// Build a pattern from literal text with no wildcard interpretation
    /// (quoted phrases).
    pub fn literal(text: &str) -> Self {
        Pattern {
            parts: if text.is_empty() {
                Vec::new()
            } else {
                vec![PatternPart::Text(text.to_string())]
            },
            original: format!("\"{text}\""),
        }
    }

    /// Classify the wildcard shape of this pattern.
    ///
    /// A leading wildcard alone is `WildcardSuffix`; a leading wildcard plus
    /// any other is `WildcardInfix`; any other wildcard placement (trailing
    /// or internal) is `WildcardPrefix`.
    pub fn kind(&self) -> MatchKind {
        let wildcards = self
            .parts
            .iter()
            .filter(|p| matches!(p, PatternPart::Wildcard))
            .count();
        if wildcards == 0 {
            return MatchKind::Exact;
        }
        let leading = matches!(self.parts.first(), Some(PatternPart::Wildcard));
        let trailing = matches!(self.parts.last(), Some(PatternPart::Wildcard));
        if leading && (trailing || wildcards >= 2) {
            MatchKind::WildcardInfix
        } else if leading {
            MatchKind::WildcardSuffix
        } else {
            MatchKind::WildcardPrefix
        }
    }

    /// Returns `true` if the pattern contains no wildcards.
    pub fn is_plain(&self) -> bool {
        self.parts
            .iter()
            .all(|p| matches!(p, PatternPart::Text(_)))
    }

    /// The literal content, or `None` if the pattern has wildcards.
    pub fn as_plain(&self) -> Option<String> {
        if !self.is_plain() {
            return None;
        }
        Some(
            self.parts
                .iter()
                .filter_map(|p| match p {
                    PatternPart::Text(s) => Some(s.as_str()),
                    PatternPart::Wildcard => None,
                })
                .collect(),
        )
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}
