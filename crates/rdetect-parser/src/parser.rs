//! Recursive parser for the query language.
//!
//! Precedence, highest to lowest: `NOT` > `AND` > `OR`; explicit parentheses
//! override. Two documented policy choices (the source language leaves both
//! open):
//!
//! - adjacency between clauses with no operator is an implicit `AND`
//!   (`a:1 b:2` ≡ `a:1 AND b:2`);
//! - the boolean keywords are case-sensitive; lowercase `and`/`or`/`not`
//!   are ordinary term text.
//!
//! The grouped-value shorthand `field:(p1 OR p2)` expands to
//! `Or(field:p1, field:p2)`; `AND` (or adjacency) inside the group expands
//! to `And` over the same field.

use crate::ast::{FieldPattern, Query, QueryNode};
use crate::error::{ParseError, ParseReason, Result};
use crate::lexer::{SpannedToken, Token, lex};
use crate::pattern::Pattern;

/// Parse a query string into a [`Query`].
pub fn parse_query(input: &str) -> Result<Query> {
    let tokens = lex(input)?;
    if tokens.is_empty() {
        return Err(ParseError::new(0, ParseReason::EmptyQuery));
    }

    let mut parser = Parser { tokens, cursor: 0 };
    let ast = parser.parse_or()?;

    if let Some(tok) = parser.peek() {
        // Stray closing paren or similar trailing garbage.
        return Err(ParseError::new(
            tok.pos,
            ParseReason::UnexpectedToken(tok.token.describe()),
        ));
    }

    Ok(Query::from_parts(input.to_string(), ast))
}

struct Parser {
    tokens: Vec<SpannedToken>,
    cursor: usize,
}

impl Parser {
    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.cursor)
    }

    fn next(&mut self) -> Option<SpannedToken> {
        let tok = self.tokens.get(self.cursor).cloned();
        if tok.is_some() {
            self.cursor += 1;
        }
        tok
    }

    fn end_pos(&self) -> usize {
        self.tokens.last().map(|t| t.pos).unwrap_or(0)
    }

    // -- boolean expression levels ---------------------------------------

    fn parse_or(&mut self) -> Result<QueryNode> {
        let mut node = self.parse_and()?;
        while matches!(self.peek(), Some(t) if t.token == Token::Or) {
            self.next();
            let rhs = self.parse_and()?;
            node = merge(QueryNode::Or, node, rhs);
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<QueryNode> {
        let mut node = self.parse_not()?;
        loop {
            match self.peek().map(|t| &t.token) {
                Some(Token::And) => {
                    self.next();
                    let rhs = self.parse_not()?;
                    node = merge(QueryNode::And, node, rhs);
                }
                // Implicit AND: the next token starts a new clause.
                Some(Token::Not | Token::LParen | Token::Field(_)) => {
                    let rhs = self.parse_not()?;
                    node = merge(QueryNode::And, node, rhs);
                }
                // A bare word here would also start a clause, but a clause
                // without a field qualifier is an error; let parse_not
                // surface it with the right position.
                Some(Token::Word(_) | Token::Phrase(_)) => {
                    let rhs = self.parse_not()?;
                    node = merge(QueryNode::And, node, rhs);
                }
                _ => break,
            }
        }
        Ok(node)
    }

    fn parse_not(&mut self) -> Result<QueryNode> {
        if matches!(self.peek(), Some(t) if t.token == Token::Not) {
            self.next();
            let inner = self.parse_not()?;
            return Ok(QueryNode::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<QueryNode> {
        let Some(tok) = self.next() else {
            return Err(ParseError::new(self.end_pos(), ParseReason::UnexpectedEnd));
        };

        match tok.token {
            Token::LParen => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(t) if t.token == Token::RParen => {
                        Ok(QueryNode::Group(Box::new(inner)))
                    }
                    _ => Err(ParseError::new(tok.pos, ParseReason::UnbalancedParen)),
                }
            }
            Token::Field(name) => self.parse_value(name, tok.pos),
            Token::Word(w) => Err(ParseError::new(tok.pos, ParseReason::TermWithoutField(w))),
            Token::Phrase(p) => {
                Err(ParseError::new(tok.pos, ParseReason::TermWithoutField(p)))
            }
            other => Err(ParseError::new(
                tok.pos,
                ParseReason::UnexpectedToken(other.describe()),
            )),
        }
    }

    // -- field values ----------------------------------------------------

    /// Parse the value following `field:`, which is a bare pattern, a quoted phrase,
    /// or a parenthesized value group.
    fn parse_value(&mut self, field: String, field_pos: usize) -> Result<QueryNode> {
        match self.peek().map(|t| t.token.clone()) {
            Some(Token::Word(w)) => {
                self.next();
                Ok(field_node(&field, Pattern::parse(&w)))
            }
            Some(Token::Phrase(p)) => {
                self.next();
                Ok(field_node(&field, Pattern::literal(&p)))
            }
            Some(Token::LParen) => {
                let open_pos = self.peek().map(|t| t.pos).unwrap_or(field_pos);
                self.next();
                let node = self.parse_value_or(&field)?;
                match self.next() {
                    Some(t) if t.token == Token::RParen => Ok(node),
                    _ => Err(ParseError::new(open_pos, ParseReason::UnbalancedParen)),
                }
            }
            _ => Err(ParseError::new(field_pos, ParseReason::MissingValue(field))),
        }
    }

    fn parse_value_or(&mut self, field: &str) -> Result<QueryNode> {
        let mut node = self.parse_value_and(field)?;
        while matches!(self.peek(), Some(t) if t.token == Token::Or) {
            self.next();
            let rhs = self.parse_value_and(field)?;
            node = merge(QueryNode::Or, node, rhs);
        }
        Ok(node)
    }

    fn parse_value_and(&mut self, field: &str) -> Result<QueryNode> {
        let mut node = self.parse_value_atom(field)?;
        loop {
            match self.peek().map(|t| &t.token) {
                Some(Token::And) => {
                    self.next();
                    let rhs = self.parse_value_atom(field)?;
                    node = merge(QueryNode::And, node, rhs);
                }
                Some(Token::Word(_) | Token::Phrase(_)) => {
                    let rhs = self.parse_value_atom(field)?;
                    node = merge(QueryNode::And, node, rhs);
                }
                _ => break,
            }
        }
        Ok(node)
    }

    fn parse_value_atom(&mut self, field: &str) -> Result<QueryNode> {
        let Some(tok) = self.next() else {
            return Err(ParseError::new(self.end_pos(), ParseReason::UnexpectedEnd));
        };
        match tok.token {
            Token::Word(w) => Ok(field_node(field, Pattern::parse(&w))),
            Token::Phrase(p) => Ok(field_node(field, Pattern::literal(&p))),
            other => Err(ParseError::new(
                tok.pos,
                ParseReason::UnexpectedToken(other.describe()),
            )),
        }
    }
}

fn field_node(field: &str, pattern: Pattern) -> QueryNode {
    QueryNode::Field(FieldPattern::new(field.to_string(), pattern))
}

/// Fold a right-hand side into an n-ary And/Or, flattening nested operators
/// of the same kind: `a AND (b AND c)` without parens becomes one `And` with
/// three children rather than a nested pair.
fn merge(
    ctor: fn(Vec<QueryNode>) -> QueryNode,
    lhs: QueryNode,
    rhs: QueryNode,
) -> QueryNode {
    let same = |node: &QueryNode| -> bool {
        matches!(
            (&ctor(Vec::new()), node),
            (QueryNode::And(_), QueryNode::And(_)) | (QueryNode::Or(_), QueryNode::Or(_))
        )
    };

    let mut children = Vec::new();
    for node in [lhs, rhs] {
        if same(&node) {
            match node {
                QueryNode::And(inner) | QueryNode::Or(inner) => children.extend(inner),
                _ => unreachable!(),
            }
        } else {
            children.push(node);
        }
    }
    ctor(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::MatchKind;

    fn field(path: &str, raw: &str) -> QueryNode {
        field_node(path, Pattern::parse(raw))
    }

    #[test]
    fn single_term() {
        let q = parse_query("process.name:vssadmin.exe").unwrap();
        assert_eq!(q.ast(), &field("process.name", "vssadmin.exe"));
    }

    #[test]
    fn and_flattened() {
        let q = parse_query("a:1 AND b:2 AND c:3").unwrap();
        assert_eq!(
            q.ast(),
            &QueryNode::And(vec![field("a", "1"), field("b", "2"), field("c", "3")])
        );
    }

    #[test]
    fn implicit_adjacency_is_and() {
        let q = parse_query("a:1 b:2").unwrap();
        assert_eq!(
            q.ast(),
            &QueryNode::And(vec![field("a", "1"), field("b", "2")])
        );
    }

    #[test]
    fn precedence_not_and_or() {
        // "a:1 OR NOT b:2 AND c:3" parses as "a:1 OR ((NOT b:2) AND c:3)"
        let q = parse_query("a:1 OR NOT b:2 AND c:3").unwrap();
        assert_eq!(
            q.ast(),
            &QueryNode::Or(vec![
                field("a", "1"),
                QueryNode::And(vec![
                    QueryNode::Not(Box::new(field("b", "2"))),
                    field("c", "3"),
                ]),
            ])
        );
    }

    #[test]
    fn parens_override_precedence() {
        let q = parse_query("(a:1 OR b:2) AND c:3").unwrap();
        assert_eq!(
            q.ast(),
            &QueryNode::And(vec![
                QueryNode::Group(Box::new(QueryNode::Or(vec![
                    field("a", "1"),
                    field("b", "2"),
                ]))),
                field("c", "3"),
            ])
        );
    }

    #[test]
    fn grouped_value_expands_to_or() {
        let q = parse_query("process.command_line:(*delete*shadows* OR *shadowcopy*delete*)")
            .unwrap();
        assert_eq!(
            q.ast(),
            &QueryNode::Or(vec![
                field("process.command_line", "*delete*shadows*"),
                field("process.command_line", "*shadowcopy*delete*"),
            ])
        );
    }

    #[test]
    fn grouped_value_implicit_and() {
        let q = parse_query("msg:(foo bar)").unwrap();
        assert_eq!(
            q.ast(),
            &QueryNode::And(vec![field("msg", "foo"), field("msg", "bar")])
        );
    }

    #[test]
    fn not_over_term() {
        let q = parse_query("NOT process.parent.name:explorer.exe").unwrap();
        assert_eq!(
            q.ast(),
            &QueryNode::Not(Box::new(field("process.parent.name", "explorer.exe")))
        );
    }

    #[test]
    fn double_negation() {
        let q = parse_query("NOT NOT a:1").unwrap();
        assert_eq!(
            q.ast(),
            &QueryNode::Not(Box::new(QueryNode::Not(Box::new(field("a", "1")))))
        );
    }

    #[test]
    fn wildcard_kinds_recorded() {
        let q = parse_query("a:x* b:*x c:*x*").unwrap();
        let patterns = q.field_patterns();
        assert_eq!(patterns[0].kind, MatchKind::WildcardPrefix);
        assert_eq!(patterns[1].kind, MatchKind::WildcardSuffix);
        assert_eq!(patterns[2].kind, MatchKind::WildcardInfix);
    }

    #[test]
    fn referenced_fields_dedup_ordered() {
        let q = parse_query("b:1 a:2 b:3").unwrap();
        assert_eq!(q.referenced_fields(), vec!["b", "a"]);
    }

    #[test]
    fn idempotent_parse() {
        let input = "event.code:1 AND process.name:*vssadmin* AND \
                     process.command_line:(*delete*shadows* OR *shadowcopy*delete*)";
        let a = parse_query(input).unwrap();
        let b = parse_query(input).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn term_without_field_fails() {
        let err = parse_query("vssadmin").unwrap_err();
        assert_eq!(
            err.reason,
            ParseReason::TermWithoutField("vssadmin".to_string())
        );
        assert_eq!(err.position, 0);
    }

    #[test]
    fn missing_value_fails() {
        let err = parse_query("process.name: AND a:1").unwrap_err();
        assert_eq!(
            err.reason,
            ParseReason::MissingValue("process.name".to_string())
        );
    }

    #[test]
    fn trailing_operator_fails() {
        let err = parse_query("a:1 AND").unwrap_err();
        assert_eq!(err.reason, ParseReason::UnexpectedEnd);
    }

    #[test]
    fn unbalanced_parens_fail() {
        let err = parse_query("(a:1 AND b:2").unwrap_err();
        assert_eq!(err.reason, ParseReason::UnbalancedParen);
        assert_eq!(err.position, 0);

        let err = parse_query("a:1)").unwrap_err();
        assert_eq!(err.reason, ParseReason::UnexpectedToken(")".to_string()));
    }

    #[test]
    fn display_round_trip() {
        let q = parse_query("(a:1 OR b:*x*) AND NOT c:3").unwrap();
        assert_eq!(q.to_string(), "(a:1 OR b:*x*) AND NOT c:3");
    }
}
