//! Byte-position token scanner for the query language.
//!
//! The scanner enforces the reserved-character rules at lex time so every
//! violation is reported with the exact byte offset:
//!
//! - `+ - = > < ! { } [ ] ^ ~ ? /` and lone `&` / `|` must be escaped with
//!   `\` wherever they appear in term text. `-` and `+` are rejected at
//!   clause-start positions (unsupported must/must-not prefixes) and allowed
//!   embedded, where they are ordinary text (`win-defender`).
//! - `*` is the wildcard character and is always allowed inside a value.
//! - `( ) : "` are structural: parentheses group, `:` ends a field name, and
//!   `"` delimits a phrase. Mid-word they must be escaped.
//! - `&&` and `||` are operator aliases for `AND` / `OR`.
//!
//! A character counts as escaped only when immediately preceded by an
//! unescaped backslash.

use crate::error::{ParseError, ParseReason, Result};

/// One lexed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    LParen,
    RParen,
    And,
    Or,
    Not,
    /// A `name:` field qualifier (colon consumed).
    Field(String),
    /// Bare term text with escapes preserved for [`Pattern`](crate::Pattern).
    Word(String),
    /// A quoted phrase, already unescaped to its literal text.
    Phrase(String),
}

impl Token {
    /// Human-readable rendering for error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::And => "AND".to_string(),
            Token::Or => "OR".to_string(),
            Token::Not => "NOT".to_string(),
            Token::Field(name) => format!("{name}:"),
            Token::Word(w) => w.clone(),
            Token::Phrase(p) => format!("\"{p}\""),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SpannedToken {
    pub token: Token,
    /// Byte offset of the token start.
    pub pos: usize,
}

/// Reserved characters that always terminate or poison a bare word.
/// `*` (wildcard), `-`/`+` (embedded text), and the structural characters
/// are handled separately.
fn is_rejected_in_word(c: char) -> bool {
    matches!(
        c,
        '=' | '>' | '<' | '!' | '{' | '}' | '[' | ']' | '^' | '~' | '?' | '/' | '&' | '|'
    )
}

fn is_valid_field_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | '@'))
}

/// Tokenize a query string.
pub(crate) fn lex(input: &str) -> Result<Vec<SpannedToken>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(SpannedToken {
                    token: Token::LParen,
                    pos,
                });
            }
            ')' => {
                chars.next();
                tokens.push(SpannedToken {
                    token: Token::RParen,
                    pos,
                });
            }
            '"' => {
                chars.next();
                let phrase = scan_phrase(&mut chars, pos)?;
                tokens.push(SpannedToken {
                    token: Token::Phrase(phrase),
                    pos,
                });
            }
            '&' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '&')) => {
                        chars.next();
                        tokens.push(SpannedToken {
                            token: Token::And,
                            pos,
                        });
                    }
                    _ => return Err(ParseError::new(pos, ParseReason::ReservedChar('&'))),
                }
            }
            '|' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '|')) => {
                        chars.next();
                        tokens.push(SpannedToken {
                            token: Token::Or,
                            pos,
                        });
                    }
                    _ => return Err(ParseError::new(pos, ParseReason::ReservedChar('|'))),
                }
            }
            '-' | '+' => {
                // Must/must-not clause prefixes are not part of this language.
                return Err(ParseError::new(pos, ParseReason::ReservedChar(c)));
            }
            ':' => return Err(ParseError::new(pos, ParseReason::EmptyFieldName)),
            c if is_rejected_in_word(c) => {
                return Err(ParseError::new(pos, ParseReason::ReservedChar(c)));
            }
            _ => scan_word(&mut chars, pos, &mut tokens)?,
        }
    }

    Ok(tokens)
}

/// Scan a quoted phrase after the opening `"`. Inside a phrase everything is
/// literal; `\"` and `\\` unescape, any other backslash is kept as text.
fn scan_phrase(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    open_pos: usize,
) -> Result<String> {
    let mut text = String::new();
    while let Some((_, c)) = chars.next() {
        match c {
            '"' => return Ok(text),
            '\\' => match chars.next() {
                Some((_, next @ ('"' | '\\'))) => text.push(next),
                Some((_, next)) => {
                    text.push('\\');
                    text.push(next);
                }
                None => return Err(ParseError::new(open_pos, ParseReason::UnterminatedPhrase)),
            },
            _ => text.push(c),
        }
    }
    Err(ParseError::new(open_pos, ParseReason::UnterminatedPhrase))
}

/// Scan a bare word starting at `start`. Emits a `Field` token when the word
/// ends in an unescaped `:`, a boolean keyword when the word is exactly
/// `AND` / `OR` / `NOT`, and a `Word` otherwise.
fn scan_word(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    start: usize,
    tokens: &mut Vec<SpannedToken>,
) -> Result<()> {
    let mut buf = String::new();
    let mut had_escape = false;

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => break,
            '(' | ')' => break,
            '\\' => {
                chars.next();
                match chars.next() {
                    Some((_, next)) => {
                        had_escape = true;
                        buf.push('\\');
                        buf.push(next);
                    }
                    None => return Err(ParseError::new(pos, ParseReason::DanglingEscape)),
                }
            }
            ':' => {
                chars.next();
                if buf.is_empty() {
                    return Err(ParseError::new(pos, ParseReason::EmptyFieldName));
                }
                if had_escape || !is_valid_field_name(&buf) {
                    return Err(ParseError::new(
                        start,
                        ParseReason::InvalidFieldName(buf),
                    ));
                }
                tokens.push(SpannedToken {
                    token: Token::Field(buf),
                    pos: start,
                });
                return Ok(());
            }
            '"' => return Err(ParseError::new(pos, ParseReason::ReservedChar('"'))),
            '*' => {
                chars.next();
                buf.push('*');
            }
            '&' | '|' => {
                // `a&&b` without spaces still reads as an operator boundary.
                break;
            }
            c if is_rejected_in_word(c) => {
                return Err(ParseError::new(pos, ParseReason::ReservedChar(c)));
            }
            _ => {
                chars.next();
                buf.push(c);
            }
        }
    }

    let token = match buf.as_str() {
        "AND" => Token::And,
        "OR" => Token::Or,
        "NOT" => Token::Not,
        _ => Token::Word(buf),
    };
    tokens.push(SpannedToken { token, pos: start });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        lex(input).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn simple_term() {
        assert_eq!(
            kinds("process.name:vssadmin.exe"),
            vec![
                Token::Field("process.name".to_string()),
                Token::Word("vssadmin.exe".to_string()),
            ]
        );
    }

    #[test]
    fn keywords_are_case_sensitive() {
        let toks = kinds("event.code:1 AND process.name:x");
        assert_eq!(toks[2], Token::And);
        // lowercase `and` is a plain word, not an operator
        let toks = kinds("event.code:1 and process.name:x");
        assert_eq!(toks[2], Token::Word("and".to_string()));
    }

    #[test]
    fn operator_aliases() {
        let toks = kinds("a:1 && b:2 || c:3");
        assert_eq!(toks[2], Token::And);
        assert_eq!(toks[5], Token::Or);
    }

    #[test]
    fn lone_ampersand_rejected() {
        let err = lex("a:1 & b:2").unwrap_err();
        assert_eq!(err.reason, ParseReason::ReservedChar('&'));
        assert_eq!(err.position, 4);
    }

    #[test]
    fn grouped_value() {
        assert_eq!(
            kinds("process.command_line:(*delete* OR *copy*)"),
            vec![
                Token::Field("process.command_line".to_string()),
                Token::LParen,
                Token::Word("*delete*".to_string()),
                Token::Or,
                Token::Word("*copy*".to_string()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn quoted_phrase() {
        assert_eq!(
            kinds(r#"process.command_line:"delete shadows /all""#),
            vec![
                Token::Field("process.command_line".to_string()),
                Token::Phrase("delete shadows /all".to_string()),
            ]
        );
    }

    #[test]
    fn phrase_escapes() {
        assert_eq!(
            kinds(r#"f:"say \"hi\"""#),
            vec![
                Token::Field("f".to_string()),
                Token::Phrase(r#"say "hi""#.to_string()),
            ]
        );
    }

    #[test]
    fn unterminated_phrase() {
        let err = lex(r#"f:"no end"#).unwrap_err();
        assert_eq!(err.reason, ParseReason::UnterminatedPhrase);
        assert_eq!(err.position, 2);
    }

    #[test]
    fn reserved_chars_rejected_with_position() {
        for (query, ch, pos) in [
            ("f:va?ue", '?', 4),
            ("f:a~2", '~', 3),
            ("f:{1 TO 2}", '{', 2),
            ("f:a^b", '^', 3),
            ("f:/regex/", '/', 2),
            ("f:a=b", '=', 3),
            ("f:a!b", '!', 3),
        ] {
            let err = lex(query).unwrap_err();
            assert_eq!(err.reason, ParseReason::ReservedChar(ch), "query: {query}");
            assert_eq!(err.position, pos, "query: {query}");
        }
    }

    #[test]
    fn escaped_reserved_chars_accepted() {
        let toks = kinds(r"f:va\?ue");
        assert_eq!(toks[1], Token::Word(r"va\?ue".to_string()));
        let toks = kinds(r"f:C\:\\Windows");
        assert_eq!(toks[1], Token::Word(r"C\:\\Windows".to_string()));
    }

    #[test]
    fn leading_hyphen_rejected_embedded_allowed() {
        let err = lex("-f:x").unwrap_err();
        assert_eq!(err.reason, ParseReason::ReservedChar('-'));
        let toks = kinds("host.name:win-defender-01");
        assert_eq!(toks[1], Token::Word("win-defender-01".to_string()));
    }

    #[test]
    fn dangling_escape() {
        let err = lex(r"f:abc\").unwrap_err();
        assert_eq!(err.reason, ParseReason::DanglingEscape);
    }

    #[test]
    fn empty_field_name() {
        let err = lex(":value").unwrap_err();
        assert_eq!(err.reason, ParseReason::EmptyFieldName);
        assert_eq!(err.position, 0);
    }

    #[test]
    fn field_name_with_escape_rejected() {
        let err = lex(r"a\ b:x").unwrap_err();
        assert!(matches!(err.reason, ParseReason::InvalidFieldName(_)));
    }

    #[test]
    fn at_sign_in_field_name() {
        let toks = kinds("@timestamp:2024-01-01T00:00:00Z");
        assert_eq!(toks[0], Token::Field("@timestamp".to_string()));
        // The value itself contains unescaped colons and splits; that case is
        // surfaced by the parser, which sees a second Field token.
        assert_eq!(toks[1], Token::Field("2024-01-01T00".to_string()));
    }
}
