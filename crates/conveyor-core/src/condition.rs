//! Condition expressions for workflow and job rules.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr       := and_expr ( "||" and_expr )*
//! and_expr   := cmp_expr ( "&&" cmp_expr )*
//! cmp_expr   := primary ( ("==" | "!=") primary )?
//! primary    := "$" name | string | "null" | "(" expr ")"
//! ```
//!
//! Values are optional strings: a variable that is not set in the event
//! context evaluates to unset, and `null` is the unset literal. A bare
//! `$name` is a truthiness test (set and non-empty). Evaluation is pure
//! and total; only parsing can fail, and parsing happens at definition
//! load time.

use crate::context::EventContext;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parse failure for a condition expression. Surfaced before any
/// pipeline runs, as [`Error::InvalidCondition`].
#[derive(Debug, thiserror::Error)]
#[error("{message} at offset {offset}")]
pub struct ConditionError {
    pub message: String,
    pub offset: usize,
}

/// Parsed condition expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Var(String),
    Literal(String),
    Null,
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Parse an expression, failing on malformed syntax.
    pub fn parse(input: &str) -> Result<Self, Error> {
        Parser::new(input)
            .and_then(Parser::parse)
            .map_err(|e| Error::InvalidCondition {
                expression: input.to_string(),
                message: e.to_string(),
            })
    }

    /// Evaluate to a boolean against an event context. Pure; never fails.
    pub fn evaluate(&self, ctx: &EventContext) -> bool {
        match self {
            Expr::And(lhs, rhs) => lhs.evaluate(ctx) && rhs.evaluate(ctx),
            Expr::Or(lhs, rhs) => lhs.evaluate(ctx) || rhs.evaluate(ctx),
            Expr::Eq(lhs, rhs) => lhs.value(ctx) == rhs.value(ctx),
            Expr::Ne(lhs, rhs) => lhs.value(ctx) != rhs.value(ctx),
            other => match other.value(ctx) {
                Some(v) => !v.is_empty(),
                None => false,
            },
        }
    }

    /// Resolve to an optional string value. Logical operators resolve
    /// through their boolean result so they compose under `==` too.
    fn value(&self, ctx: &EventContext) -> Option<String> {
        match self {
            Expr::Var(name) => ctx.lookup(name),
            Expr::Literal(s) => Some(s.clone()),
            Expr::Null => None,
            other => Some(other.evaluate(ctx).to_string()),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "${}", name),
            Expr::Literal(s) => write!(f, "\"{}\"", s),
            Expr::Null => write!(f, "null"),
            Expr::Eq(l, r) => write!(f, "{} == {}", l, r),
            Expr::Ne(l, r) => write!(f, "{} != {}", l, r),
            Expr::And(l, r) => write!(f, "{} && {}", l, r),
            Expr::Or(l, r) => write!(f, "({} || {})", l, r),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Var(String),
    Str(String),
    Null,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    LParen,
    RParen,
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Result<Self, ConditionError> {
        let tokens = Self::lex(input)?;
        Ok(Self { tokens, pos: 0 })
    }

    fn parse(mut self) -> Result<Expr, ConditionError> {
        let expr = self.parse_or()?;
        if self.pos < self.tokens.len() {
            return Err(ConditionError {
                message: "unexpected trailing tokens".to_string(),
                offset: self.tokens[self.pos].1,
            });
        }
        Ok(expr)
    }

    fn lex(input: &str) -> Result<Vec<(Token, usize)>, ConditionError> {
        let mut tokens = Vec::new();
        let chars: Vec<char> = input.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let start = i;
            match chars[i] {
                c if c.is_whitespace() => i += 1,
                '(' => {
                    tokens.push((Token::LParen, start));
                    i += 1;
                }
                ')' => {
                    tokens.push((Token::RParen, start));
                    i += 1;
                }
                '$' => {
                    i += 1;
                    let name_start = i;
                    while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                        i += 1;
                    }
                    if i == name_start {
                        return Err(ConditionError {
                            message: "expected variable name after `$`".to_string(),
                            offset: start,
                        });
                    }
                    tokens.push((Token::Var(chars[name_start..i].iter().collect()), start));
                }
                quote @ ('"' | '\'') => {
                    i += 1;
                    let lit_start = i;
                    while i < chars.len() && chars[i] != quote {
                        i += 1;
                    }
                    if i >= chars.len() {
                        return Err(ConditionError {
                            message: "unterminated string literal".to_string(),
                            offset: start,
                        });
                    }
                    tokens.push((Token::Str(chars[lit_start..i].iter().collect()), start));
                    i += 1;
                }
                '=' if chars.get(i + 1) == Some(&'=') => {
                    tokens.push((Token::EqEq, start));
                    i += 2;
                }
                '!' if chars.get(i + 1) == Some(&'=') => {
                    tokens.push((Token::NotEq, start));
                    i += 2;
                }
                '&' if chars.get(i + 1) == Some(&'&') => {
                    tokens.push((Token::AndAnd, start));
                    i += 2;
                }
                '|' if chars.get(i + 1) == Some(&'|') => {
                    tokens.push((Token::OrOr, start));
                    i += 2;
                }
                c if c.is_alphabetic() => {
                    while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                        i += 1;
                    }
                    let word: String = chars[start..i].iter().collect();
                    if word == "null" {
                        tokens.push((Token::Null, start));
                    } else {
                        return Err(ConditionError {
                            message: format!("unexpected identifier `{}`", word),
                            offset: start,
                        });
                    }
                }
                c => {
                    return Err(ConditionError {
                        message: format!("unexpected character `{}`", c),
                        offset: start,
                    });
                }
            }
        }

        Ok(tokens)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, o)| *o)
            .unwrap_or(0)
    }

    fn parse_or(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::OrOr) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_cmp()?;
        while self.peek() == Some(&Token::AndAnd) {
            self.advance();
            let rhs = self.parse_cmp()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> Result<Expr, ConditionError> {
        let lhs = self.parse_primary()?;
        match self.peek() {
            Some(Token::EqEq) => {
                self.advance();
                let rhs = self.parse_primary()?;
                Ok(Expr::Eq(Box::new(lhs), Box::new(rhs)))
            }
            Some(Token::NotEq) => {
                self.advance();
                let rhs = self.parse_primary()?;
                Ok(Expr::Ne(Box::new(lhs), Box::new(rhs)))
            }
            _ => Ok(lhs),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ConditionError> {
        let offset = self.offset();
        match self.advance() {
            Some(Token::Var(name)) => Ok(Expr::Var(name)),
            Some(Token::Str(s)) => Ok(Expr::Literal(s)),
            Some(Token::Null) => Ok(Expr::Null),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(ConditionError {
                        message: "expected `)`".to_string(),
                        offset: self.offset(),
                    }),
                }
            }
            Some(token) => Err(ConditionError {
                message: format!("unexpected token {:?}", token),
                offset,
            }),
            None => Err(ConditionError {
                message: "unexpected end of expression".to_string(),
                offset,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TriggerSource;

    fn push_ctx() -> EventContext {
        EventContext::new(TriggerSource::Push)
            .with_branch("main")
            .with_default_branch("main")
    }

    #[test]
    fn test_equality_on_source() {
        let expr = Expr::parse("$source == \"push\"").unwrap();
        assert!(expr.evaluate(&push_ctx()));

        let expr = Expr::parse("$source == \"merge_request_event\"").unwrap();
        assert!(!expr.evaluate(&push_ctx()));
    }

    #[test]
    fn test_inequality() {
        let expr = Expr::parse("$branch != \"dev\"").unwrap();
        assert!(expr.evaluate(&push_ctx()));
    }

    #[test]
    fn test_variable_against_variable() {
        let expr = Expr::parse("$branch == $default_branch").unwrap();
        assert!(expr.evaluate(&push_ctx()));

        let ctx = EventContext::new(TriggerSource::Push)
            .with_branch("dev")
            .with_default_branch("main");
        assert!(!expr.evaluate(&ctx));
    }

    #[test]
    fn test_truthiness_of_bare_variable() {
        let expr = Expr::parse("$open_merge_requests").unwrap();
        assert!(!expr.evaluate(&push_ctx()));

        let ctx = push_ctx().with_open_merge_requests(true);
        assert!(expr.evaluate(&ctx));
    }

    #[test]
    fn test_unset_variable_is_false_not_error() {
        let expr = Expr::parse("$NOT_SET").unwrap();
        assert!(!expr.evaluate(&push_ctx()));

        let expr = Expr::parse("$NOT_SET == \"x\"").unwrap();
        assert!(!expr.evaluate(&push_ctx()));
    }

    #[test]
    fn test_null_matches_unset() {
        let expr = Expr::parse("$branch == null").unwrap();
        assert!(expr.evaluate(&EventContext::new(TriggerSource::Push)));
        assert!(!expr.evaluate(&push_ctx()));
    }

    #[test]
    fn test_and_or_precedence() {
        // `a || b && c` parses as `a || (b && c)`
        let expr =
            Expr::parse("$source == \"schedule\" || $source == \"push\" && $branch == \"main\"")
                .unwrap();
        assert!(expr.evaluate(&push_ctx()));

        let ctx = EventContext::new(TriggerSource::Push).with_branch("dev");
        assert!(!expr.evaluate(&ctx));
    }

    #[test]
    fn test_parentheses() {
        let expr = Expr::parse("($source == \"push\" || $source == \"schedule\") && $branch")
            .unwrap();
        assert!(expr.evaluate(&push_ctx()));
        assert!(!expr.evaluate(&EventContext::new(TriggerSource::Push)));
    }

    #[test]
    fn test_single_quoted_literal() {
        let expr = Expr::parse("$branch == 'main'").unwrap();
        assert!(expr.evaluate(&push_ctx()));
    }

    #[test]
    fn test_malformed_is_definition_error() {
        assert!(Expr::parse("$source ==").is_err());
        assert!(Expr::parse("== \"push\"").is_err());
        assert!(Expr::parse("$source = \"push\"").is_err());
        assert!(Expr::parse("\"unterminated").is_err());
        assert!(Expr::parse("$source == \"push\" extra").is_err());
        assert!(Expr::parse("($source == \"push\"").is_err());
        assert!(Expr::parse("$").is_err());
    }
}
