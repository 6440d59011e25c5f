// src/expr/parser.rs
//! Recursive-descent parser for model expressions
//!
//! Grammar:
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := primary (('^' | '**') unary)?
//! primary := number | ident | ident '(' expr ')' | '(' expr ')'
//! ```
//! Recognised functions are `sqrt`, `exp`, `ln` and `log` (natural log).

use super::ast::Expr;
use crate::error::{SdeError, SdeResult};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

/// Parse an expression such as `"beta * S * (I_1 + I_21) - mu * S"`
pub fn parse(input: &str) -> SdeResult<Expr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        input,
        tokens,
        pos: 0,
    };
    let expr = parser.expr()?;
    if let Some((_, offset)) = parser.tokens.get(parser.pos) {
        return Err(parser.error(*offset, "unexpected trailing input"));
    }
    Ok(expr)
}

fn tokenize(input: &str) -> SdeResult<Vec<(Token, usize)>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        let start = i;
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                i += 1;
                continue;
            }
            '+' => tokens.push((Token::Plus, start)),
            '-' => tokens.push((Token::Minus, start)),
            '/' => tokens.push((Token::Slash, start)),
            '^' => tokens.push((Token::Caret, start)),
            '(' => tokens.push((Token::LParen, start)),
            ')' => tokens.push((Token::RParen, start)),
            '*' => {
                if bytes.get(i + 1) == Some(&b'*') {
                    tokens.push((Token::Caret, start));
                    i += 1;
                } else {
                    tokens.push((Token::Star, start));
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                // optional exponent: e, e+, e-
                if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                    let mut j = i + 1;
                    if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                        j += 1;
                    }
                    if j < bytes.len() && bytes[j].is_ascii_digit() {
                        while j < bytes.len() && bytes[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let text = &input[start..i];
                let value = text.parse::<f64>().map_err(|_| SdeError::ParseError {
                    input: input.to_string(),
                    position: start,
                    reason: format!("invalid number '{}'", text),
                })?;
                tokens.push((Token::Num(value), start));
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push((Token::Ident(input[start..i].to_string()), start));
                continue;
            }
            other => {
                return Err(SdeError::ParseError {
                    input: input.to_string(),
                    position: start,
                    reason: format!("unexpected character '{}'", other),
                })
            }
        }
        i += 1;
    }

    Ok(tokens)
}

impl<'a> Parser<'a> {
    fn error(&self, position: usize, reason: &str) -> SdeError {
        SdeError::ParseError {
            input: self.input.to_string(),
            position,
            reason: reason.to_string(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, o)| *o)
            .unwrap_or(self.input.len())
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> SdeResult<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(self.offset(), &format!("expected {}", what)))
        }
    }

    fn expr(&mut self) -> SdeResult<Expr> {
        let mut lhs = self.term()?;
        loop {
            if self.eat(&Token::Plus) {
                lhs = lhs + self.term()?;
            } else if self.eat(&Token::Minus) {
                lhs = lhs - self.term()?;
            } else {
                return Ok(lhs);
            }
        }
    }

    fn term(&mut self) -> SdeResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            if self.eat(&Token::Star) {
                lhs = lhs * self.unary()?;
            } else if self.eat(&Token::Slash) {
                lhs = lhs / self.unary()?;
            } else {
                return Ok(lhs);
            }
        }
    }

    fn unary(&mut self) -> SdeResult<Expr> {
        if self.eat(&Token::Minus) {
            Ok(-self.unary()?)
        } else if self.eat(&Token::Plus) {
            self.unary()
        } else {
            self.power()
        }
    }

    fn power(&mut self) -> SdeResult<Expr> {
        let base = self.primary()?;
        if self.eat(&Token::Caret) {
            let exponent = self.unary()?;
            Ok(base.pow(exponent))
        } else {
            Ok(base)
        }
    }

    fn primary(&mut self) -> SdeResult<Expr> {
        let offset = self.offset();
        match self.tokens.get(self.pos).map(|(t, _)| t.clone()) {
            Some(Token::Num(value)) => {
                self.pos += 1;
                Ok(Expr::Num(value))
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                if self.eat(&Token::LParen) {
                    let arg = self.expr()?;
                    self.expect(&Token::RParen, "')' after function argument")?;
                    match name.as_str() {
                        "sqrt" => Ok(arg.sqrt()),
                        "exp" => Ok(arg.exp()),
                        "ln" | "log" => Ok(arg.ln()),
                        _ => Err(self.error(offset, &format!("unknown function '{}'", name))),
                    }
                } else {
                    Ok(Expr::Sym(name))
                }
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(_) => Err(self.error(offset, "expected a number, symbol or '('")),
            None => Err(self.error(offset, "unexpected end of input")),
        }
    }
}
