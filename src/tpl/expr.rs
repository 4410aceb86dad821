//! Parser for the expression language used inside `{{ }}` and tag arguments.
//!
//! Precedence, lowest first: `or`, `and`, `==`/`!=`, `<`/`<=`/`>`/`>=`/`contains`,
//! the `|` filter pipeline, primaries. All binary levels are left-associative.

use crate::error::{Error, Pos, Result};
use crate::tpl::ast::{Expr, Op, Segment};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Dot,
    DotDot,
    Comma,
    Colon,
    Pipe,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Cmp(Op),
    Eof,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '?'
}

/// Splits an expression source into tokens, each paired with its byte offset.
fn lex(src: &str) -> std::result::Result<Vec<(Tok, usize)>, (String, usize)> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(i, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let next = bytes.get(i + 1).copied();
        let tok = match c {
            '"' | '\'' => {
                chars.next();
                let start = i + 1;
                let end = src[start..]
                    .find(c)
                    .map(|n| start + n)
                    .ok_or_else(|| ("unterminated string literal".to_string(), i))?;
                while chars.peek().is_some_and(|&(j, _)| j <= end) {
                    chars.next();
                }
                out.push((Tok::Str(src[start..end].to_string()), i));
                continue;
            }
            c if c.is_ascii_digit() || (c == '-' && next.is_some_and(|b| b.is_ascii_digit())) => {
                let mut end = i + 1;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                let mut float = false;
                if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
                    float = true;
                    end += 1;
                    while end < bytes.len() && bytes[end].is_ascii_digit() {
                        end += 1;
                    }
                }
                let text = &src[i..end];
                let tok = if float {
                    text.parse::<f64>().map(Tok::Float).ok()
                } else {
                    text.parse::<i64>().map(Tok::Int).ok()
                };
                let tok = tok.ok_or_else(|| (format!("invalid number '{}'", text), i))?;
                while chars.peek().is_some_and(|&(j, _)| j < end) {
                    chars.next();
                }
                out.push((tok, i));
                continue;
            }
            c if is_ident_start(c) => {
                let mut end = i;
                while let Some(&(j, c)) = chars.peek() {
                    if !is_ident_char(c) {
                        break;
                    }
                    end = j + c.len_utf8();
                    chars.next();
                }
                let word = &src[i..end];
                let tok = if word == "contains" {
                    Tok::Cmp(Op::Contains)
                } else {
                    Tok::Ident(word.to_string())
                };
                out.push((tok, i));
                continue;
            }
            '.' if next == Some(b'.') => {
                chars.next();
                Tok::DotDot
            }
            '.' => Tok::Dot,
            ',' => Tok::Comma,
            ':' => Tok::Colon,
            '|' => Tok::Pipe,
            '(' => Tok::LParen,
            ')' => Tok::RParen,
            '[' => Tok::LBracket,
            ']' => Tok::RBracket,
            '=' if next == Some(b'=') => {
                chars.next();
                Tok::Cmp(Op::Eq)
            }
            '!' if next == Some(b'=') => {
                chars.next();
                Tok::Cmp(Op::Ne)
            }
            '<' if next == Some(b'>') => {
                chars.next();
                Tok::Cmp(Op::Ne)
            }
            '<' if next == Some(b'=') => {
                chars.next();
                Tok::Cmp(Op::Le)
            }
            '>' if next == Some(b'=') => {
                chars.next();
                Tok::Cmp(Op::Ge)
            }
            '<' => Tok::Cmp(Op::Lt),
            '>' => Tok::Cmp(Op::Gt),
            other => return Err((format!("unexpected character '{}'", other), i)),
        };
        chars.next();
        out.push((tok, i));
    }
    out.push((Tok::Eof, src.len()));
    Ok(out)
}

struct Parser<'a> {
    src: &'a str,
    pos: Pos,
    tokens: Vec<(Tok, usize)>,
    cursor: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, pos: Pos) -> Result<Self> {
        let tokens = lex(src).map_err(|(message, offset)| syntax_error(src, pos, &message, offset))?;
        Ok(Self {
            src,
            pos,
            tokens,
            cursor: 0,
        })
    }

    fn peek(&self) -> &Tok {
        &self.tokens[self.cursor].0
    }

    fn peek_at(&self, n: usize) -> &Tok {
        let idx = (self.cursor + n).min(self.tokens.len() - 1);
        &self.tokens[idx].0
    }

    fn advance(&mut self) -> Tok {
        let tok = self.tokens[self.cursor].0.clone();
        if self.cursor < self.tokens.len() - 1 {
            self.cursor += 1;
        }
        tok
    }

    fn is_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Tok::Ident(w) if w == word)
    }

    fn error(&self, message: &str) -> Error {
        syntax_error(self.src, self.pos, message, self.tokens[self.cursor].1)
    }

    fn expect(&mut self, tok: Tok, what: &str) -> Result<()> {
        if *self.peek() == tok {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!("expected {}", what)))
        }
    }

    fn expect_end(&self) -> Result<()> {
        match self.peek() {
            Tok::Eof => Ok(()),
            _ => Err(self.error("unexpected trailing input")),
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut expr = self.parse_and()?;
        while self.is_keyword("or") {
            self.advance();
            let rhs = self.parse_and()?;
            expr = Expr::Binary(Op::Or, Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut expr = self.parse_equality()?;
        while self.is_keyword("and") {
            self.advance();
            let rhs = self.parse_equality()?;
            expr = Expr::Binary(Op::And, Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut expr = self.parse_relational()?;
        while let Tok::Cmp(op @ (Op::Eq | Op::Ne)) = *self.peek() {
            self.advance();
            let rhs = self.parse_relational()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        let mut expr = self.parse_filtered()?;
        while let Tok::Cmp(op @ (Op::Lt | Op::Le | Op::Gt | Op::Ge | Op::Contains)) = *self.peek() {
            self.advance();
            let rhs = self.parse_filtered()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    /// `primary ('|' name (':' arg (',' arg)*)?)*`
    fn parse_filtered(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        while *self.peek() == Tok::Pipe {
            self.advance();
            let name = match self.advance() {
                Tok::Ident(name) => name,
                _ => return Err(self.error("expected a filter name after '|'")),
            };
            let mut args = Vec::new();
            let mut named = Vec::new();
            if *self.peek() == Tok::Colon {
                self.advance();
                loop {
                    if let (Tok::Ident(key), Tok::Colon) = (self.peek(), self.peek_at(1)) {
                        let key = key.clone();
                        self.advance();
                        self.advance();
                        named.push((key, self.parse_primary()?));
                    } else {
                        args.push(self.parse_primary()?);
                    }
                    if *self.peek() != Tok::Comma {
                        break;
                    }
                    self.advance();
                }
            }
            expr = Expr::Filter {
                input: Box::new(expr),
                name,
                args,
                named,
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Tok::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            Tok::Int(n) => Ok(Expr::Literal(Value::Int(n))),
            Tok::Float(n) => Ok(Expr::Literal(Value::Float(n))),
            Tok::LParen => {
                let inner = self.parse_or()?;
                if *self.peek() == Tok::DotDot {
                    self.advance();
                    let high = self.parse_or()?;
                    self.expect(Tok::RParen, "')' after range")?;
                    return Ok(Expr::Range(Box::new(inner), Box::new(high)));
                }
                self.expect(Tok::RParen, "')'")?;
                Ok(inner)
            }
            Tok::Ident(word) => match word.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "nil" | "null" => Ok(Expr::Literal(Value::Nil)),
                _ => self.parse_path(word),
            },
            Tok::Eof => {
                self.cursor = self.tokens.len() - 1;
                Err(self.error("unexpected end of expression"))
            }
            _ => {
                self.cursor = self.cursor.saturating_sub(1);
                Err(self.error("expected a value"))
            }
        }
    }

    fn parse_path(&mut self, head: String) -> Result<Expr> {
        let mut segments = Vec::new();
        loop {
            match self.peek() {
                Tok::Dot => {
                    self.advance();
                    match self.advance() {
                        Tok::Ident(key) => segments.push(Segment::Key(key)),
                        _ => return Err(self.error("expected a property name after '.'")),
                    }
                }
                Tok::LBracket => {
                    self.advance();
                    let index = self.parse_or()?;
                    self.expect(Tok::RBracket, "']'")?;
                    segments.push(Segment::Index(index));
                }
                _ => break,
            }
        }
        Ok(Expr::Path(head, segments))
    }
}

fn syntax_error(src: &str, pos: Pos, message: &str, offset: usize) -> Error {
    Error::ExpressionSyntax {
        fragment: src.to_string(),
        message: format!("{} at column {}", message, offset + 1),
        pos,
    }
}

/// Parses a complete expression. `pos` locates the enclosing markup for errors.
pub fn parse_expression(src: &str, pos: Pos) -> Result<Expr> {
    let mut parser = Parser::new(src, pos)?;
    if *parser.peek() == Tok::Eof {
        return Err(parser.error("empty expression"));
    }
    let expr = parser.parse_or()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parses comma-separated expressions, as in `{% when a, b %}`.
pub fn parse_expression_list(src: &str, pos: Pos) -> Result<Vec<Expr>> {
    let mut parser = Parser::new(src, pos)?;
    let mut exprs = vec![parser.parse_or()?];
    while *parser.peek() == Tok::Comma {
        parser.advance();
        exprs.push(parser.parse_or()?);
    }
    parser.expect_end()?;
    Ok(exprs)
}
