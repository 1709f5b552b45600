//! Script documents: a `#!` header followed by `key = literal` assignments.
//!
//! Only literal right-hand sides are accepted: numbers, strings (adjacent
//! strings concatenate), `True`/`False`/`None`, lists, tuples, and dicts with
//! string or integer keys. Brackets may span lines.

use std::iter::Peekable;
use std::str::Chars;

use config_primitives::{ConfigError, Result};
use serde_json::{Map, Number, Value};

use super::Document;

pub(super) fn parse(text: &str) -> Result<Document> {
    Parser::new(text)?.document()
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Punct(char),
    Newline,
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("`{name}`"),
            Self::Str(_) => "string".into(),
            Self::Int(_) | Self::Float(_) => "number".into(),
            Self::Punct(c) => format!("`{c}`"),
            Self::Newline => "end of line".into(),
            Self::Eof => "end of document".into(),
        }
    }
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    depth: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
            depth: 0,
        }
    }

    /// Returns the next token and the line it starts on.
    fn next_token(&mut self) -> Result<(Token, usize)> {
        loop {
            let Some(&c) = self.chars.peek() else {
                return Ok((Token::Eof, self.line));
            };
            match c {
                '\n' => {
                    self.chars.next();
                    let line = self.line;
                    self.line += 1;
                    if self.depth == 0 {
                        return Ok((Token::Newline, line));
                    }
                }
                '#' => {
                    while self.chars.next_if(|&c| c != '\n').is_some() {}
                }
                '\\' => {
                    self.chars.next();
                    if self.chars.next() != Some('\n') {
                        return Err(ConfigError::syntax(
                            self.line,
                            "`\\` must end the line",
                        ));
                    }
                    self.line += 1;
                }
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '"' | '\'' => {
                    let line = self.line;
                    return self.string(c).map(|s| (Token::Str(s), line));
                }
                c if c.is_ascii_digit() || c == '.' => {
                    let line = self.line;
                    return self.number().map(|t| (t, line));
                }
                c if c.is_alphabetic() || c == '_' => {
                    let mut ident = String::new();
                    while let Some(c) = self.chars.next_if(|&c| c.is_alphanumeric() || c == '_') {
                        ident.push(c);
                    }
                    return Ok((Token::Ident(ident), self.line));
                }
                '[' | '(' | '{' => {
                    self.chars.next();
                    self.depth += 1;
                    return Ok((Token::Punct(c), self.line));
                }
                ']' | ')' | '}' => {
                    self.chars.next();
                    self.depth = self.depth.saturating_sub(1);
                    return Ok((Token::Punct(c), self.line));
                }
                '=' | ',' | ':' | ';' | '-' | '+' => {
                    self.chars.next();
                    return Ok((Token::Punct(c), self.line));
                }
                other => {
                    return Err(ConfigError::syntax(
                        self.line,
                        format!("unexpected character `{other}`; only literal values are supported"),
                    ));
                }
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<String> {
        let start = self.line;
        self.chars.next();
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => {
                    let escaped = match self.chars.next() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some(c @ ('\\' | '\'' | '"')) => c,
                        Some('\n') => {
                            self.line += 1;
                            continue;
                        }
                        Some(other) => {
                            out.push('\\');
                            other
                        }
                        None => break,
                    };
                    out.push(escaped);
                }
                Some('\n') | None => break,
                Some(c) => out.push(c),
            }
        }
        Err(ConfigError::syntax(start, "unterminated string literal"))
    }

    fn number(&mut self) -> Result<Token> {
        let mut text = String::new();
        let mut is_float = false;
        while let Some(c) = self
            .chars
            .next_if(|&c| c.is_ascii_digit() || c == '.' || c == '_')
        {
            is_float |= c == '.';
            if c != '_' {
                text.push(c);
            }
        }
        if let Some(e) = self.chars.next_if(|&c| c == 'e' || c == 'E') {
            is_float = true;
            text.push(e);
            if let Some(sign) = self.chars.next_if(|&c| c == '+' || c == '-') {
                text.push(sign);
            }
            while let Some(c) = self.chars.next_if(char::is_ascii_digit) {
                text.push(c);
            }
        }

        let invalid = || ConfigError::syntax(self.line, format!("invalid number `{text}`"));
        if is_float {
            text.parse().map(Token::Float).map_err(|_| invalid())
        } else {
            text.parse().map(Token::Int).map_err(|_| invalid())
        }
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    line: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(text);
        let (current, line) = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            line,
        })
    }

    fn advance(&mut self) -> Result<Token> {
        let (next, line) = self.lexer.next_token()?;
        self.line = line;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn unexpected(&self, expected: &str) -> ConfigError {
        ConfigError::syntax(
            self.line,
            format!("expected {expected}, found {}", self.current.describe()),
        )
    }

    fn expect_punct(&mut self, punct: char) -> Result<()> {
        if self.current == Token::Punct(punct) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{punct}`")))
        }
    }

    fn document(mut self) -> Result<Document> {
        let mut doc = Document::new();
        loop {
            match &self.current {
                Token::Newline | Token::Punct(';') => {
                    self.advance()?;
                }
                Token::Eof => return Ok(doc),
                Token::Ident(key) => {
                    let key = key.clone();
                    self.advance()?;
                    self.expect_punct('=')?;
                    let value = self.value()?;
                    if !matches!(
                        self.current,
                        Token::Newline | Token::Punct(';') | Token::Eof
                    ) {
                        return Err(self.unexpected("end of statement"));
                    }
                    doc.insert(key, value);
                }
                _ => return Err(self.unexpected("option name")),
            }
        }
    }

    fn value(&mut self) -> Result<Value> {
        let line = self.line;
        match self.advance()? {
            Token::Str(mut s) => {
                while let Token::Str(next) = &self.current {
                    s.push_str(next);
                    self.advance()?;
                }
                Ok(Value::String(s))
            }
            Token::Int(i) => Ok(Value::from(i)),
            Token::Float(f) => float(f, line),
            Token::Punct(sign @ ('-' | '+')) => match self.advance()? {
                Token::Int(i) if sign == '-' => i
                    .checked_neg()
                    .map(Value::from)
                    .ok_or_else(|| ConfigError::syntax(line, "integer out of range")),
                Token::Int(i) => Ok(Value::from(i)),
                Token::Float(f) if sign == '-' => float(-f, line),
                Token::Float(f) => float(f, line),
                _ => Err(ConfigError::syntax(line, format!("expected number after `{sign}`"))),
            },
            Token::Ident(ident) => match ident.as_str() {
                "True" => Ok(Value::Bool(true)),
                "False" => Ok(Value::Bool(false)),
                "None" => Ok(Value::Null),
                _ => Err(ConfigError::syntax(
                    line,
                    format!("unsupported expression `{ident}`; only literal values are supported"),
                )),
            },
            Token::Punct('[') => self.sequence(']'),
            Token::Punct('(') => self.sequence(')'),
            Token::Punct('{') => self.dict(),
            other => Err(ConfigError::syntax(
                line,
                format!("expected a value, found {}", other.describe()),
            )),
        }
    }

    fn sequence(&mut self, close: char) -> Result<Value> {
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            if self.current == Token::Punct(close) {
                self.advance()?;
                break;
            }
            items.push(self.value()?);
            trailing_comma = false;
            if self.current == Token::Punct(',') {
                self.advance()?;
                trailing_comma = true;
            } else if self.current != Token::Punct(close) {
                return Err(self.unexpected(&format!("`,` or `{close}`")));
            }
        }
        // `(x)` is a parenthesised value, `(x,)` a one-element tuple.
        if close == ')' && items.len() == 1 && !trailing_comma {
            return Ok(items.remove(0));
        }
        Ok(Value::Array(items))
    }

    fn dict(&mut self) -> Result<Value> {
        let mut map = Map::new();
        loop {
            if self.current == Token::Punct('}') {
                self.advance()?;
                return Ok(Value::Object(map));
            }
            let line = self.line;
            let key = match self.value()? {
                Value::String(s) => s,
                Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
                other => {
                    return Err(ConfigError::syntax(
                        line,
                        format!("dict keys must be strings or integers, found `{other}`"),
                    ));
                }
            };
            self.expect_punct(':')?;
            let value = self.value()?;
            map.insert(key, value);
            if self.current == Token::Punct(',') {
                self.advance()?;
            } else if self.current != Token::Punct('}') {
                return Err(self.unexpected("`,` or `}`"));
            }
        }
    }
}

fn float(f: f64, line: usize) -> Result<Value> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| ConfigError::syntax(line, "non-finite float literal"))
}
