// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tokenizer for the script language.

use super::ScriptError;

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Num(f64),
    Str(String),
    /// Backtick string, split into literal text and `${...}` sources.
    Template(Vec<TemplatePart>),
    Ident(String),
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    /// Unparsed source of an interpolation and the line it starts on.
    Expr(String, usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub line: usize,
    /// A line break separates this token from the previous one.
    pub newline_before: bool,
}

// Longest first so that `===` wins over `==` and `=`.
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "+=", "-=", "*=", "/=", "++",
    "--", "{", "}", "(", ")", "[", "]", ";", ",", ".", ":", "?", "+", "-", "*", "/", "%", "<", ">",
    "=", "!",
];

pub fn tokenize(source: &str) -> Result<Vec<Token>, ScriptError> {
    Lexer::new(source, 1).run()
}

/// Tokenize a fragment that starts on `line`, as for template interpolations.
pub(crate) fn tokenize_at(source: &str, line: usize) -> Result<Vec<Token>, ScriptError> {
    Lexer::new(source, line).run()
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    newline: bool,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str, line: usize) -> Self {
        Self {
            src,
            pos: 0,
            line,
            newline: false,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ScriptError> {
        loop {
            self.skip_trivia()?;
            let Some(c) = self.peek() else {
                self.push(Tok::Eof);
                return Ok(self.tokens);
            };
            let line = self.line;

            let tok = if c.is_ascii_digit()
                || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()))
            {
                self.number()?
            } else if c == '"' || c == '\'' {
                self.string(c)?
            } else if c == '`' {
                self.template()?
            } else if is_ident_start(c) {
                Tok::Ident(self.ident())
            } else if let Some(p) = PUNCTUATORS.iter().find(|p| self.rest().starts_with(**p)) {
                self.pos += p.len();
                Tok::Punct(*p)
            } else {
                return Err(ScriptError::new(line, format!("unexpected character '{}'", c)));
            };

            self.tokens.push(Token {
                tok,
                line,
                newline_before: std::mem::take(&mut self.newline),
            });
        }
    }

    fn push(&mut self, tok: Tok) {
        self.tokens.push(Token {
            tok,
            line: self.line,
            newline_before: std::mem::take(&mut self.newline),
        });
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) -> Result<(), ScriptError> {
        loop {
            match self.peek() {
                Some('\n') => {
                    self.newline = true;
                    self.bump();
                }
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let start = self.line;
                    self.pos += 2;
                    loop {
                        if self.rest().starts_with("*/") {
                            self.pos += 2;
                            break;
                        }
                        match self.bump() {
                            Some('\n') => self.newline = true,
                            Some(_) => {}
                            None => return Err(ScriptError::new(start, "unterminated comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn number(&mut self) -> Result<Tok, ScriptError> {
        let start = self.pos;
        let line = self.line;
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.' || c == '_') {
            self.bump();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        let text: String = self.src[start..self.pos].chars().filter(|c| *c != '_').collect();
        text.parse::<f64>()
            .map(Tok::Num)
            .map_err(|_| ScriptError::new(line, format!("invalid number '{}'", text)))
    }

    fn string(&mut self, quote: char) -> Result<Tok, ScriptError> {
        let line = self.line;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(Tok::Str(out)),
                Some('\\') => out.push(self.escape(line)?),
                Some('\n') | None => {
                    return Err(ScriptError::new(line, "unterminated string literal"))
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn template(&mut self) -> Result<Tok, ScriptError> {
        let line = self.line;
        self.bump();
        let mut parts = Vec::new();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('`') => break,
                Some('\\') => text.push(self.escape(line)?),
                Some('$') if self.peek() == Some('{') => {
                    self.bump();
                    if !text.is_empty() {
                        parts.push(TemplatePart::Text(std::mem::take(&mut text)));
                    }
                    let expr_line = self.line;
                    let start = self.pos;
                    let mut depth = 0usize;
                    loop {
                        match self.peek() {
                            Some('{') => depth += 1,
                            Some('}') if depth == 0 => break,
                            Some('}') => depth -= 1,
                            None => {
                                return Err(ScriptError::new(line, "unterminated template literal"))
                            }
                            _ => {}
                        }
                        self.bump();
                    }
                    parts.push(TemplatePart::Expr(
                        self.src[start..self.pos].to_string(),
                        expr_line,
                    ));
                    self.bump();
                }
                Some(c) => text.push(c),
                None => return Err(ScriptError::new(line, "unterminated template literal")),
            }
        }
        if !text.is_empty() || parts.is_empty() {
            parts.push(TemplatePart::Text(text));
        }
        Ok(Tok::Template(parts))
    }

    fn escape(&mut self, line: usize) -> Result<char, ScriptError> {
        let c = self
            .bump()
            .ok_or_else(|| ScriptError::new(line, "unterminated escape sequence"))?;
        Ok(match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            'u' => {
                let hex: String = (0..4).filter_map(|_| self.bump()).collect();
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| ScriptError::new(line, format!("invalid escape '\\u{}'", hex)))?
            }
            other => other,
        })
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;
