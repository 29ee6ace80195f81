// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Recursive-descent parser producing the script AST.
//!
//! Statements are parsed top-down; expressions use precedence climbing.
//! Semicolons are optional: a statement ends wherever the next token cannot
//! continue it.

use super::lexer::{self, TemplatePart, Tok, Token};
use super::ScriptError;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let {
        name: String,
        init: Option<Expr>,
        constant: bool,
        line: usize,
    },
    Expr(Expr),
    If {
        cond: Expr,
        then: Vec<Stmt>,
        otherwise: Option<Vec<Stmt>>,
    },
    ForOf {
        name: String,
        constant: bool,
        iter: Expr,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Num(f64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
    Template(Vec<TemplateSegment>),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Ident(String),
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Assign {
        target: Box<Expr>,
        op: Option<BinaryOp>,
        value: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSegment {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

enum Infix {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

/// Binding power of an infix operator; higher binds tighter.
fn infix(punct: &str) -> Option<(u8, Infix)> {
    use BinaryOp::*;
    Some(match punct {
        "||" => (1, Infix::Logical(LogicalOp::Or)),
        "??" => (1, Infix::Logical(LogicalOp::Nullish)),
        "&&" => (2, Infix::Logical(LogicalOp::And)),
        "==" => (3, Infix::Binary(Eq)),
        "!=" => (3, Infix::Binary(Ne)),
        "===" => (3, Infix::Binary(StrictEq)),
        "!==" => (3, Infix::Binary(StrictNe)),
        "<" => (4, Infix::Binary(Lt)),
        ">" => (4, Infix::Binary(Gt)),
        "<=" => (4, Infix::Binary(Le)),
        ">=" => (4, Infix::Binary(Ge)),
        "+" => (5, Infix::Binary(Add)),
        "-" => (5, Infix::Binary(Sub)),
        "*" => (6, Infix::Binary(Mul)),
        "/" => (6, Infix::Binary(Div)),
        "%" => (6, Infix::Binary(Rem)),
        _ => return None,
    })
}

/// Deepest syntax nesting a script may use.
pub const MAX_NESTING: usize = 256;

const RESERVED: &[&str] = &[
    "let", "const", "var", "if", "else", "for", "of", "return", "true", "false", "null",
    "undefined", "typeof", "await", "function", "while", "class", "import", "new",
];

pub fn parse(source: &str) -> Result<Program, ScriptError> {
    let tokens = lexer::tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let mut body = Vec::new();
    while !parser.at_eof() {
        body.push(parser.statement()?);
    }
    Ok(Program { body })
}

fn parse_fragment(source: &str, line: usize, depth: usize) -> Result<Expr, ScriptError> {
    let tokens = lexer::tokenize_at(source, line)?;
    let mut parser = Parser { tokens, pos: 0, depth };
    let expr = parser.expression()?;
    if !parser.at_eof() {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        self.peek().tok == Tok::Eof
    }

    fn line(&self) -> usize {
        self.peek().line
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(&self.peek().tok, Tok::Punct(q) if *q == p)
    }

    fn is_keyword(&self, word: &str) -> bool {
        matches!(&self.peek().tok, Tok::Ident(w) if w == word)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        let found = self.is_punct(p);
        if found {
            self.advance();
        }
        found
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        let found = self.is_keyword(word);
        if found {
            self.advance();
        }
        found
    }

    fn expect_punct(&mut self, p: &str) -> Result<(), ScriptError> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(ScriptError::new(
                self.line(),
                format!("expected '{}' but found {}", p, describe(&self.peek().tok)),
            ))
        }
    }

    /// One level deeper; fails past [`MAX_NESTING`].
    fn descend(&mut self) -> Result<(), ScriptError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ScriptError::new(self.line(), "nesting too deep"));
        }
        Ok(())
    }

    /// Run `parse` one level deeper.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ScriptError>,
    ) -> Result<T, ScriptError> {
        let base = self.depth;
        self.descend()?;
        let result = parse(self);
        self.depth = base;
        result
    }

    fn unexpected(&self) -> ScriptError {
        ScriptError::new(
            self.line(),
            format!("unexpected {}", describe(&self.peek().tok)),
        )
    }

    fn binding_name(&mut self) -> Result<String, ScriptError> {
        match self.advance() {
            Token {
                tok: Tok::Ident(name),
                ..
            } if !RESERVED.contains(&name.as_str()) => Ok(name),
            token => Err(ScriptError::new(
                token.line,
                format!("expected a variable name but found {}", describe(&token.tok)),
            )),
        }
    }

    fn end_statement(&mut self) -> Result<(), ScriptError> {
        if self.eat_punct(";") || self.is_punct("}") || self.at_eof() || self.peek().newline_before
        {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        self.nested(Self::statement_inner)
    }

    fn statement_inner(&mut self) -> Result<Stmt, ScriptError> {
        let line = self.line();
        if self.eat_punct(";") {
            return Ok(Stmt::Block(Vec::new()));
        }
        if self.is_punct("{") {
            return Ok(Stmt::Block(self.block()?));
        }
        if let Some(constant) = self.declaration_keyword() {
            let name = self.binding_name()?;
            let init = if self.eat_punct("=") {
                Some(self.expression()?)
            } else if constant {
                return Err(ScriptError::new(
                    line,
                    format!("missing initializer in const declaration '{}'", name),
                ));
            } else {
                None
            };
            self.end_statement()?;
            return Ok(Stmt::Let {
                name,
                init,
                constant,
                line,
            });
        }
        if self.eat_keyword("if") {
            self.expect_punct("(")?;
            let cond = self.expression()?;
            self.expect_punct(")")?;
            let then = self.body()?;
            let otherwise = if self.eat_keyword("else") {
                Some(self.body()?)
            } else {
                None
            };
            return Ok(Stmt::If {
                cond,
                then,
                otherwise,
            });
        }
        if self.eat_keyword("for") {
            self.expect_punct("(")?;
            let constant = self.declaration_keyword().ok_or_else(|| {
                ScriptError::new(line, "only 'for (const x of ...)' loops are supported")
            })?;
            let name = self.binding_name()?;
            if !self.eat_keyword("of") {
                return Err(ScriptError::new(
                    line,
                    "only 'for (const x of ...)' loops are supported",
                ));
            }
            let iter = self.expression()?;
            self.expect_punct(")")?;
            let body = self.body()?;
            return Ok(Stmt::ForOf {
                name,
                constant,
                iter,
                body,
            });
        }
        if self.eat_keyword("return") {
            if self.is_punct(";") || self.is_punct("}") || self.at_eof() || self.peek().newline_before
            {
                self.eat_punct(";");
                return Ok(Stmt::Return(None));
            }
            let value = self.expression()?;
            self.end_statement()?;
            return Ok(Stmt::Return(Some(value)));
        }
        for word in ["function", "while", "class", "import", "new"] {
            if self.is_keyword(word) {
                return Err(ScriptError::new(
                    line,
                    format!("'{}' is not supported", word),
                ));
            }
        }

        let expr = self.expression()?;
        self.end_statement()?;
        Ok(Stmt::Expr(expr))
    }

    /// `Some(true)` for `const`, `Some(false)` for `let`/`var`.
    fn declaration_keyword(&mut self) -> Option<bool> {
        if self.eat_keyword("const") {
            Some(true)
        } else if self.eat_keyword("let") || self.eat_keyword("var") {
            Some(false)
        } else {
            None
        }
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        self.expect_punct("{")?;
        let mut body = Vec::new();
        while !self.is_punct("}") {
            if self.at_eof() {
                return Err(ScriptError::new(self.line(), "missing '}' before end of input"));
            }
            body.push(self.statement()?);
        }
        self.advance();
        Ok(body)
    }

    /// A braced block or a single statement.
    fn body(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        if self.is_punct("{") {
            self.block()
        } else {
            Ok(vec![self.statement()?])
        }
    }

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.nested(Self::assignment)
    }

    fn assignment(&mut self) -> Result<Expr, ScriptError> {
        let target = self.conditional()?;
        let op = match &self.peek().tok {
            Tok::Punct("=") => None,
            Tok::Punct("+=") => Some(BinaryOp::Add),
            Tok::Punct("-=") => Some(BinaryOp::Sub),
            Tok::Punct("*=") => Some(BinaryOp::Mul),
            Tok::Punct("/=") => Some(BinaryOp::Div),
            _ => return Ok(target),
        };
        let line = self.advance().line;
        if !matches!(
            target.kind,
            ExprKind::Ident(_) | ExprKind::Member { optional: false, .. } | ExprKind::Index { .. }
        ) {
            return Err(ScriptError::new(line, "invalid assignment target"));
        }
        let value = self.expression()?;
        Ok(Expr {
            kind: ExprKind::Assign {
                target: Box::new(target),
                op,
                value: Box::new(value),
            },
            line,
        })
    }

    fn conditional(&mut self) -> Result<Expr, ScriptError> {
        let cond = self.binary(0)?;
        if !self.is_punct("?") {
            return Ok(cond);
        }
        let line = self.advance().line;
        let then = self.expression()?;
        self.expect_punct(":")?;
        let otherwise = self.expression()?;
        Ok(Expr {
            kind: ExprKind::Conditional(Box::new(cond), Box::new(then), Box::new(otherwise)),
            line,
        })
    }

    fn binary(&mut self, min_power: u8) -> Result<Expr, ScriptError> {
        let base = self.depth;
        let mut left = self.unary()?;
        loop {
            let p = match &self.peek().tok {
                Tok::Punct(p) => *p,
                _ => break,
            };
            let Some((power, op)) = infix(p) else {
                break;
            };
            if power <= min_power {
                break;
            }
            self.descend()?;
            let line = self.advance().line;
            let right = self.binary(power)?;
            let kind = match op {
                Infix::Binary(op) => ExprKind::Binary(op, Box::new(left), Box::new(right)),
                Infix::Logical(op) => ExprKind::Logical(op, Box::new(left), Box::new(right)),
            };
            left = Expr { kind, line };
        }
        self.depth = base;
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        self.nested(Self::prefixed)
    }

    fn prefixed(&mut self) -> Result<Expr, ScriptError> {
        let line = self.line();
        let op = match &self.peek().tok {
            Tok::Punct("!") => UnaryOp::Not,
            Tok::Punct("-") => UnaryOp::Neg,
            Tok::Punct("+") => UnaryOp::Plus,
            Tok::Ident(w) if w == "typeof" => UnaryOp::TypeOf,
            Tok::Ident(w) if w == "await" => {
                // Calls are already synchronous from the script's view.
                self.advance();
                return self.unary();
            }
            Tok::Punct(p @ ("++" | "--")) => {
                return Err(ScriptError::new(
                    line,
                    format!("'{}' is not supported; use += 1 or -= 1", p),
                ))
            }
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.unary()?;
        Ok(Expr {
            kind: ExprKind::Unary(op, Box::new(operand)),
            line,
        })
    }

    fn postfix(&mut self) -> Result<Expr, ScriptError> {
        let base = self.depth;
        let mut expr = self.primary()?;
        loop {
            let line = self.line();
            if self.is_punct(".") || self.is_punct("?.") {
                self.descend()?;
                let optional = self.advance().tok == Tok::Punct("?.");
                if optional && self.is_punct("[") {
                    return Err(ScriptError::new(line, "'?.[' is not supported"));
                }
                let property = match self.advance() {
                    Token {
                        tok: Tok::Ident(name),
                        ..
                    } => name,
                    token => {
                        return Err(ScriptError::new(
                            token.line,
                            format!("expected a property name but found {}", describe(&token.tok)),
                        ))
                    }
                };
                expr = Expr {
                    kind: ExprKind::Member {
                        object: Box::new(expr),
                        property,
                        optional,
                    },
                    line,
                };
            } else if self.is_punct("[") && !self.peek().newline_before {
                self.descend()?;
                self.advance();
                let index = self.expression()?;
                self.expect_punct("]")?;
                expr = Expr {
                    kind: ExprKind::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    line,
                };
            } else if self.is_punct("(") && !self.peek().newline_before {
                self.descend()?;
                self.advance();
                let args = self.list(")")?;
                expr = Expr {
                    kind: ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    line,
                };
            } else if !self.peek().newline_before && (self.is_punct("++") || self.is_punct("--")) {
                let op = if self.is_punct("++") { "++" } else { "--" };
                return Err(ScriptError::new(
                    line,
                    format!("'{}' is not supported; use += 1 or -= 1", op),
                ));
            } else {
                self.depth = base;
                return Ok(expr);
            }
        }
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed.
    fn list(&mut self, close: &str) -> Result<Vec<Expr>, ScriptError> {
        let mut items = Vec::new();
        while !self.eat_punct(close) {
            items.push(self.expression()?);
            if !self.eat_punct(",") {
                self.expect_punct(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        let token = self.advance();
        let line = token.line;
        let kind = match token.tok {
            Tok::Num(n) => ExprKind::Num(n),
            Tok::Str(s) => ExprKind::Str(s),
            Tok::Template(parts) => ExprKind::Template(
                parts
                    .into_iter()
                    .map(|part| match part {
                        TemplatePart::Text(text) => Ok(TemplateSegment::Text(text)),
                        TemplatePart::Expr(source, line) => {
                            parse_fragment(&source, line, self.depth).map(TemplateSegment::Expr)
                        }
                    })
                    .collect::<Result<_, _>>()?,
            ),
            Tok::Ident(word) => match word.as_str() {
                "true" => ExprKind::Bool(true),
                "false" => ExprKind::Bool(false),
                "null" => ExprKind::Null,
                "undefined" => ExprKind::Undefined,
                w if RESERVED.contains(&w) => {
                    return Err(ScriptError::new(line, format!("unexpected keyword '{}'", w)))
                }
                _ => ExprKind::Ident(word),
            },
            Tok::Punct("(") => {
                let inner = self.expression()?;
                self.expect_punct(")")?;
                return Ok(inner);
            }
            Tok::Punct("[") => ExprKind::Array(self.list("]")?),
            Tok::Punct("{") => ExprKind::Object(self.object_fields()?),
            other => {
                return Err(ScriptError::new(
                    line,
                    format!("unexpected {}", describe(&other)),
                ))
            }
        };
        Ok(Expr { kind, line })
    }

    fn object_fields(&mut self) -> Result<Vec<(String, Expr)>, ScriptError> {
        let mut fields = Vec::new();
        while !self.eat_punct("}") {
            let token = self.advance();
            let key = match token.tok {
                Tok::Ident(name) => name,
                Tok::Str(s) => s,
                Tok::Num(n) => super::interp::format_number(n),
                other => {
                    return Err(ScriptError::new(
                        token.line,
                        format!("expected a property name but found {}", describe(&other)),
                    ))
                }
            };
            let value = if self.eat_punct(":") {
                self.expression()?
            } else {
                // Shorthand `{ name }`.
                Expr {
                    kind: ExprKind::Ident(key.clone()),
                    line: token.line,
                }
            };
            fields.push((key, value));
            if !self.eat_punct(",") {
                self.expect_punct("}")?;
                break;
            }
        }
        Ok(fields)
    }
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Num(n) => format!("number {}", n),
        Tok::Str(_) | Tok::Template(_) => "string".to_string(),
        Tok::Ident(name) => format!("'{}'", name),
        Tok::Punct(p) => format!("'{}'", p),
        Tok::Eof => "end of input".to_string(),
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
