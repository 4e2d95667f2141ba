//! A hand-written tokenizer and recursive-descent parser for the
//! register-description grammar (spec section 6). Deliberately not an
//! `eval`-based interpreter: address and default expressions are parsed
//! into [`hdl_expr::Expr`] trees and evaluated against the parameter
//! scope during the build's second pass.

use crate::ast::*;
use crate::error::{MmapError, MmapResult};
use hdl_expr::{BinaryOp, Expr};
use hdl_ir::Access;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Str(String),
    Symbol(char),
    Eof,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: u32,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { chars: src.chars().peekable(), line: 1 }
    }

    fn tokenize(mut self) -> MmapResult<Vec<(Token, u32)>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let line = self.line;
            let Some(&c) = self.chars.peek() else {
                tokens.push((Token::Eof, line));
                break;
            };
            let token = if c.is_ascii_digit() || (c == '0' && self.peek2_is_radix()) {
                self.lex_number()?
            } else if c == '"' {
                self.lex_string()?
            } else if c.is_alphabetic() || c == '_' {
                self.lex_ident()
            } else {
                self.chars.next();
                Token::Symbol(c)
            };
            tokens.push((token, line));
        }
        Ok(tokens)
    }

    fn peek2_is_radix(&self) -> bool {
        false
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.chars.peek() {
                Some(&c) if c == '\n' => {
                    self.line += 1;
                    self.chars.next();
                }
                Some(&c) if c.is_whitespace() => {
                    self.chars.next();
                }
                Some(&'/') => {
                    let mut clone = self.chars.clone();
                    clone.next();
                    if clone.peek() == Some(&'/') {
                        for c in self.chars.by_ref() {
                            if c == '\n' {
                                self.line += 1;
                                break;
                            }
                        }
                    } else {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    fn lex_number(&mut self) -> MmapResult<Token> {
        let mut text = String::new();
        if self.chars.peek() == Some(&'0') {
            text.push(self.chars.next().unwrap());
            if matches!(self.chars.peek(), Some('x') | Some('X')) {
                text.push(self.chars.next().unwrap());
                while matches!(self.chars.peek(), Some(c) if c.is_ascii_hexdigit()) {
                    text.push(self.chars.next().unwrap());
                }
                let value = i64::from_str_radix(&text[2..], 16)
                    .map_err(|_| MmapError::parse(format!("invalid hex value {text:?}")))?;
                return Ok(Token::Int(value));
            }
            if matches!(self.chars.peek(), Some('b') | Some('B')) {
                text.push(self.chars.next().unwrap());
                while matches!(self.chars.peek(), Some(c) if *c == '0' || *c == '1') {
                    text.push(self.chars.next().unwrap());
                }
                let value = i64::from_str_radix(&text[2..], 2)
                    .map_err(|_| MmapError::parse(format!("invalid binary value {text:?}")))?;
                return Ok(Token::Int(value));
            }
        }
        while matches!(self.chars.peek(), Some(c) if c.is_ascii_digit()) {
            text.push(self.chars.next().unwrap());
        }
        text.parse::<i64>().map(Token::Int).map_err(|_| MmapError::parse(format!("invalid integer {text:?}")))
    }

    fn lex_string(&mut self) -> MmapResult<Token> {
        self.chars.next();
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some('"') => return Ok(Token::Str(text)),
                Some(c) => text.push(c),
                None => return Err(MmapError::parse("unterminated string literal")),
            }
        }
    }

    fn lex_ident(&mut self) -> Token {
        let mut text = String::new();
        while matches!(self.chars.peek(), Some(c) if c.is_alphanumeric() || *c == '_') {
            text.push(self.chars.next().unwrap());
        }
        Token::Ident(text)
    }
}

pub struct Parser {
    tokens: Vec<(Token, u32)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    fn line(&self) -> u32 {
        self.tokens[self.pos].1
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].0.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect_symbol(&mut self, c: char) -> MmapResult<()> {
        match self.advance() {
            Token::Symbol(s) if s == c => Ok(()),
            other => Err(MmapError::parse(format!("line {}: expected '{c}', found {other:?}", self.line()))),
        }
    }

    fn expect_ident(&mut self) -> MmapResult<String> {
        match self.advance() {
            Token::Ident(s) => Ok(s),
            other => Err(MmapError::parse(format!("line {}: expected identifier, found {other:?}", self.line()))),
        }
    }

    /// Accepts either a plain identifier or a quoted string, the latter
    /// used for names carrying a `{var}` template fragment inside a
    /// `generate` body (e.g. `"CH{i}"`).
    fn expect_name(&mut self) -> MmapResult<String> {
        match self.advance() {
            Token::Ident(s) => Ok(s),
            Token::Str(s) => Ok(s),
            other => Err(MmapError::parse(format!("line {}: expected a name, found {other:?}", self.line()))),
        }
    }

    fn expect_int(&mut self) -> MmapResult<i64> {
        match self.advance() {
            Token::Int(v) => Ok(v),
            other => Err(MmapError::parse(format!("line {}: expected integer, found {other:?}", self.line()))),
        }
    }

    fn at_ident(&self, word: &str) -> bool {
        matches!(self.peek(), Token::Ident(s) if s == word)
    }

    fn at_symbol(&self, c: char) -> bool {
        matches!(self.peek(), Token::Symbol(s) if *s == c)
    }

    pub fn parse_program(src: &str) -> MmapResult<Vec<Stmt>> {
        let tokens = Lexer::new(src).tokenize()?;
        let mut parser = Parser { tokens, pos: 0 };
        parser.parse_stmts_until_eof()
    }

    fn parse_stmts_until_eof(&mut self) -> MmapResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !matches!(self.peek(), Token::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_block(&mut self) -> MmapResult<Vec<Stmt>> {
        self.expect_symbol('{')?;
        let mut stmts = Vec::new();
        while !self.at_symbol('}') {
            stmts.push(self.parse_stmt()?);
        }
        self.expect_symbol('}')?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> MmapResult<Stmt> {
        if self.at_symbol('#') {
            self.advance();
            let setting = self.expect_ident()?;
            match setting.as_str() {
                "register_size" => {
                    let width = self.expect_int()? as u32;
                    self.expect_symbol(';')?;
                    Ok(Stmt::RegisterSize(width))
                }
                "addr_mode" => {
                    let mode = self.expect_ident()?;
                    if mode != "byte" && mode != "word" {
                        return Err(MmapError::runtime("addr_mode can only be 'byte' or 'word'"));
                    }
                    self.expect_symbol(';')?;
                    Ok(Stmt::AddrMode(mode))
                }
                other => Err(MmapError::runtime(format!("unknown setting: '{other}'"))),
            }
        } else if self.at_ident("param") {
            self.advance();
            let name = self.expect_ident()?;
            self.expect_symbol('=')?;
            let value = self.expect_int()?;
            self.expect_symbol(';')?;
            Ok(Stmt::Parameter { name, value })
        } else if self.at_ident("template") {
            self.advance();
            let name = self.expect_ident()?;
            let (properties, fields) = self.parse_field_body()?;
            Ok(Stmt::Template(TemplateDecl { name, properties, fields }))
        } else if self.at_ident("register") {
            self.advance();
            let name = self.expect_name()?;
            let address = if self.at_symbol('@') {
                self.advance();
                Some(self.parse_expr()?)
            } else {
                None
            };
            let template = if self.at_symbol('=') {
                self.advance();
                Some(self.expect_ident()?)
            } else {
                None
            };
            let (properties, fields) = self.parse_field_body()?;
            Ok(Stmt::Register(RegisterDecl { name, address, template, properties, fields }))
        } else if self.at_ident("generate") {
            self.advance();
            let var = self.expect_ident()?;
            if !self.at_ident("in") {
                return Err(MmapError::parse(format!("line {}: expected 'in' in generate statement", self.line())));
            }
            self.advance();
            let start = self.expect_int()?;
            self.expect_symbol('.')?;
            self.expect_symbol('.')?;
            let end = self.expect_int()?;
            let body = self.parse_block()?;
            Ok(Stmt::Generate(GenerateDecl { var, start, end, body }))
        } else if self.at_ident("in") || self.at_ident("out") {
            self.parse_port()
        } else {
            Err(MmapError::parse(format!("line {}: unexpected token {:?}", self.line(), self.peek())))
        }
    }

    fn parse_port(&mut self) -> MmapResult<Stmt> {
        let direction = match self.advance() {
            Token::Ident(s) if s == "in" => PortDirection::In,
            Token::Ident(s) if s == "out" => PortDirection::Out,
            other => return Err(MmapError::parse(format!("expected 'in' or 'out', found {other:?}"))),
        };
        let is_trigger = if self.at_symbol('!') {
            self.advance();
            true
        } else {
            false
        };
        let name = self.expect_name()?;
        self.expect_symbol('=')?;
        let source_register = self.expect_name()?;
        let source_field = if self.at_symbol('.') {
            self.advance();
            Some(self.expect_ident()?)
        } else {
            None
        };
        self.expect_symbol(';')?;
        Ok(Stmt::Port(PortDecl { direction, is_trigger, name, source_register, source_field }))
    }

    /// Parses `{ properties…; field…; }` for both `register` and `template`
    /// declarations.
    fn parse_field_body(&mut self) -> MmapResult<(Vec<(String, PropertyValue)>, Vec<FieldDecl>)> {
        self.expect_symbol('{')?;
        let mut properties = Vec::new();
        let mut fields = Vec::new();
        while !self.at_symbol('}') {
            if self.at_ident("field") {
                self.advance();
                fields.push(self.parse_field()?);
            } else {
                let key = self.expect_ident()?;
                self.expect_symbol('=')?;
                let value = self.parse_property_value()?;
                self.expect_symbol(';')?;
                properties.push((key, value));
            }
        }
        self.expect_symbol('}')?;
        Ok((properties, fields))
    }

    fn parse_field(&mut self) -> MmapResult<FieldDecl> {
        let name = self.expect_ident()?;
        self.expect_symbol('{')?;
        let mut high = None;
        let mut low = None;
        let mut access = None;
        let mut default = None;
        let mut properties = Vec::new();
        while !self.at_symbol('}') {
            let key = self.expect_ident()?;
            self.expect_symbol('=')?;
            match key.as_str() {
                "position" => {
                    self.expect_symbol('[')?;
                    let h = self.expect_int()? as u32;
                    let l = if self.at_symbol(':') {
                        self.advance();
                        self.expect_int()? as u32
                    } else {
                        h
                    };
                    self.expect_symbol(']')?;
                    high = Some(h);
                    low = Some(l);
                }
                "access" => {
                    let ident = self.expect_ident()?;
                    access = Some(match ident.as_str() {
                        "R" => Access::R,
                        "W" => Access::W,
                        "RW" => Access::Rw,
                        other => return Err(MmapError::runtime(format!("invalid access mode '{other}'"))),
                    });
                }
                "default" => {
                    default = Some(match self.advance() {
                        Token::Int(v) => DefaultValue::Integer(v as u64),
                        Token::Ident(name) => DefaultValue::Name(name),
                        other => return Err(MmapError::parse(format!("invalid default value {other:?}"))),
                    });
                }
                _ => {
                    let value = self.parse_property_value()?;
                    properties.push((key, value));
                }
            }
            self.expect_symbol(';')?;
        }
        self.expect_symbol('}')?;
        let high = high.ok_or_else(|| MmapError::semantic(format!("field '{name}' is missing a position")))?;
        let low = low.unwrap();
        let access = access.ok_or_else(|| MmapError::semantic(format!("field '{name}' is missing an access mode")))?;
        Ok(FieldDecl { name, high, low, access, default, properties })
    }

    fn parse_property_value(&mut self) -> MmapResult<PropertyValue> {
        match self.advance() {
            Token::Str(s) => Ok(PropertyValue::Str(s)),
            Token::Int(v) => Ok(PropertyValue::Int(v)),
            other => Err(MmapError::parse(format!("expected a property value, found {other:?}"))),
        }
    }

    /// A small arithmetic sub-language over `+ - * / ( )` and names,
    /// mirroring `EXPRESSION_REGEX`/`_templated_name_subst` in the source
    /// implementation without resorting to `eval`.
    fn parse_expr(&mut self) -> MmapResult<Expr> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> MmapResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            if self.at_symbol('+') {
                self.advance();
                lhs = Expr::combine(&lhs, BinaryOp::Add, &self.parse_multiplicative()?);
            } else if self.at_symbol('-') {
                self.advance();
                lhs = Expr::combine(&lhs, BinaryOp::Sub, &self.parse_multiplicative()?);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn parse_multiplicative(&mut self) -> MmapResult<Expr> {
        let mut lhs = self.parse_primary()?;
        loop {
            if self.at_symbol('*') {
                self.advance();
                lhs = Expr::combine(&lhs, BinaryOp::Mul, &self.parse_primary()?);
            } else if self.at_symbol('/') {
                self.advance();
                lhs = Expr::combine(&lhs, BinaryOp::Div, &self.parse_primary()?);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn parse_primary(&mut self) -> MmapResult<Expr> {
        match self.advance() {
            Token::Int(v) => Ok(Expr::literal(v)),
            Token::Ident(name) => Ok(Expr::name(name)),
            Token::Symbol('(') => {
                let inner = self.parse_expr()?;
                self.expect_symbol(')')?;
                Ok(inner)
            }
            other => Err(MmapError::parse(format!("expected a value, found {other:?}"))),
        }
    }
}
