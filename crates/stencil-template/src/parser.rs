/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Parser for the template statement language.
//!
//! Expressions are parsed by precedence climbing. From loosest to tightest:
//!
//! | level | operators |
//! |-------|-----------|
//! | or | `or` |
//! | and | `and` |
//! | comparison | `== != < <= > >=` |
//! | concatenation | `..` |
//! | additive | `+ -` |
//! | multiplicative | `* / %` |
//! | unary | `not -` |
//! | postfix | `.field` `[index]` `(args)` |

use crate::ast::{BinaryOp, Expr, Statement, UnaryOp};
use crate::lexer::{Token, tokenize};

const KEYWORDS: &[&str] = &[
    "if", "elif", "else", "end", "for", "in", "set", "and", "or", "not", "nil", "true", "false",
];

/// Parse the body of a placeholder as a single expression.
pub(crate) fn parse_expression(source: &str) -> Result<Expr, String> {
    let mut parser = Parser::new(tokenize(source)?);
    let expr = parser.expression()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse the text that follows the `#` of an escape line.
pub(crate) fn parse_statement(source: &str) -> Result<Statement, String> {
    let trimmed = source.trim();
    if trimmed.is_empty() || trimmed.starts_with("--") {
        return Ok(Statement::Nop);
    }

    let mut parser = Parser::new(tokenize(trimmed)?);
    let statement = match parser.peek_keyword() {
        Some("if") => {
            parser.advance();
            Statement::If(parser.expression()?)
        }
        Some("elif") => {
            parser.advance();
            Statement::Elif(parser.expression()?)
        }
        Some("else") => {
            parser.advance();
            Statement::Else
        }
        Some("end") => {
            parser.advance();
            Statement::End
        }
        Some("for") => {
            parser.advance();
            parser.for_header()?
        }
        Some("set") => {
            parser.advance();
            let name = parser.identifier("a variable name after 'set'")?;
            parser.expect(&Token::Assign, "'=' after the variable name")?;
            Statement::Set {
                name,
                value: parser.expression()?,
            }
        }
        _ => match parser.expression()? {
            call @ Expr::Call(..) => Statement::Expr(call),
            _ => {
                return Err(
                    "expected a statement, found an expression; write $(\"#\") for a literal '#'"
                        .to_string(),
                );
            }
        },
    };
    parser.expect_end()?;
    Ok(statement)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_keyword(&self) -> Option<&str> {
        match self.peek() {
            Some(Token::Ident(name)) if KEYWORDS.contains(&name.as_str()) => Some(name.as_str()),
            _ => None,
        }
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword() == Some(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), String> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_end(&self) -> Result<(), String> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(format!("unexpected {}", token.describe())),
        }
    }

    fn unexpected(&self, what: &str) -> String {
        match self.peek() {
            Some(token) => format!("expected {}, found {}", what, token.describe()),
            None => format!("expected {}, found end of line", what),
        }
    }

    fn identifier(&mut self, what: &str) -> Result<String, String> {
        match self.peek() {
            Some(Token::Ident(name)) if !KEYWORDS.contains(&name.as_str()) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn for_header(&mut self) -> Result<Statement, String> {
        let mut names = vec![self.identifier("a loop variable after 'for'")?];
        while self.eat(&Token::Comma) {
            names.push(self.identifier("a loop variable after ','")?);
        }
        if !self.eat_keyword("in") {
            return Err(self.unexpected("'in' after the loop variables"));
        }
        Ok(Statement::For {
            names,
            iterable: self.expression()?,
        })
    }

    fn expression(&mut self) -> Result<Expr, String> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.and_expr()?;
        while self.eat_keyword("or") {
            let right = self.and_expr()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.comparison()?;
        while self.eat_keyword("and") {
            let right = self.comparison()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr, String> {
        let mut left = self.concatenation()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::Ne,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.concatenation()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn concatenation(&mut self) -> Result<Expr, String> {
        let mut left = self.additive()?;
        while self.eat(&Token::DotDot) {
            let right = self.additive()?;
            left = Expr::Binary(BinaryOp::Concat, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, String> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, String> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.eat_keyword("not") {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.unary()?)));
        }
        if self.eat(&Token::Minus) {
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, String> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let name = self.identifier("a field name after '.'")?;
                expr = Expr::Field(Box::new(expr), name);
            } else if self.eat(&Token::LBracket) {
                let index = self.expression()?;
                self.expect(&Token::RBracket, "']'")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.eat(&Token::LParen) {
                let args = self.comma_list(&Token::RParen, "')'")?;
                expr = Expr::Call(Box::new(expr), args);
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.peek().cloned() {
            Some(Token::Number(n)) => {
                self.pos += 1;
                Ok(Expr::Number(n))
            }
            Some(Token::Str(s)) => {
                self.pos += 1;
                Ok(Expr::Str(s))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let expr = self.expression()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(expr)
            }
            Some(Token::LBracket) => {
                self.pos += 1;
                Ok(Expr::List(self.comma_list(&Token::RBracket, "']'")?))
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "nil" => {
                    self.pos += 1;
                    Ok(Expr::Nil)
                }
                "true" | "false" => {
                    self.pos += 1;
                    Ok(Expr::Bool(name == "true"))
                }
                keyword if KEYWORDS.contains(&keyword) => {
                    Err(format!("unexpected keyword '{}'", keyword))
                }
                _ => {
                    self.pos += 1;
                    Ok(Expr::Var(name.clone()))
                }
            },
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// Parse `a, b, c` up to and including `close`. Allows an empty list.
    fn comma_list(&mut self, close: &Token, what: &str) -> Result<Vec<Expr>, String> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.expression()?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(&Token::Comma, &format!("',' or {}", what))?;
        }
    }
}
