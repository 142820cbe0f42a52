//! Recursive-descent parser producing the Mason AST.

use std::mem::discriminant;

use mason_syntax::ast::{BinOp, Expr, Program, Stmt, TargetKind, UnOp};
use mason_syntax::error::{Error, Result};
use mason_syntax::token::{Token, TokenKind};

/// Parses a token stream into a [`Program`].
///
/// Newline and `;` tokens separate statements; they carry no meaning inside
/// bracketed literals, where they are skipped. Parsing aborts on the first
/// error.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.is_empty() {
            tokens.push(Token {
                kind: TokenKind::Eof,
                lexeme: String::new(),
                line: 1,
                column: 1,
            });
        }
        Self { tokens, pos: 0 }
    }

    pub fn parse_program(&mut self) -> Result<Program> {
        let mut statements = Vec::new();
        self.skip_separators();
        while !self.is_at_end() {
            statements.push(self.parse_statement()?);
            self.skip_separators();
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        self.skip_separators();
        let kind = self.current().kind.clone();
        match kind {
            TokenKind::Project => {
                self.advance();
                let name = self.expect_string("Expected project name")?;
                self.expect(&TokenKind::Do, "Expected 'do' after project name")?;
                let body = self.parse_block()?;
                self.expect(&TokenKind::End, "Expected 'end' to close project block")?;
                Ok(Stmt::Project { name, body })
            }
            TokenKind::Executable => self.parse_target(TargetKind::Executable),
            TokenKind::Library => self.parse_target(TargetKind::Library),
            TokenKind::StaticLibrary => self.parse_target(TargetKind::StaticLibrary),
            TokenKind::SharedLibrary => self.parse_target(TargetKind::SharedLibrary),
            TokenKind::Compiler => {
                self.advance();
                self.expect(&TokenKind::Do, "Expected 'do' after 'compiler'")?;
                let body = self.parse_block()?;
                self.expect(&TokenKind::End, "Expected 'end' to close compiler block")?;
                Ok(Stmt::Compiler { body })
            }
            TokenKind::Dependency => {
                self.advance();
                let name = match self.current().kind.clone() {
                    TokenKind::Str(s) => {
                        self.advance();
                        s
                    }
                    TokenKind::Ident(s) => {
                        self.advance();
                        s
                    }
                    _ => return self.error_here("Expected dependency name"),
                };
                self.expect(&TokenKind::Do, "Expected 'do' after dependency name")?;
                let body = self.parse_block()?;
                self.expect(&TokenKind::End, "Expected 'end' to close dependency block")?;
                Ok(Stmt::Dependency { name, body })
            }
            TokenKind::Task => {
                self.advance();
                let name = match self.current().kind.clone() {
                    TokenKind::Symbol(s) | TokenKind::Str(s) => {
                        self.advance();
                        s
                    }
                    _ => return self.error_here("Expected task name"),
                };
                self.expect(&TokenKind::Do, "Expected 'do' after task name")?;
                let body = self.parse_block()?;
                self.expect(&TokenKind::End, "Expected 'end' to close task block")?;
                Ok(Stmt::Task { name, body })
            }
            TokenKind::If => {
                self.advance();
                self.parse_if()
            }
            TokenKind::Unless => {
                self.advance();
                let condition = self.parse_expression()?;
                self.expect(&TokenKind::Do, "Expected 'do' after unless condition")?;
                let body = self.parse_block()?;
                self.expect(&TokenKind::End, "Expected 'end' to close unless statement")?;
                Ok(Stmt::Unless { condition, body })
            }
            TokenKind::For => {
                self.advance();
                let variable = self.expect_ident("Expected variable name")?;
                self.expect(&TokenKind::In, "Expected 'in' in for loop")?;
                let iterable = self.parse_expression()?;
                self.expect(&TokenKind::Do, "Expected 'do' after for loop header")?;
                let body = self.parse_block()?;
                self.expect(&TokenKind::End, "Expected 'end' to close for loop")?;
                Ok(Stmt::For {
                    variable,
                    iterable,
                    body,
                })
            }
            TokenKind::Fn => {
                self.advance();
                self.parse_function_def()
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.statement_ended() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                Ok(Stmt::Return(value))
            }
            _ => self.parse_assignment_or_expression(),
        }
    }

    fn parse_target(&mut self, kind: TargetKind) -> Result<Stmt> {
        self.advance();
        let name = self.expect_string("Expected target name")?;
        self.expect(&TokenKind::Do, "Expected 'do' after target name")?;
        let body = self.parse_block()?;
        self.expect(&TokenKind::End, "Expected 'end' to close target block")?;
        Ok(Stmt::Target { kind, name, body })
    }

    // `else if` becomes an else body holding a single nested `if`; the
    // innermost arm of a chain owns the one closing `end`.
    fn parse_if(&mut self) -> Result<Stmt> {
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::Do, "Expected 'do' after if condition")?;
        let then_body = self.parse_block()?;
        let mut else_body = None;
        let mut chained = false;
        if self.matches(&TokenKind::Else) {
            if self.matches(&TokenKind::If) {
                else_body = Some(vec![self.parse_if()?]);
                chained = true;
            } else {
                else_body = Some(self.parse_block()?);
            }
        }
        if !chained {
            self.expect(&TokenKind::End, "Expected 'end' to close if statement")?;
        }
        Ok(Stmt::If {
            condition,
            then_body,
            else_body,
        })
    }

    fn parse_function_def(&mut self) -> Result<Stmt> {
        let name = self.expect_ident("Expected function name")?;
        self.expect(&TokenKind::LParen, "Expected '(' after function name")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.expect_ident("Expected parameter name")?);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "Expected ')' after parameters")?;
        self.expect(&TokenKind::Do, "Expected 'do' after function parameters")?;
        let body = self.parse_block()?;
        self.expect(&TokenKind::End, "Expected 'end' to close function definition")?;
        Ok(Stmt::FunctionDef { name, params, body })
    }

    fn parse_assignment_or_expression(&mut self) -> Result<Stmt> {
        if let TokenKind::Ident(name) = self.current().kind.clone() {
            self.advance();
            if self.matches(&TokenKind::Equal) {
                let value = self.parse_expression()?;
                return Ok(Stmt::Assignment { name, value });
            }
            if self.matches(&TokenKind::PlusEq) {
                // a += e  desugars to  a = a + e
                let right = self.parse_expression()?;
                let value = Expr::Binary {
                    op: BinOp::Add,
                    left: Box::new(Expr::Ident(name.clone())),
                    right: Box::new(right),
                };
                return Ok(Stmt::Assignment { name, value });
            }
            // not an assignment: rewind and parse as an expression
            self.pos -= 1;
        }
        let expr = self.parse_expression()?;
        Ok(Stmt::ExprStmt(expr))
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();
        self.skip_separators();
        while !self.check(&TokenKind::End) && !self.check(&TokenKind::Else) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
            self.skip_separators();
        }
        Ok(statements)
    }

    // expressions, lowest precedence first

    pub fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.matches(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = binary(BinOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_equality()?;
        while self.matches(&TokenKind::And) {
            let right = self.parse_equality()?;
            left = binary(BinOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = if self.matches(&TokenKind::EqEq) {
                BinOp::Eq
            } else if self.matches(&TokenKind::NotEq) {
                BinOp::Ne
            } else {
                break;
            };
            let right = self.parse_comparison()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = if self.matches(&TokenKind::Less) {
                BinOp::Lt
            } else if self.matches(&TokenKind::Greater) {
                BinOp::Gt
            } else if self.matches(&TokenKind::LessEq) {
                BinOp::Le
            } else if self.matches(&TokenKind::GreaterEq) {
                BinOp::Ge
            } else {
                break;
            };
            let right = self.parse_term()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut left = self.parse_factor()?;
        loop {
            let op = if self.matches(&TokenKind::Plus) {
                BinOp::Add
            } else if self.matches(&TokenKind::Minus) {
                BinOp::Sub
            } else {
                break;
            };
            let right = self.parse_factor()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.matches(&TokenKind::Star) {
                BinOp::Mul
            } else if self.matches(&TokenKind::Slash) {
                BinOp::Div
            } else if self.matches(&TokenKind::Percent) {
                BinOp::Rem
            } else {
                break;
            };
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = if self.matches(&TokenKind::Minus) {
            Some(UnOp::Neg)
        } else if self.matches(&TokenKind::Not) {
            Some(UnOp::Not)
        } else {
            None
        };
        if let Some(op) = op {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        self.parse_call()
    }

    fn parse_call(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.matches(&TokenKind::LParen) {
                // calls are syntactic: only an identifier may be called
                let name = match expr {
                    Expr::Ident(name) => name,
                    _ => return self.error_here("Expected function name"),
                };
                let mut args = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    loop {
                        args.push(self.parse_expression()?);
                        if !self.matches(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RParen, "Expected ')' after arguments")?;
                expr = Expr::Call { name, args };
            } else if self.matches(&TokenKind::Dot) {
                let name = self.expect_ident("Expected member name")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    name,
                };
            } else if self.matches(&TokenKind::LBracket) {
                let index = self.parse_expression()?;
                self.expect(&TokenKind::RBracket, "Expected ']' after index")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let kind = self.current().kind.clone();
        match kind {
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::StringLit(s))
            }
            TokenKind::Number { value, is_integer } => {
                self.advance();
                Ok(Expr::NumberLit { value, is_integer })
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::BoolLit(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::BoolLit(false))
            }
            TokenKind::Nil => {
                self.advance();
                Ok(Expr::NilLit)
            }
            TokenKind::Symbol(name) => {
                self.advance();
                Ok(Expr::Symbol(name))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Ident(name))
            }
            TokenKind::LBracket => {
                self.advance();
                self.parse_array()
            }
            TokenKind::LBrace => {
                self.advance();
                self.parse_map()
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RParen, "Expected ')' after expression")?;
                Ok(expr)
            }
            _ => self.error_here("Expected expression"),
        }
    }

    fn parse_array(&mut self) -> Result<Expr> {
        let mut elements = Vec::new();
        self.skip_newlines();
        if !self.check(&TokenKind::RBracket) {
            loop {
                self.skip_newlines();
                elements.push(self.parse_expression()?);
                self.skip_newlines();
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
                self.skip_newlines();
                if self.check(&TokenKind::RBracket) {
                    break; // trailing comma
                }
            }
        }
        self.expect(&TokenKind::RBracket, "Expected ']' after array elements")?;
        Ok(Expr::ArrayLit(elements))
    }

    fn parse_map(&mut self) -> Result<Expr> {
        let mut pairs = Vec::new();
        self.skip_newlines();
        if !self.check(&TokenKind::RBrace) {
            loop {
                self.skip_newlines();
                let key = self.parse_expression()?;
                self.expect(&TokenKind::Colon, "Expected ':' in hash literal")?;
                let value = self.parse_expression()?;
                pairs.push((key, value));
                self.skip_newlines();
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
                self.skip_newlines();
                if self.check(&TokenKind::RBrace) {
                    break; // trailing comma
                }
            }
        }
        self.expect(&TokenKind::RBrace, "Expected '}' after hash elements")?;
        Ok(Expr::MapLit(pairs))
    }

    // token helpers

    fn current(&self) -> &Token {
        // the stream always ends with Eof, so pos stays in bounds
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        discriminant(&self.current().kind) == discriminant(kind)
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, message: &str) -> Result<()> {
        if self.matches(kind) {
            Ok(())
        } else {
            self.error_here(message)
        }
    }

    fn expect_string(&mut self, message: &str) -> Result<String> {
        if let TokenKind::Str(s) = self.current().kind.clone() {
            self.advance();
            Ok(s)
        } else {
            self.error_here(message)
        }
    }

    fn expect_ident(&mut self, message: &str) -> Result<String> {
        if let TokenKind::Ident(s) = self.current().kind.clone() {
            self.advance();
            Ok(s)
        } else {
            self.error_here(message)
        }
    }

    fn statement_ended(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::End | TokenKind::Eof
        )
    }

    fn skip_separators(&mut self) {
        while matches!(
            self.current().kind,
            TokenKind::Newline | TokenKind::Semicolon
        ) {
            self.advance();
        }
    }

    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn error_here<T>(&self, message: &str) -> Result<T> {
        let token = self.current();
        let message = if token.lexeme.is_empty() {
            message.to_string()
        } else {
            format!("{} at '{}'", message, token.lexeme)
        };
        Err(Error::parser(message, token.line, token.column))
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
