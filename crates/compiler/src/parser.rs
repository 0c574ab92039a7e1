//! Recursive-descent parser for Sigma.
//!
//! Statements are parsed by recursive descent, expressions by precedence
//! climbing (one method per precedence level, lowest first). Errors are
//! recorded in the [`Reporter`] and recovered with panic-mode
//! synchronization: tokens are discarded until the next
//! statement-introducing keyword, so one run can report several errors.

use crate::ast::{BinaryOp, Expr, IncOp, LiteralValue, LogicalOp, Stmt, SwitchCase, UnaryOp};
use crate::errors::Reporter;
use crate::lexer::{Literal, Token, TokenKind};

/// Marker for an already-reported parse error. Carrying no payload: the
/// diagnostic went to the reporter, the marker just unwinds to the nearest
/// synchronization point.
struct ParseInterrupt;

type PResult<T> = Result<T, ParseInterrupt>;

/// Parameter lists and call argument lists are capped; exceeding the cap is
/// reported but does not abort the parse.
const MAX_ARITY: usize = 255;

pub struct Parser<'r> {
    tokens: Vec<Token>,
    pos: usize,
    reporter: &'r mut Reporter,
}

impl<'r> Parser<'r> {
    pub fn new(tokens: Vec<Token>, reporter: &'r mut Reporter) -> Self {
        Parser {
            tokens,
            pos: 0,
            reporter,
        }
    }

    /// Parse the whole token stream into a list of top-level statements.
    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        statements
    }

    /// Parse one declaration, absorbing any parse error by synchronizing.
    fn declaration(&mut self) -> Option<Stmt> {
        let result = match self.peek().kind {
            TokenKind::Fr => self.var_decl(),
            TokenKind::Vibe => self.func_def(),
            _ => self.statement(),
        };
        match result {
            Ok(stmt) => Some(stmt),
            Err(ParseInterrupt) => {
                self.synchronize();
                None
            }
        }
    }

    fn var_decl(&mut self) -> PResult<Stmt> {
        let line = self.peek().line;
        self.advance(); // fr
        let name = self.consume(TokenKind::Ident, "Expected variable name")?;
        self.consume(TokenKind::Eq, "Expected '=' after variable name")?;
        let init = self.expression()?;
        Ok(Stmt::VarDecl {
            name: name.lexeme,
            init,
            line,
        })
    }

    fn func_def(&mut self) -> PResult<Stmt> {
        let line = self.peek().line;
        self.advance(); // vibe
        let name = self.consume(TokenKind::Ident, "Expected function name")?;
        self.consume(TokenKind::LeftParen, "Expected '(' after function name")?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= MAX_ARITY {
                    let t = self.peek().clone();
                    self.reporter.parser_error(
                        t.line,
                        &t.lexeme,
                        format!("Can't have more than {} parameters", MAX_ARITY),
                    );
                }
                let param = self.consume(TokenKind::Ident, "Expected parameter name")?;
                params.push(param.lexeme);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expected ')' after parameters")?;

        self.consume(TokenKind::LeftBrace, "Expected '{' before function body")?;
        let body = self.brace_body()?;
        Ok(Stmt::FuncDef {
            name: name.lexeme,
            params,
            body,
            line,
        })
    }

    fn statement(&mut self) -> PResult<Stmt> {
        match self.peek().kind {
            TokenKind::Say => self.print_statement(),
            TokenKind::Lowkey => self.if_statement(),
            TokenKind::Goon => self.while_statement(),
            TokenKind::Edge => self.for_statement(),
            TokenKind::Send => self.return_statement(),
            TokenKind::Simp => self.switch_statement(),
            TokenKind::Yeet => self.try_statement(),
            TokenKind::Mog => {
                let line = self.peek().line;
                self.advance();
                Ok(Stmt::Break { line })
            }
            TokenKind::Skip => {
                let line = self.peek().line;
                self.advance();
                Ok(Stmt::Continue { line })
            }
            TokenKind::LeftBrace => self.block(),
            _ => {
                let expr = self.expression()?;
                Ok(Stmt::Expression { expr })
            }
        }
    }

    fn print_statement(&mut self) -> PResult<Stmt> {
        let line = self.peek().line;
        self.advance(); // say
        let expr = self.expression()?;
        Ok(Stmt::Print { expr, line })
    }

    /// `lowkey (cond) { } midkey (cond) { } ... highkey { }`
    ///
    /// The `midkey` chain is lowered into nested `If` nodes, innermost last.
    fn if_statement(&mut self) -> PResult<Stmt> {
        let line = self.peek().line;
        self.advance(); // lowkey
        self.consume(TokenKind::LeftParen, "Expected '(' after 'lowkey'")?;
        let cond = self.expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after condition")?;
        let then_branch = self.block()?;

        let mut elifs = Vec::new();
        while self.check(TokenKind::Midkey) {
            let elif_line = self.peek().line;
            self.advance();
            self.consume(TokenKind::LeftParen, "Expected '(' after 'midkey'")?;
            let elif_cond = self.expression()?;
            self.consume(TokenKind::RightParen, "Expected ')' after condition")?;
            let elif_body = self.block()?;
            elifs.push((elif_cond, elif_body, elif_line));
        }

        let mut else_branch: Option<Box<Stmt>> = if self.match_kind(TokenKind::Highkey) {
            Some(Box::new(self.block()?))
        } else {
            None
        };

        for (elif_cond, elif_body, elif_line) in elifs.into_iter().rev() {
            else_branch = Some(Box::new(Stmt::If {
                cond: elif_cond,
                then_branch: Box::new(elif_body),
                else_branch,
                line: elif_line,
            }));
        }

        Ok(Stmt::If {
            cond,
            then_branch: Box::new(then_branch),
            else_branch,
            line,
        })
    }

    fn while_statement(&mut self) -> PResult<Stmt> {
        let line = self.peek().line;
        self.advance(); // goon
        self.consume(TokenKind::LeftParen, "Expected '(' after 'goon'")?;
        let cond = self.expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after condition")?;
        let body = self.block()?;
        Ok(Stmt::While {
            cond,
            body: Box::new(body),
            line,
        })
    }

    /// `edge (init, cond, incr) { }`. The three clauses are separated by
    /// commas and each may be empty.
    fn for_statement(&mut self) -> PResult<Stmt> {
        let line = self.peek().line;
        self.advance(); // edge
        self.consume(TokenKind::LeftParen, "Expected '(' after 'edge'")?;

        let init = if self.check(TokenKind::Comma) {
            None
        } else if self.check(TokenKind::Fr) {
            Some(Box::new(self.var_decl()?))
        } else {
            let expr = self.expression()?;
            Some(Box::new(Stmt::Expression { expr }))
        };
        self.consume(TokenKind::Comma, "Expected ',' after loop initializer")?;

        let cond = if self.check(TokenKind::Comma) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Comma, "Expected ',' after loop condition")?;

        let incr = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::RightParen, "Expected ')' after loop clauses")?;

        let body = self.block()?;
        Ok(Stmt::For {
            init,
            cond,
            incr,
            body: Box::new(body),
            line,
        })
    }

    fn return_statement(&mut self) -> PResult<Stmt> {
        let line = self.peek().line;
        self.advance(); // send
        let value = if starts_expression(self.peek().kind) {
            Some(self.expression()?)
        } else {
            None
        };
        Ok(Stmt::Return { value, line })
    }

    /// `simp (expr) { stan val: { } ... ghost: { } }`. Arms may appear in
    /// any order; there is no fall-through between arms.
    fn switch_statement(&mut self) -> PResult<Stmt> {
        let line = self.peek().line;
        self.advance(); // simp
        self.consume(TokenKind::LeftParen, "Expected '(' after 'simp'")?;
        let scrutinee = self.expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after switch value")?;
        self.consume(TokenKind::LeftBrace, "Expected '{' after switch value")?;

        let mut cases = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            match self.peek().kind {
                TokenKind::Stan => {
                    let case_line = self.peek().line;
                    self.advance();
                    let value = self.expression()?;
                    self.consume(TokenKind::Colon, "Expected ':' after case value")?;
                    self.consume(TokenKind::LeftBrace, "Expected '{' after ':'")?;
                    let body = self.brace_body()?;
                    cases.push(SwitchCase {
                        value: Some(value),
                        body,
                        is_default: false,
                        line: case_line,
                    });
                }
                TokenKind::Ghost => {
                    let case_line = self.peek().line;
                    self.advance();
                    self.consume(TokenKind::Colon, "Expected ':' after 'ghost'")?;
                    self.consume(TokenKind::LeftBrace, "Expected '{' after ':'")?;
                    let body = self.brace_body()?;
                    cases.push(SwitchCase {
                        value: None,
                        body,
                        is_default: true,
                        line: case_line,
                    });
                }
                _ => {
                    let t = self.peek().clone();
                    return Err(self.error_at(&t, "Expected 'stan' or 'ghost' in 'simp' body"));
                }
            }
        }
        self.consume(TokenKind::RightBrace, "Expected '}' after 'simp' body")?;

        Ok(Stmt::Switch {
            scrutinee,
            cases,
            line,
        })
    }

    fn try_statement(&mut self) -> PResult<Stmt> {
        let line = self.peek().line;
        self.advance(); // yeet
        let try_block = self.block()?;
        self.consume(TokenKind::Caught, "Expected 'caught' after 'yeet' block")?;
        let catch_block = self.block()?;
        Ok(Stmt::TryCatch {
            try_block: Box::new(try_block),
            catch_block: Box::new(catch_block),
            line,
        })
    }

    /// A braced block as a statement.
    fn block(&mut self) -> PResult<Stmt> {
        let line = self.peek().line;
        self.consume(TokenKind::LeftBrace, "Expected '{'")?;
        let statements = self.brace_body()?;
        Ok(Stmt::Block { statements, line })
    }

    /// Declarations up to (and through) the closing `}`. The opening brace
    /// has already been consumed.
    fn brace_body(&mut self) -> PResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        self.consume(TokenKind::RightBrace, "Expected '}' after block")?;
        Ok(statements)
    }

    // ------------------------------------------------------------------
    // Expressions, lowest precedence first
    // ------------------------------------------------------------------

    fn expression(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    /// Assignment is right-associative. Only `Identifier` and `Index`
    /// expressions are valid targets; anything else is reported at the
    /// assignment operator and the original expression is returned.
    fn assignment(&mut self) -> PResult<Expr> {
        let expr = self.or()?;

        if self.match_kind(TokenKind::Eq) {
            let op_token = self.previous().clone();
            let value = self.assignment()?;
            return Ok(match expr {
                Expr::Identifier { name, line } => Expr::Assign {
                    name,
                    value: Box::new(value),
                    line,
                },
                Expr::Index {
                    object,
                    index,
                    line,
                } => Expr::IndexAssign {
                    object,
                    index,
                    value: Box::new(value),
                    line,
                },
                other => {
                    self.reporter.parser_error(
                        op_token.line,
                        &op_token.lexeme,
                        "Invalid assignment target",
                    );
                    other
                }
            });
        }

        if let Some(op) = compound_op(self.peek().kind) {
            self.advance();
            let op_token = self.previous().clone();
            let value = self.assignment()?;
            return Ok(match expr {
                Expr::Identifier { name, line } => Expr::CompoundAssign {
                    name,
                    op,
                    value: Box::new(value),
                    line,
                },
                other => {
                    self.reporter.parser_error(
                        op_token.line,
                        &op_token.lexeme,
                        "Invalid assignment target",
                    );
                    other
                }
            });
        }

        Ok(expr)
    }

    fn or(&mut self) -> PResult<Expr> {
        let mut expr = self.and()?;
        while self.match_kind(TokenKind::PipePipe) {
            let line = self.previous().line;
            let right = self.and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                op: LogicalOp::Or,
                right: Box::new(right),
                line,
            };
        }
        Ok(expr)
    }

    fn and(&mut self) -> PResult<Expr> {
        let mut expr = self.bit_or()?;
        while self.match_kind(TokenKind::AmpAmp) {
            let line = self.previous().line;
            let right = self.bit_or()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                op: LogicalOp::And,
                right: Box::new(right),
                line,
            };
        }
        Ok(expr)
    }

    fn bit_or(&mut self) -> PResult<Expr> {
        let mut expr = self.bit_xor()?;
        while self.match_kind(TokenKind::Pipe) {
            let line = self.previous().line;
            let right = self.bit_xor()?;
            expr = binary(expr, BinaryOp::BitOr, right, line);
        }
        Ok(expr)
    }

    fn bit_xor(&mut self) -> PResult<Expr> {
        let mut expr = self.bit_and()?;
        while self.match_kind(TokenKind::Caret) {
            let line = self.previous().line;
            let right = self.bit_and()?;
            expr = binary(expr, BinaryOp::BitXor, right, line);
        }
        Ok(expr)
    }

    fn bit_and(&mut self) -> PResult<Expr> {
        let mut expr = self.equality()?;
        while self.match_kind(TokenKind::Amp) {
            let line = self.previous().line;
            let right = self.equality()?;
            expr = binary(expr, BinaryOp::BitAnd, right, line);
        }
        Ok(expr)
    }

    fn equality(&mut self) -> PResult<Expr> {
        let mut expr = self.comparison()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::BangEq => BinaryOp::Ne,
                _ => break,
            };
            self.advance();
            let line = self.previous().line;
            let right = self.comparison()?;
            expr = binary(expr, op, right, line);
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> PResult<Expr> {
        let mut expr = self.shift()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Less => BinaryOp::Lt,
                TokenKind::Greater => BinaryOp::Gt,
                TokenKind::LessEq => BinaryOp::Le,
                TokenKind::GreaterEq => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let line = self.previous().line;
            let right = self.shift()?;
            expr = binary(expr, op, right, line);
        }
        Ok(expr)
    }

    fn shift(&mut self) -> PResult<Expr> {
        let mut expr = self.term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Shl => BinaryOp::Shl,
                TokenKind::Shr => BinaryOp::Shr,
                _ => break,
            };
            self.advance();
            let line = self.previous().line;
            let right = self.term()?;
            expr = binary(expr, op, right, line);
        }
        Ok(expr)
    }

    fn term(&mut self) -> PResult<Expr> {
        let mut expr = self.factor()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let line = self.previous().line;
            let right = self.factor()?;
            expr = binary(expr, op, right, line);
        }
        Ok(expr)
    }

    fn factor(&mut self) -> PResult<Expr> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            let line = self.previous().line;
            let right = self.unary()?;
            expr = binary(expr, op, right, line);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> PResult<Expr> {
        let op = match self.peek().kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let line = self.previous().line;
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
                line,
            });
        }

        let inc = match self.peek().kind {
            TokenKind::PlusPlus => Some(IncOp::Inc),
            TokenKind::MinusMinus => Some(IncOp::Dec),
            _ => None,
        };
        if let Some(op) = inc {
            self.advance();
            let op_token = self.previous().clone();
            let operand = self.unary()?;
            return Ok(match operand {
                Expr::Identifier { name, line } => Expr::Increment {
                    name,
                    op,
                    prefix: true,
                    line,
                },
                other => {
                    self.reporter.parser_error(
                        op_token.line,
                        &op_token.lexeme,
                        "Invalid increment target",
                    );
                    other
                }
            });
        }

        self.postfix()
    }

    fn postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.match_kind(TokenKind::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_kind(TokenKind::LeftBracket) {
                let line = self.previous().line;
                let index = self.expression()?;
                self.consume(TokenKind::RightBracket, "Expected ']' after index")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    line,
                };
            } else if self.check(TokenKind::PlusPlus) || self.check(TokenKind::MinusMinus) {
                let op = if self.peek().kind == TokenKind::PlusPlus {
                    IncOp::Inc
                } else {
                    IncOp::Dec
                };
                self.advance();
                let op_token = self.previous().clone();
                expr = match expr {
                    Expr::Identifier { name, line } => Expr::Increment {
                        name,
                        op,
                        prefix: false,
                        line,
                    },
                    other => {
                        self.reporter.parser_error(
                            op_token.line,
                            &op_token.lexeme,
                            "Invalid increment target",
                        );
                        other
                    }
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> PResult<Expr> {
        let line = self.previous().line;
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if args.len() >= MAX_ARITY {
                    let t = self.peek().clone();
                    self.reporter.parser_error(
                        t.line,
                        &t.lexeme,
                        format!("Can't have more than {} arguments", MAX_ARITY),
                    );
                }
                args.push(self.expression()?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expected ')' after arguments")?;
        Ok(Expr::Call {
            callee: Box::new(callee),
            args,
            line,
        })
    }

    fn primary(&mut self) -> PResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Int => {
                self.advance();
                let value = match token.literal {
                    Literal::Int(v) => v,
                    _ => 0,
                };
                Ok(Expr::Literal {
                    value: LiteralValue::Int(value),
                    line: token.line,
                })
            }
            TokenKind::Float => {
                self.advance();
                let value = match token.literal {
                    Literal::Float(v) => v,
                    _ => 0.0,
                };
                Ok(Expr::Literal {
                    value: LiteralValue::Float(value),
                    line: token.line,
                })
            }
            TokenKind::Ongod => {
                self.advance();
                Ok(Expr::Literal {
                    value: LiteralValue::Bool(true),
                    line: token.line,
                })
            }
            TokenKind::Cap => {
                self.advance();
                Ok(Expr::Literal {
                    value: LiteralValue::Bool(false),
                    line: token.line,
                })
            }
            TokenKind::Nah => {
                self.advance();
                Ok(Expr::Literal {
                    value: LiteralValue::Null,
                    line: token.line,
                })
            }
            TokenKind::Str => {
                self.advance();
                let value = match token.literal {
                    Literal::Str(s) => s,
                    _ => String::new(),
                };
                Ok(Expr::Literal {
                    value: LiteralValue::Str(value),
                    line: token.line,
                })
            }
            TokenKind::InterpStr => {
                self.advance();
                let content = match token.literal {
                    Literal::Str(s) => s,
                    _ => String::new(),
                };
                Ok(self.split_interpolation(&content, token.line))
            }
            TokenKind::Ident => {
                self.advance();
                Ok(Expr::Identifier {
                    name: token.lexeme,
                    line: token.line,
                })
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.expression()?;
                self.consume(TokenKind::RightParen, "Expected ')' after expression")?;
                Ok(Expr::Grouping {
                    inner: Box::new(inner),
                })
            }
            TokenKind::LeftBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(TokenKind::RightBracket) {
                    loop {
                        elements.push(self.expression()?);
                        if !self.match_kind(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.consume(TokenKind::RightBracket, "Expected ']' after array elements")?;
                Ok(Expr::ArrayLiteral {
                    elements,
                    line: token.line,
                })
            }
            _ => Err(self.error_at(&token, "Expected expression")),
        }
    }

    /// Split an interpolated string's raw content into literal parts and
    /// identifier references. Placeholders do not nest; only a bare
    /// identifier is accepted inside the braces.
    fn split_interpolation(&mut self, content: &str, line: usize) -> Expr {
        let chars: Vec<char> = content.chars().collect();
        let mut parts = Vec::new();
        let mut exprs = Vec::new();
        let mut current = String::new();
        let mut i = 0;

        while i < chars.len() {
            if chars[i] == '{' {
                if let Some(rel) = chars[i + 1..].iter().position(|&c| c == '}') {
                    let close = i + 1 + rel;
                    let inner: String = chars[i + 1..close].iter().collect();
                    let inner = inner.trim();
                    if is_identifier(inner) {
                        parts.push(std::mem::take(&mut current));
                        exprs.push(Expr::Identifier {
                            name: inner.to_string(),
                            line,
                        });
                    } else {
                        self.reporter.parser_error(
                            line,
                            &format!("{{{}}}", inner),
                            "Only identifiers are allowed inside string interpolation",
                        );
                        // Keep the placeholder as literal text so the node
                        // invariant still holds
                        current.push('{');
                        current.push_str(inner);
                        current.push('}');
                    }
                    i = close + 1;
                    continue;
                }
                // No closing brace: literal '{'
                current.push('{');
                i += 1;
            } else {
                current.push(chars[i]);
                i += 1;
            }
        }
        parts.push(current);

        Expr::InterpolatedString { parts, exprs, line }
    }

    // ------------------------------------------------------------------
    // Cursor helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.pos - 1]
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.pos += 1;
        }
        self.previous()
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> PResult<Token> {
        if self.check(kind) {
            return Ok(self.advance().clone());
        }
        let token = self.peek().clone();
        Err(self.error_at(&token, message))
    }

    fn error_at(&mut self, token: &Token, message: &str) -> ParseInterrupt {
        self.reporter
            .parser_error(token.line, &token.lexeme, message);
        ParseInterrupt
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    /// Panic-mode recovery: discard tokens until the next
    /// statement-introducing keyword or end of stream.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if starts_statement(self.peek().kind) {
                return;
            }
            self.advance();
        }
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr, line: usize) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
        line,
    }
}

fn compound_op(kind: TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::PlusEq => BinaryOp::Add,
        TokenKind::MinusEq => BinaryOp::Sub,
        TokenKind::StarEq => BinaryOp::Mul,
        TokenKind::SlashEq => BinaryOp::Div,
        TokenKind::PercentEq => BinaryOp::Rem,
        _ => return None,
    };
    Some(op)
}

fn starts_statement(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Fr
            | TokenKind::Say
            | TokenKind::Lowkey
            | TokenKind::Goon
            | TokenKind::Edge
            | TokenKind::Vibe
            | TokenKind::Send
            | TokenKind::Mog
            | TokenKind::Skip
            | TokenKind::Simp
            | TokenKind::Yeet
    )
}

fn starts_expression(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Int
            | TokenKind::Float
            | TokenKind::Str
            | TokenKind::InterpStr
            | TokenKind::Ident
            | TokenKind::LeftParen
            | TokenKind::LeftBracket
            | TokenKind::Minus
            | TokenKind::Bang
            | TokenKind::Tilde
            | TokenKind::PlusPlus
            | TokenKind::MinusMinus
            | TokenKind::Ongod
            | TokenKind::Cap
            | TokenKind::Nah
    )
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> (Vec<Stmt>, Reporter) {
        let mut reporter = Reporter::new();
        let tokens = Lexer::new(source, &mut reporter).scan();
        let stmts = Parser::new(tokens, &mut reporter).parse();
        (stmts, reporter)
    }

    fn parse_expr(source: &str) -> Expr {
        let (stmts, reporter) = parse(source);
        assert!(!reporter.had_error(), "unexpected errors: {:?}", reporter);
        match stmts.into_iter().next() {
            Some(Stmt::Expression { expr }) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn var_decl_and_print() {
        let (stmts, reporter) = parse("fr x = 5\nsay x");
        assert!(!reporter.had_error());
        assert_eq!(stmts.len(), 2);
        assert!(matches!(&stmts[0], Stmt::VarDecl { name, .. } if name == "x"));
        assert!(matches!(&stmts[1], Stmt::Print { line: 2, .. }));
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = parse_expr("1 + 2 * 3");
        match expr {
            Expr::Binary {
                op: BinaryOp::Add,
                right,
                ..
            } => {
                assert!(matches!(
                    *right,
                    Expr::Binary {
                        op: BinaryOp::Mul,
                        ..
                    }
                ));
            }
            other => panic!("expected top-level add, got {:?}", other),
        }
    }

    #[test]
    fn comparison_binds_tighter_than_equality() {
        let expr = parse_expr("a == b < c");
        match expr {
            Expr::Binary {
                op: BinaryOp::Eq,
                right,
                ..
            } => {
                assert!(matches!(
                    *right,
                    Expr::Binary {
                        op: BinaryOp::Lt,
                        ..
                    }
                ));
            }
            other => panic!("expected top-level ==, got {:?}", other),
        }
    }

    #[test]
    fn bitwise_sits_between_logical_and_equality() {
        // a && b | c  parses as  a && (b | c)
        let expr = parse_expr("a && b | c");
        match expr {
            Expr::Logical {
                op: LogicalOp::And,
                right,
                ..
            } => {
                assert!(matches!(
                    *right,
                    Expr::Binary {
                        op: BinaryOp::BitOr,
                        ..
                    }
                ));
            }
            other => panic!("expected top-level &&, got {:?}", other),
        }
    }

    #[test]
    fn shift_binds_tighter_than_comparison() {
        let expr = parse_expr("a < b << c");
        match expr {
            Expr::Binary {
                op: BinaryOp::Lt,
                right,
                ..
            } => {
                assert!(matches!(
                    *right,
                    Expr::Binary {
                        op: BinaryOp::Shl,
                        ..
                    }
                ));
            }
            other => panic!("expected top-level <, got {:?}", other),
        }
    }

    #[test]
    fn assignment_is_right_associative() {
        let expr = parse_expr("a = b = 1");
        match expr {
            Expr::Assign { name, value, .. } => {
                assert_eq!(name, "a");
                assert!(matches!(*value, Expr::Assign { .. }));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn index_is_a_valid_assignment_target() {
        let expr = parse_expr("a[0] = 5");
        assert!(matches!(expr, Expr::IndexAssign { .. }));
    }

    #[test]
    fn invalid_assignment_target_is_reported_at_the_equals() {
        let (_, reporter) = parse("1 + 2 = 3");
        assert!(reporter.had_error());
        let diag = &reporter.diagnostics()[0];
        assert!(diag.message.contains("Invalid assignment target"));
        assert!(diag.message.contains("'='"));
    }

    #[test]
    fn compound_assign_requires_identifier_target() {
        let (_, reporter) = parse("a[0] += 1");
        assert!(reporter.had_error());
        assert!(reporter.diagnostics()[0]
            .message
            .contains("Invalid assignment target"));
    }

    #[test]
    fn midkey_chain_lowers_to_nested_ifs() {
        let (stmts, reporter) =
            parse("lowkey (a) { say 1 } midkey (b) { say 2 } highkey { say 3 }");
        assert!(!reporter.had_error());
        match &stmts[0] {
            Stmt::If { else_branch, .. } => match else_branch.as_deref() {
                Some(Stmt::If {
                    else_branch: inner_else,
                    ..
                }) => {
                    assert!(matches!(inner_else.as_deref(), Some(Stmt::Block { .. })));
                }
                other => panic!("expected nested if, got {:?}", other),
            },
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn for_clauses_may_all_be_empty() {
        let (stmts, reporter) = parse("edge (,,) { say 1 }");
        assert!(!reporter.had_error());
        match &stmts[0] {
            Stmt::For {
                init, cond, incr, ..
            } => {
                assert!(init.is_none());
                assert!(cond.is_none());
                assert!(incr.is_none());
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn for_with_decl_cond_incr() {
        let (stmts, reporter) = parse("edge (fr i = 1, i <= 5, i = i + 1) { say i }");
        assert!(!reporter.had_error());
        match &stmts[0] {
            Stmt::For {
                init, cond, incr, ..
            } => {
                assert!(matches!(init.as_deref(), Some(Stmt::VarDecl { .. })));
                assert!(cond.is_some());
                assert!(matches!(incr, Some(Expr::Assign { .. })));
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn bare_send_has_no_value() {
        let (stmts, reporter) = parse("vibe f() { send }");
        assert!(!reporter.had_error());
        match &stmts[0] {
            Stmt::FuncDef { body, .. } => {
                assert!(matches!(&body[0], Stmt::Return { value: None, .. }));
            }
            other => panic!("expected funcdef, got {:?}", other),
        }
    }

    #[test]
    fn switch_cases_and_default_in_any_order() {
        let (stmts, reporter) =
            parse("simp (x) { ghost: { say 0 } stan 1: { say 1 } stan 2: { say 2 } }");
        assert!(!reporter.had_error());
        match &stmts[0] {
            Stmt::Switch { cases, .. } => {
                assert_eq!(cases.len(), 3);
                assert!(cases[0].is_default);
                assert!(!cases[1].is_default);
                assert!(cases[1].value.is_some());
            }
            other => panic!("expected switch, got {:?}", other),
        }
    }

    #[test]
    fn try_catch_parses_two_blocks() {
        let (stmts, reporter) = parse("yeet { say 1 } caught { say 2 }");
        assert!(!reporter.had_error());
        assert!(matches!(&stmts[0], Stmt::TryCatch { .. }));
    }

    #[test]
    fn interpolation_splits_parts_and_identifiers() {
        let (stmts, reporter) = parse("say \"a {x} b {y} c\"");
        assert!(!reporter.had_error());
        match &stmts[0] {
            Stmt::Print {
                expr: Expr::InterpolatedString { parts, exprs, .. },
                ..
            } => {
                assert_eq!(parts, &["a ", " b ", " c"]);
                assert_eq!(exprs.len(), 2);
                assert_eq!(parts.len(), exprs.len() + 1);
            }
            other => panic!("expected interpolated print, got {:?}", other),
        }
    }

    #[test]
    fn interpolation_inner_text_is_trimmed() {
        let (stmts, _) = parse("say \"v={ name }\"");
        match &stmts[0] {
            Stmt::Print {
                expr: Expr::InterpolatedString { exprs, .. },
                ..
            } => {
                assert!(matches!(&exprs[0], Expr::Identifier { name, .. } if name == "name"));
            }
            other => panic!("expected interpolated print, got {:?}", other),
        }
    }

    #[test]
    fn non_identifier_interpolation_is_a_syntax_error() {
        let (_, reporter) = parse("say \"v={1 + 2}\"");
        assert!(reporter.had_error());
        assert!(reporter.diagnostics()[0]
            .message
            .contains("Only identifiers"));
    }

    #[test]
    fn missing_initializer_is_reported() {
        let (_, reporter) = parse("fr x =");
        assert!(reporter.had_error());
        assert!(reporter.diagnostics()[0].message.contains("at end"));
    }

    #[test]
    fn parser_recovers_and_reports_multiple_errors() {
        let (stmts, reporter) = parse("fr x 1\nsay 2\nfr y (\nsay 3");
        assert!(reporter.had_error());
        assert!(reporter.error_count() >= 2);
        // the good statements survive recovery
        let prints = stmts
            .iter()
            .filter(|s| matches!(s, Stmt::Print { .. }))
            .count();
        assert_eq!(prints, 2);
    }

    #[test]
    fn postfix_and_prefix_increment() {
        let expr = parse_expr("i++");
        assert!(matches!(
            expr,
            Expr::Increment {
                prefix: false,
                op: IncOp::Inc,
                ..
            }
        ));
        let expr = parse_expr("--j");
        assert!(matches!(
            expr,
            Expr::Increment {
                prefix: true,
                op: IncOp::Dec,
                ..
            }
        ));
    }

    #[test]
    fn call_and_index_chain() {
        let expr = parse_expr("f(1, 2)[0]");
        match expr {
            Expr::Index { object, .. } => {
                assert!(matches!(*object, Expr::Call { .. }));
            }
            other => panic!("expected index of call, got {:?}", other),
        }
    }

    #[test]
    fn empty_array_literal() {
        let expr = parse_expr("[]");
        assert!(matches!(expr, Expr::ArrayLiteral { ref elements, .. } if elements.is_empty()));
    }

    #[test]
    fn no_child_outranks_its_parent_in_precedence() {
        // walk the spine of a || b && c == d + e * f and check ordering
        let expr = parse_expr("a || b && c == d + e * f");
        match expr {
            Expr::Logical {
                op: LogicalOp::Or,
                right,
                ..
            } => match *right {
                Expr::Logical {
                    op: LogicalOp::And,
                    right,
                    ..
                } => match *right {
                    Expr::Binary {
                        op: BinaryOp::Eq,
                        right,
                        ..
                    } => match *right {
                        Expr::Binary {
                            op: BinaryOp::Add,
                            right,
                            ..
                        } => {
                            assert!(matches!(
                                *right,
                                Expr::Binary {
                                    op: BinaryOp::Mul,
                                    ..
                                }
                            ));
                        }
                        other => panic!("expected +, got {:?}", other),
                    },
                    other => panic!("expected ==, got {:?}", other),
                },
                other => panic!("expected &&, got {:?}", other),
            },
            other => panic!("expected ||, got {:?}", other),
        }
    }
}
