//! Error-tolerant recursive-descent parser.
//!
//! Items and statements are parsed by recursive descent, binary operators
//! by precedence climbing. A syntax error never aborts the parse: the
//! parser records a diagnostic, leaves an `Error` node where the broken
//! construct was, and resynchronizes at the next statement or item
//! boundary. A [`Program`] is always produced.

use std::collections::HashMap;

use crate::ast::{
    BinaryOp, Block, Expr, ExprKind, ExternDecl, FieldDecl, FieldInit, FnDecl, GlobalDecl, Ident,
    Item, Param, Program, Stmt, StructDecl, TypeExpr, UnaryOp,
};
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::lexer::{Token, TokenKind, lex};
use crate::span::{FileId, Span};

#[derive(Debug)]
pub struct ParseResult {
    pub program: Program,
    /// Lex and parse diagnostics, in source order per phase.
    pub diagnostics: Vec<Diagnostic>,
}

/// Lex and parse one source text.
#[tracing::instrument(level = "debug", skip(source), fields(len = source.len()))]
pub fn parse(file_id: FileId, source: &str) -> ParseResult {
    let lexed = lex(file_id, source);
    let mut result = parse_tokens(file_id, lexed.tokens, source.len() as u32);
    let mut diagnostics = lexed.diagnostics;
    diagnostics.append(&mut result.diagnostics);
    result.diagnostics = diagnostics;
    tracing::debug!(
        items = result.program.items.len(),
        diagnostics = result.diagnostics.len(),
        "parsed"
    );
    result
}

/// Parse an already lexed token stream ending in `Eof`.
pub fn parse_tokens(file_id: FileId, tokens: Vec<Token<'_>>, source_len: u32) -> ParseResult {
    let mut parser = Parser::new(file_id, tokens, source_len);
    let program = parser.parse_program();
    ParseResult {
        program,
        diagnostics: parser.diagnostics,
    }
}

/// Deepest expression nesting accepted before E0101. Later phases walk
/// expressions recursively, so this also bounds their stack use.
pub const MAX_NESTING: u32 = 128;

struct Parser<'src> {
    file_id: FileId,
    tokens: Vec<Token<'src>>,
    /// Doc comment text keyed by the index of the token it precedes.
    docs: HashMap<usize, String>,
    pos: usize,
    source_len: u32,
    diagnostics: Vec<Diagnostic>,
    /// Set whenever an error node is produced; reset per item.
    recovered: bool,
    /// Struct literals are not allowed in `if`/`while` conditions.
    no_struct_literal: bool,
    /// Current expression nesting, bounded by [`MAX_NESTING`].
    depth: u32,
}

impl<'src> Parser<'src> {
    fn new(file_id: FileId, raw: Vec<Token<'src>>, source_len: u32) -> Self {
        let mut tokens = Vec::with_capacity(raw.len());
        let mut docs: HashMap<usize, String> = HashMap::new();
        let mut pending: Vec<&str> = Vec::new();
        for token in raw {
            if token.kind == TokenKind::DocComment {
                pending.push(token.text.strip_prefix(' ').unwrap_or(token.text));
                continue;
            }
            if !pending.is_empty() {
                docs.insert(tokens.len(), pending.join("\n"));
                pending.clear();
            }
            tokens.push(token);
        }
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: "",
                span: Span::new(file_id, source_len, source_len),
            });
        }
        Parser {
            file_id,
            tokens,
            docs,
            pos: 0,
            source_len,
            diagnostics: Vec::new(),
            recovered: false,
            no_struct_literal: false,
            depth: 0,
        }
    }

    // -----------------------------------------------------------------
    // Token helpers
    // -----------------------------------------------------------------

    fn current(&self) -> &Token<'src> {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_at(&self, offset: usize) -> TokenKind {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        self.tokens[index].kind
    }

    fn bump(&mut self) -> Token<'src> {
        let token = *self.current();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek() == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    /// End of the previously consumed token.
    fn prev_end(&self) -> u32 {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    fn span_from(&self, start: u32) -> Span {
        Span::new(self.file_id, start, self.prev_end().max(start))
    }

    fn expect(&mut self, kind: TokenKind) -> Option<Token<'src>> {
        if self.peek() == kind {
            return Some(self.bump());
        }
        self.error_here(format!(
            "expected {}, found {}",
            kind.describe(),
            self.peek().describe()
        ));
        None
    }

    fn expect_ident(&mut self) -> Option<Ident> {
        let token = self.expect(TokenKind::Ident)?;
        Some(Ident {
            name: token.text.to_string(),
            span: token.span,
        })
    }

    fn error_at(&mut self, message: String, span: Span) {
        self.recovered = true;
        // Error tokens were already reported by the lexer.
        if matches!(self.tokens.get(self.pos).map(|t| t.kind), Some(TokenKind::Error(_)))
            && self.current().span == span
        {
            return;
        }
        self.diagnostics.push(
            Diagnostic::error(DiagnosticKind::ParseError, message, span).with_code("E0100"),
        );
    }

    fn error_here(&mut self, message: String) {
        let span = self.current().span;
        self.error_at(message, span);
    }

    // -----------------------------------------------------------------
    // Recovery
    // -----------------------------------------------------------------

    /// Reports E0101 and skips the rest of the current expression once the
    /// nesting limit is reached.
    fn too_deep(&mut self) -> Option<Expr> {
        if self.depth < MAX_NESTING {
            return None;
        }
        let start = self.current().span;
        self.recovered = true;
        self.diagnostics.push(
            Diagnostic::error(DiagnosticKind::ParseError, "expression nested too deeply", start)
                .with_code("E0101"),
        );
        self.skip_expr();
        Some(Expr::error(self.span_from(start.start)))
    }

    /// Runs `parse` one nesting level deeper.
    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> Expr) -> Expr {
        if let Some(error) = self.too_deep() {
            return error;
        }
        self.depth += 1;
        let expr = parse(self);
        self.depth -= 1;
        expr
    }

    /// Skip to the `)`, `}`, `,` or `;` that closes the current expression.
    fn skip_expr(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                TokenKind::Eof => return,
                TokenKind::RParen | TokenKind::RBrace | TokenKind::Comma | TokenKind::Semi
                    if depth == 0 =>
                {
                    return;
                }
                TokenKind::LParen | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBrace => depth -= 1,
                _ => {}
            }
            self.bump();
        }
    }

    fn at_item_start(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Fn | TokenKind::Extern | TokenKind::Struct
        )
    }

    /// Skip to the next item keyword outside any braces.
    fn sync_item(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                TokenKind::Eof => return,
                TokenKind::Fn | TokenKind::Extern | TokenKind::Struct | TokenKind::Let
                    if depth == 0 =>
                {
                    return;
                }
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.bump();
        }
    }

    /// Skip past the next `;`, or up to a `}` / statement keyword, outside
    /// nested braces.
    fn sync_stmt(&mut self) {
        let mut depth = 0usize;
        let mut first = true;
        loop {
            match self.peek() {
                TokenKind::Eof => return,
                TokenKind::RBrace if depth == 0 => return,
                TokenKind::Semi if depth == 0 => {
                    self.bump();
                    return;
                }
                TokenKind::Let
                | TokenKind::While
                | TokenKind::Return
                | TokenKind::Fn
                | TokenKind::Extern
                | TokenKind::Struct
                    if depth == 0 && !first =>
                {
                    return;
                }
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => depth -= 1,
                _ => {}
            }
            self.bump();
            first = false;
        }
    }

    // -----------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------

    fn parse_program(&mut self) -> Program {
        let mut items = Vec::new();
        while self.peek() != TokenKind::Eof {
            let before = self.pos;
            items.push(self.parse_item());
            if self.pos == before {
                self.bump();
            }
        }
        Program {
            items,
            span: Span::new(self.file_id, 0, self.source_len),
        }
    }

    fn parse_item(&mut self) -> Item {
        self.recovered = false;
        let docs = self.docs.remove(&self.pos);
        let start = self.current().span.start;
        let item = match self.peek() {
            TokenKind::Fn => self.parse_fn(docs).map(Item::Function),
            TokenKind::Extern => self.parse_extern(docs).map(Item::Extern),
            TokenKind::Struct => self.parse_struct(docs).map(Item::Struct),
            TokenKind::Let => self.parse_global(docs).map(Item::Global),
            other => {
                self.error_here(format!("expected item, found {}", other.describe()));
                self.bump();
                None
            }
        };
        item.unwrap_or_else(|| {
            self.sync_item();
            Item::Error(self.span_from(start))
        })
    }

    fn parse_fn(&mut self, docs: Option<String>) -> Option<FnDecl> {
        let start = self.bump().span.start;
        let name = self.expect_ident()?;
        let params = self.parse_params()?;
        let result = self.parse_result_type();
        if self.peek() != TokenKind::LBrace {
            self.error_here(format!(
                "expected function body, found {}",
                self.peek().describe()
            ));
            return None;
        }
        let body = self.parse_block();
        Some(FnDecl {
            name,
            params,
            result,
            body,
            docs,
            recovered: self.recovered,
            span: self.span_from(start),
        })
    }

    fn parse_extern(&mut self, docs: Option<String>) -> Option<ExternDecl> {
        let start = self.bump().span.start;
        self.expect(TokenKind::Fn)?;
        let name = self.expect_ident()?;
        let params = self.parse_params()?;
        let result = self.parse_result_type();
        self.expect(TokenKind::Semi)?;
        Some(ExternDecl {
            name,
            params,
            result,
            docs,
            span: self.span_from(start),
        })
    }

    fn parse_params(&mut self) -> Option<Vec<Param>> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !matches!(self.peek(), TokenKind::RParen | TokenKind::Eof) {
            let start = self.current().span.start;
            let Some(name) = self.expect_ident() else {
                // Skip the broken parameter list but keep the header.
                while !matches!(
                    self.peek(),
                    TokenKind::RParen | TokenKind::LBrace | TokenKind::Eof
                ) {
                    self.bump();
                }
                break;
            };
            let ty = if self.expect(TokenKind::Colon).is_some() {
                self.parse_type()
            } else {
                TypeExpr::Error(name.span)
            };
            params.push(Param {
                name,
                ty,
                span: self.span_from(start),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Some(params)
    }

    fn parse_result_type(&mut self) -> Option<TypeExpr> {
        if self.eat(TokenKind::Arrow) {
            Some(self.parse_type())
        } else {
            None
        }
    }

    fn parse_type(&mut self) -> TypeExpr {
        if self.peek() == TokenKind::Ident {
            let token = self.bump();
            return TypeExpr::Named(Ident {
                name: token.text.to_string(),
                span: token.span,
            });
        }
        let span = self.current().span;
        self.error_here(format!("expected type, found {}", self.peek().describe()));
        TypeExpr::Error(span)
    }

    fn parse_struct(&mut self, docs: Option<String>) -> Option<StructDecl> {
        let start = self.bump().span.start;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while !matches!(self.peek(), TokenKind::RBrace | TokenKind::Eof) {
            if self.at_item_start() {
                break;
            }
            let field_docs = self.docs.remove(&self.pos);
            let field_start = self.current().span.start;
            let Some(field_name) = self.expect_ident() else {
                self.bump();
                continue;
            };
            let ty = if self.expect(TokenKind::Colon).is_some() {
                self.parse_type()
            } else {
                TypeExpr::Error(field_name.span)
            };
            fields.push(FieldDecl {
                name: field_name,
                ty,
                docs: field_docs,
                span: self.span_from(field_start),
            });
            if !self.eat(TokenKind::Comma) && self.peek() != TokenKind::RBrace {
                self.error_here(format!("expected `,` or `}}`, found {}", self.peek().describe()));
            }
        }
        self.expect(TokenKind::RBrace);
        Some(StructDecl {
            name,
            fields,
            docs,
            span: self.span_from(start),
        })
    }

    fn parse_global(&mut self, docs: Option<String>) -> Option<GlobalDecl> {
        let start = self.bump().span.start;
        let mutable = self.eat(TokenKind::Mut);
        let name = self.expect_ident()?;
        let ty = if self.eat(TokenKind::Colon) {
            Some(self.parse_type())
        } else {
            None
        };
        let init = if self.expect(TokenKind::Equal).is_some() {
            self.parse_expr()
        } else {
            Expr::error(self.current().span)
        };
        if self.expect(TokenKind::Semi).is_none() {
            self.sync_stmt();
        }
        Some(GlobalDecl {
            name,
            mutable,
            ty,
            init,
            docs,
            span: self.span_from(start),
        })
    }

    // -----------------------------------------------------------------
    // Blocks and statements
    // -----------------------------------------------------------------

    fn parse_block(&mut self) -> Block {
        let start = self.current().span.start;
        let saved = std::mem::replace(&mut self.no_struct_literal, false);
        let block = self.parse_block_inner(start);
        self.no_struct_literal = saved;
        block
    }

    fn parse_block_inner(&mut self, start: u32) -> Block {
        let mut stmts = Vec::new();
        let mut tail = None;
        if self.expect(TokenKind::LBrace).is_none() {
            return Block {
                stmts,
                tail,
                span: self.span_from(start),
            };
        }

        loop {
            match self.peek() {
                TokenKind::RBrace => {
                    self.bump();
                    break;
                }
                TokenKind::Eof => {
                    self.error_here("expected `}`, found end of input".to_string());
                    break;
                }
                _ if self.at_item_start() => {
                    self.error_here(format!("expected `}}`, found {}", self.peek().describe()));
                    break;
                }
                TokenKind::Semi => {
                    self.bump();
                    continue;
                }
                _ => {}
            }

            // A tail expression followed by more statements is demoted.
            if let Some(expr) = tail.take() {
                stmts.push(Stmt::Expr(*expr));
            }

            let before = self.pos;
            if self.peek() == TokenKind::Let {
                stmts.push(self.parse_let());
            } else {
                let expr = self.parse_expr();
                if matches!(expr.kind, ExprKind::Error) {
                    self.sync_stmt();
                    stmts.push(Stmt::Expr(expr));
                } else if self.eat(TokenKind::Equal) {
                    let value = self.parse_expr();
                    let span = expr.span.to(value.span);
                    if self.expect(TokenKind::Semi).is_none() {
                        self.sync_stmt();
                    }
                    stmts.push(Stmt::Assign {
                        target: expr,
                        value,
                        span,
                    });
                } else if self.eat(TokenKind::Semi) {
                    stmts.push(Stmt::Expr(expr));
                } else if self.peek() == TokenKind::RBrace {
                    tail = Some(Box::new(expr));
                } else if expr.is_block_like() {
                    stmts.push(Stmt::Expr(expr));
                } else {
                    self.error_here(format!(
                        "expected `;` or `}}` after expression, found {}",
                        self.peek().describe()
                    ));
                    stmts.push(Stmt::Expr(expr));
                    self.sync_stmt();
                }
            }
            if self.pos == before {
                self.bump();
            }
        }

        Block {
            stmts,
            tail,
            span: self.span_from(start),
        }
    }

    fn parse_let(&mut self) -> Stmt {
        let start = self.bump().span.start;
        let mutable = self.eat(TokenKind::Mut);
        let Some(name) = self.expect_ident() else {
            self.sync_stmt();
            let span = self.span_from(start);
            return Stmt::Expr(Expr::error(span));
        };
        let ty = if self.eat(TokenKind::Colon) {
            Some(self.parse_type())
        } else {
            None
        };
        let init = if self.expect(TokenKind::Equal).is_some() {
            self.parse_expr()
        } else {
            Expr::error(self.current().span)
        };
        if self.expect(TokenKind::Semi).is_none() {
            self.sync_stmt();
        }
        Stmt::Let {
            name,
            mutable,
            ty,
            init,
            span: self.span_from(start),
        }
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    fn parse_expr(&mut self) -> Expr {
        self.parse_binary(0)
    }

    /// Expression in `if`/`while` condition position.
    fn parse_condition(&mut self) -> Expr {
        let saved = std::mem::replace(&mut self.no_struct_literal, true);
        let expr = self.parse_expr();
        self.no_struct_literal = saved;
        expr
    }

    fn parse_binary(&mut self, min_prec: u8) -> Expr {
        let base = self.depth;
        let mut lhs = self.parse_unary();
        while let Some((op, prec)) = binary_op(self.peek()) {
            if prec < min_prec {
                break;
            }
            // Each operator adds a level to the left-leaning tree.
            if let Some(error) = self.too_deep() {
                lhs = Expr::error(lhs.span.to(error.span));
                break;
            }
            self.depth += 1;
            self.bump();
            let rhs = self.parse_binary(prec + 1);
            let span = lhs.span.to(rhs.span);
            lhs = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            };
        }
        self.depth = base;
        lhs
    }

    fn parse_unary(&mut self) -> Expr {
        self.nested(Self::parse_unary_inner)
    }

    fn parse_unary_inner(&mut self) -> Expr {
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        let start = self.bump().span;
        let operand = self.parse_unary();
        let span = start.to(operand.span);
        Expr {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        }
    }

    fn parse_postfix(&mut self) -> Expr {
        let outer = self.depth;
        let mut expr = self.parse_primary();
        while self.peek() == TokenKind::Dot {
            if let Some(error) = self.too_deep() {
                expr = Expr::error(expr.span.to(error.span));
                break;
            }
            self.depth += 1;
            self.bump();
            let Some(field) = self.expect_ident() else {
                self.depth = outer;
                return Expr::error(expr.span.to(self.current().span));
            };
            let span = expr.span.to(field.span);
            expr = Expr {
                kind: ExprKind::Field {
                    base: Box::new(expr),
                    field,
                },
                span,
            };
        }
        self.depth = outer;
        expr
    }

    fn parse_primary(&mut self) -> Expr {
        let token = *self.current();
        let simple = |kind| Expr {
            kind,
            span: token.span,
        };
        match token.kind {
            TokenKind::IntLiteral => {
                self.bump();
                simple(ExprKind::Int(token.text.replace('_', "")))
            }
            TokenKind::FloatLiteral => {
                self.bump();
                simple(ExprKind::Float(token.text.replace('_', "")))
            }
            TokenKind::StringLiteral => {
                self.bump();
                simple(ExprKind::Str(crate::lexer::unescape(token.text)))
            }
            TokenKind::True | TokenKind::False => {
                self.bump();
                simple(ExprKind::Bool(token.kind == TokenKind::True))
            }
            TokenKind::Ident => self.parse_ident_expr(),
            TokenKind::LParen => {
                self.bump();
                let saved = std::mem::replace(&mut self.no_struct_literal, false);
                let inner = self.parse_expr();
                self.no_struct_literal = saved;
                if self.expect(TokenKind::RParen).is_none() {
                    return Expr::error(token.span.to(inner.span));
                }
                Expr {
                    kind: inner.kind,
                    span: self.span_from(token.span.start),
                }
            }
            TokenKind::LBrace => {
                let block = self.parse_block();
                Expr {
                    span: block.span,
                    kind: ExprKind::Block(block),
                }
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => {
                self.bump();
                let cond = self.parse_condition();
                let body = self.parse_block();
                Expr {
                    kind: ExprKind::While {
                        cond: Box::new(cond),
                        body,
                    },
                    span: self.span_from(token.span.start),
                }
            }
            TokenKind::Return => {
                self.bump();
                let value = if matches!(
                    self.peek(),
                    TokenKind::Semi | TokenKind::RBrace | TokenKind::Eof
                ) {
                    None
                } else {
                    Some(Box::new(self.parse_expr()))
                };
                Expr {
                    kind: ExprKind::Return(value),
                    span: self.span_from(token.span.start),
                }
            }
            TokenKind::Break => {
                self.bump();
                simple(ExprKind::Break)
            }
            TokenKind::Continue => {
                self.bump();
                simple(ExprKind::Continue)
            }
            TokenKind::Error(_) => {
                // Already reported by the lexer.
                self.recovered = true;
                self.bump();
                Expr::error(token.span)
            }
            other => {
                self.error_here(format!("expected expression, found {}", other.describe()));
                if !matches!(
                    other,
                    TokenKind::RBrace | TokenKind::Semi | TokenKind::Eof
                ) && !self.at_item_start()
                {
                    self.bump();
                }
                Expr::error(token.span)
            }
        }
    }

    fn parse_ident_expr(&mut self) -> Expr {
        let token = self.bump();
        let ident = Ident {
            name: token.text.to_string(),
            span: token.span,
        };

        if self.peek() == TokenKind::LParen {
            self.bump();
            let mut args = Vec::new();
            while !matches!(self.peek(), TokenKind::RParen | TokenKind::Eof) {
                let saved = std::mem::replace(&mut self.no_struct_literal, false);
                args.push(self.parse_expr());
                self.no_struct_literal = saved;
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            if self.expect(TokenKind::RParen).is_none() {
                return Expr::error(self.span_from(token.span.start));
            }
            return Expr {
                kind: ExprKind::Call {
                    callee: ident,
                    args,
                },
                span: self.span_from(token.span.start),
            };
        }

        if self.looks_like_struct_literal() {
            return self.parse_struct_literal(ident);
        }

        Expr {
            span: ident.span,
            kind: ExprKind::Ident(ident),
        }
    }

    /// `Name {` followed by `}` or `field:`.
    fn looks_like_struct_literal(&self) -> bool {
        !self.no_struct_literal
            && self.peek() == TokenKind::LBrace
            && (self.peek_at(1) == TokenKind::RBrace
                || (self.peek_at(1) == TokenKind::Ident && self.peek_at(2) == TokenKind::Colon))
    }

    fn parse_struct_literal(&mut self, name: Ident) -> Expr {
        let start = name.span.start;
        self.bump();
        let mut fields = Vec::new();
        while !matches!(self.peek(), TokenKind::RBrace | TokenKind::Eof) {
            let Some(field) = self.expect_ident() else {
                self.sync_stmt();
                return Expr::error(self.span_from(start));
            };
            let value = if self.expect(TokenKind::Colon).is_some() {
                self.parse_expr()
            } else {
                Expr::error(field.span)
            };
            fields.push(FieldInit { name: field, value });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        if self.expect(TokenKind::RBrace).is_none() {
            return Expr::error(self.span_from(start));
        }
        Expr {
            kind: ExprKind::StructLit { name, fields },
            span: self.span_from(start),
        }
    }

    fn parse_if(&mut self) -> Expr {
        let start = self.bump().span.start;
        let cond = self.parse_condition();
        let then_branch = self.parse_block();
        let else_branch = if self.eat(TokenKind::Else) {
            if self.peek() == TokenKind::If {
                Some(Box::new(self.nested(Self::parse_if)))
            } else {
                let block = self.parse_block();
                Some(Box::new(Expr {
                    span: block.span,
                    kind: ExprKind::Block(block),
                }))
            }
        } else {
            None
        };
        Expr {
            kind: ExprKind::If {
                cond: Box::new(cond),
                then_branch,
                else_branch,
            },
            span: self.span_from(start),
        }
    }
}

/// Binary operator and its precedence (higher binds tighter).
fn binary_op(kind: TokenKind) -> Option<(BinaryOp, u8)> {
    let op = match kind {
        TokenKind::OrOr => (BinaryOp::Or, 1),
        TokenKind::AndAnd => (BinaryOp::And, 2),
        TokenKind::EqEq => (BinaryOp::Eq, 3),
        TokenKind::NotEq => (BinaryOp::Ne, 3),
        TokenKind::Less => (BinaryOp::Lt, 3),
        TokenKind::LessEq => (BinaryOp::Le, 3),
        TokenKind::Greater => (BinaryOp::Gt, 3),
        TokenKind::GreaterEq => (BinaryOp::Ge, 3),
        TokenKind::Plus => (BinaryOp::Add, 4),
        TokenKind::Minus => (BinaryOp::Sub, 4),
        TokenKind::Star => (BinaryOp::Mul, 5),
        TokenKind::Slash => (BinaryOp::Div, 5),
        TokenKind::Percent => (BinaryOp::Rem, 5),
        _ => return None,
    };
    Some(op)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_user(source: &str) -> ParseResult {
        parse(FileId::USER, source)
    }

    fn only_fn(result: &ParseResult) -> &FnDecl {
        match &result.program.items[0] {
            Item::Function(f) => f,
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn parses_function_with_params_and_tail() {
        let result = parse_user("fn add(a: i32, b: i32) -> i32 { a + b }");
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let f = only_fn(&result);
        assert_eq!(f.name.name, "add");
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.params[1].span, Span::new(FileId::USER, 15, 21));
        assert!(f.body.stmts.is_empty());
        assert!(matches!(
            f.body.tail.as_deref(),
            Some(Expr {
                kind: ExprKind::Binary { op: BinaryOp::Add, .. },
                ..
            })
        ));
        assert!(!f.recovered);
    }

    #[test]
    fn respects_operator_precedence() {
        let result = parse_user("fn f() -> bool { 1 + 2 * 3 < 7 && true }");
        let tail = only_fn(&result).body.tail.as_deref().expect("tail");
        let ExprKind::Binary { op: BinaryOp::And, lhs, .. } = &tail.kind else {
            panic!("expected && at the root, got {tail:?}");
        };
        let ExprKind::Binary { op: BinaryOp::Lt, lhs: sum, .. } = &lhs.kind else {
            panic!("expected < under &&");
        };
        let ExprKind::Binary { op: BinaryOp::Add, rhs, .. } = &sum.kind else {
            panic!("expected + under <");
        };
        assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn parses_items_of_every_kind() {
        let source = "/// Prints.\nextern fn print(v: i32);\nstruct P { x: i32, y: f64 }\nlet mut G: i32 = 4;\nfn main() {}";
        let result = parse_user(source);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let items = &result.program.items;
        assert_eq!(items.len(), 4);
        let Item::Extern(ext) = &items[0] else { panic!() };
        assert_eq!(ext.docs.as_deref(), Some("Prints."));
        let Item::Struct(s) = &items[1] else { panic!() };
        assert_eq!(s.fields.len(), 2);
        let Item::Global(g) = &items[2] else { panic!() };
        assert!(g.mutable);
    }

    #[test]
    fn struct_literal_is_not_taken_in_conditions() {
        let result = parse_user("fn f(x: bool) { if x { } while x { } let p = P { a: 1 }; }");
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let body = &only_fn(&result).body;
        assert_eq!(body.stmts.len(), 3);
        let Stmt::Let { init, .. } = &body.stmts[2] else { panic!() };
        assert!(matches!(init.kind, ExprKind::StructLit { .. }));
    }

    #[test]
    fn parses_assignment_to_field_paths() {
        let result = parse_user("fn f() { p.x = 1; y = p.x + 2; }");
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let body = &only_fn(&result).body;
        assert!(matches!(&body.stmts[0], Stmt::Assign { target, .. } if matches!(target.kind, ExprKind::Field { .. })));
        assert!(matches!(&body.stmts[1], Stmt::Assign { .. }));
    }

    #[test]
    fn recovers_at_statement_boundary() {
        let result = parse_user("fn f() -> i32 { let x = ; let y = 2; y }\nfn g() {}");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::ParseError);
        assert!(!result.diagnostics[0].is_fatal());
        assert_eq!(result.program.items.len(), 2);
        let f = only_fn(&result);
        assert!(f.recovered);
        assert_eq!(f.body.stmts.len(), 2);
        assert!(f.body.tail.is_some());
        let Item::Function(g) = &result.program.items[1] else { panic!() };
        assert!(!g.recovered);
    }

    #[test]
    fn unclosed_block_stops_at_next_item() {
        let result = parse_user("fn f() { let x = 1;\nfn g() -> i32 { 2 }");
        assert_eq!(result.program.items.len(), 2);
        assert!(only_fn(&result).recovered);
        let Item::Function(g) = &result.program.items[1] else { panic!() };
        assert_eq!(g.name.name, "g");
    }

    #[test]
    fn garbage_at_top_level_becomes_error_item() {
        let result = parse_user("42 + ; fn ok() {}");
        assert!(matches!(result.program.items[0], Item::Error(_)));
        assert!(matches!(result.program.items[1], Item::Function(_)));
    }

    #[test]
    fn lex_errors_mark_function_recovered_without_extra_diagnostics() {
        let result = parse_user("fn f() -> i32 { 1 # 2 }");
        assert!(only_fn(&result).recovered);
        assert_eq!(
            result
                .diagnostics
                .iter()
                .filter(|d| d.kind == DiagnosticKind::LexError)
                .count(),
            1
        );
    }

    #[test]
    fn else_if_chains_nest() {
        let result = parse_user("fn f(a: i32) -> i32 { if a < 0 { 0 } else if a < 10 { 1 } else { 2 } }");
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let tail = only_fn(&result).body.tail.as_deref().expect("tail");
        let ExprKind::If { else_branch: Some(else_branch), .. } = &tail.kind else { panic!() };
        assert!(matches!(else_branch.kind, ExprKind::If { .. }));
    }

    fn parenthesized(depth: usize) -> String {
        format!("fn f() -> i32 {{ {}1{} }}\nfn g() {{}}", "(".repeat(depth), ")".repeat(depth))
    }

    #[test]
    fn deep_nesting_is_reported_once() {
        let result = parse_user(&parenthesized(1000));
        let codes: Vec<_> = result.diagnostics.iter().filter_map(|d| d.code).collect();
        assert_eq!(codes, vec!["E0101"]);
        assert!(!result.diagnostics[0].is_fatal());
        assert!(only_fn(&result).recovered);
        let Item::Function(g) = &result.program.items[1] else { panic!() };
        assert_eq!(g.name.name, "g");
    }

    #[test]
    fn long_operator_chains_are_bounded() {
        let chain = vec!["1"; 1000].join(" + ");
        let result = parse_user(&format!("fn f() -> i32 {{ {chain} }}"));
        assert!(result.diagnostics.iter().any(|d| d.code == Some("E0101")));
        assert!(only_fn(&result).recovered);
    }

    #[test]
    fn nesting_below_the_limit_is_accepted() {
        let result = parse_user(&parenthesized(MAX_NESTING as usize / 2));
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        assert!(!only_fn(&result).recovered);
    }
}
