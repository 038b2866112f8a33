//! Lexer for Kite.
//!
//! [`Lexer`] is a lazy, cloneable iterator over [`Token`]s; cloning it
//! restarts scanning from the clone point. Bad input never stops the scan:
//! it becomes a [`TokenKind::Error`] token and scanning resumes after it.
//! [`lex`] drains the iterator and turns error tokens into diagnostics.

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::span::{FileId, Span};

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Special
    Eof,
    Error(LexError),
    /// `/// text`; the token text excludes the slashes.
    DocComment,

    // Identifiers and literals
    Ident,
    IntLiteral,
    FloatLiteral,
    /// The token text excludes the quotes; escapes are still raw.
    StringLiteral,

    // Punctuation
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    Comma,     // ,
    Semi,      // ;
    Colon,     // :
    Dot,       // .
    Equal,     // =
    Arrow,     // ->

    // Operators
    Plus,      // +
    Minus,     // -
    Star,      // *
    Slash,     // /
    Percent,   // %
    Bang,      // !
    EqEq,      // ==
    NotEq,     // !=
    Less,      // <
    LessEq,    // <=
    Greater,   // >
    GreaterEq, // >=
    AndAnd,    // &&
    OrOr,      // ||

    // Keywords
    Fn,
    Extern,
    Struct,
    Let,
    Mut,
    If,
    Else,
    While,
    Return,
    Break,
    Continue,
    True,
    False,
}

impl TokenKind {
    /// Human-readable description used in parse diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Eof => "end of input",
            TokenKind::Error(_) => "invalid token",
            TokenKind::DocComment => "doc comment",
            TokenKind::Ident => "identifier",
            TokenKind::IntLiteral => "integer literal",
            TokenKind::FloatLiteral => "float literal",
            TokenKind::StringLiteral => "string literal",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::Comma => "`,`",
            TokenKind::Semi => "`;`",
            TokenKind::Colon => "`:`",
            TokenKind::Dot => "`.`",
            TokenKind::Equal => "`=`",
            TokenKind::Arrow => "`->`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Percent => "`%`",
            TokenKind::Bang => "`!`",
            TokenKind::EqEq => "`==`",
            TokenKind::NotEq => "`!=`",
            TokenKind::Less => "`<`",
            TokenKind::LessEq => "`<=`",
            TokenKind::Greater => "`>`",
            TokenKind::GreaterEq => "`>=`",
            TokenKind::AndAnd => "`&&`",
            TokenKind::OrOr => "`||`",
            TokenKind::Fn => "`fn`",
            TokenKind::Extern => "`extern`",
            TokenKind::Struct => "`struct`",
            TokenKind::Let => "`let`",
            TokenKind::Mut => "`mut`",
            TokenKind::If => "`if`",
            TokenKind::Else => "`else`",
            TokenKind::While => "`while`",
            TokenKind::Return => "`return`",
            TokenKind::Break => "`break`",
            TokenKind::Continue => "`continue`",
            TokenKind::True => "`true`",
            TokenKind::False => "`false`",
        }
    }
}

/// What was wrong with an error token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexError {
    UnexpectedChar,
    UnterminatedString,
    InvalidEscape,
    MalformedNumber,
}

impl LexError {
    fn code(self) -> &'static str {
        match self {
            LexError::UnexpectedChar => "E0001",
            LexError::UnterminatedString | LexError::InvalidEscape => "E0002",
            LexError::MalformedNumber => "E0003",
        }
    }

    fn message(self) -> &'static str {
        match self {
            LexError::UnexpectedChar => "unexpected character",
            LexError::UnterminatedString => "unterminated string literal",
            LexError::InvalidEscape => "invalid escape sequence in string literal",
            LexError::MalformedNumber => "malformed number literal",
        }
    }
}

/// A single token: kind, the source text it covers, and its span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    pub span: Span,
}

/// Result of lexing a source file.
#[derive(Debug)]
pub struct LexResult<'src> {
    pub tokens: Vec<Token<'src>>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Lex a whole source string. The last token is always [`TokenKind::Eof`].
pub fn lex(file_id: FileId, source: &str) -> LexResult<'_> {
    let mut diagnostics = Vec::new();
    let tokens = Lexer::new(file_id, source)
        .inspect(|token| {
            if let Some(diag) = token_diagnostic(token) {
                diagnostics.push(diag);
            }
        })
        .collect();
    LexResult {
        tokens,
        diagnostics,
    }
}

/// The diagnostic an error token stands for, if it is one.
pub fn token_diagnostic(token: &Token<'_>) -> Option<Diagnostic> {
    match token.kind {
        TokenKind::Error(err) => Some(
            Diagnostic::error(DiagnosticKind::LexError, err.message(), token.span)
                .with_code(err.code()),
        ),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct Lexer<'src> {
    file_id: FileId,
    source: &'src str,
    bytes: &'src [u8],
    index: usize,
    finished: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(file_id: FileId, source: &'src str) -> Self {
        Lexer {
            file_id,
            source,
            bytes: source.as_bytes(),
            index: 0,
            finished: false,
        }
    }

    fn scan(&mut self) -> Token<'src> {
        self.skip_trivia();

        let start = self.index;
        let Some(ch) = self.peek_char() else {
            return self.token(TokenKind::Eof, start);
        };

        match ch {
            b'/' if self.peek_next() == Some(b'/') => self.lex_doc_comment(start),
            b'"' => self.lex_string(start),
            b'0'..=b'9' => self.lex_number(start),
            ch if is_ident_start(ch) => self.lex_ident_or_keyword(start),
            _ => self.lex_punct(start, ch),
        }
    }

    /// Skips whitespace and `//` comments, stopping in front of `///`.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(ch) if is_whitespace(ch) => self.consume_char(),
                Some(b'/') if self.peek_next() == Some(b'/') && !self.at_doc_comment() => {
                    self.skip_line();
                }
                _ => return,
            }
        }
    }

    fn at_doc_comment(&self) -> bool {
        let rest = &self.bytes[self.index..];
        rest.starts_with(b"///") && !rest.starts_with(b"////")
    }

    fn skip_line(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == b'\n' {
                break;
            }
            self.consume_char();
        }
    }

    fn lex_doc_comment(&mut self, start: usize) -> Token<'src> {
        // skip_trivia only stops here for a real `///`.
        self.index += 3;
        let text_start = self.index;
        self.skip_line();
        let text = self.source[text_start..self.index].trim_end_matches('\r');
        Token {
            kind: TokenKind::DocComment,
            text,
            span: self.span_from(start),
        }
    }

    fn lex_punct(&mut self, start: usize, ch: u8) -> Token<'src> {
        self.consume_char();
        let next = self.peek_char();
        let (kind, wide) = match (ch, next) {
            (b'-', Some(b'>')) => (TokenKind::Arrow, true),
            (b'=', Some(b'=')) => (TokenKind::EqEq, true),
            (b'!', Some(b'=')) => (TokenKind::NotEq, true),
            (b'<', Some(b'=')) => (TokenKind::LessEq, true),
            (b'>', Some(b'=')) => (TokenKind::GreaterEq, true),
            (b'&', Some(b'&')) => (TokenKind::AndAnd, true),
            (b'|', Some(b'|')) => (TokenKind::OrOr, true),
            (b'(', _) => (TokenKind::LParen, false),
            (b')', _) => (TokenKind::RParen, false),
            (b'{', _) => (TokenKind::LBrace, false),
            (b'}', _) => (TokenKind::RBrace, false),
            (b',', _) => (TokenKind::Comma, false),
            (b';', _) => (TokenKind::Semi, false),
            (b':', _) => (TokenKind::Colon, false),
            (b'.', _) => (TokenKind::Dot, false),
            (b'=', _) => (TokenKind::Equal, false),
            (b'+', _) => (TokenKind::Plus, false),
            (b'-', _) => (TokenKind::Minus, false),
            (b'*', _) => (TokenKind::Star, false),
            (b'/', _) => (TokenKind::Slash, false),
            (b'%', _) => (TokenKind::Percent, false),
            (b'!', _) => (TokenKind::Bang, false),
            (b'<', _) => (TokenKind::Less, false),
            (b'>', _) => (TokenKind::Greater, false),
            _ => {
                // Swallow the rest of a multi-byte character so the error
                // token covers exactly one char.
                while self.peek_char().is_some_and(|b| b & 0xC0 == 0x80) {
                    self.consume_char();
                }
                (TokenKind::Error(LexError::UnexpectedChar), false)
            }
        };
        if wide {
            self.consume_char();
        }
        self.token(kind, start)
    }

    fn lex_string(&mut self, start: usize) -> Token<'src> {
        // Opening quote
        self.consume_char();
        let content_start = self.index;
        let mut error = None;

        while let Some(ch) = self.peek_char() {
            match ch {
                b'"' => {
                    let content_end = self.index;
                    self.consume_char();
                    return Token {
                        kind: error.map_or(TokenKind::StringLiteral, TokenKind::Error),
                        text: &self.source[content_start..content_end],
                        span: self.span_from(start),
                    };
                }
                b'\\' => {
                    self.consume_char();
                    match self.peek_char() {
                        Some(b'n' | b't' | b'r' | b'0' | b'\\' | b'"') => self.consume_char(),
                        Some(_) => error = Some(LexError::InvalidEscape),
                        None => {}
                    }
                }
                b'\n' => break,
                _ => self.consume_char(),
            }
        }

        self.token(TokenKind::Error(LexError::UnterminatedString), start)
    }

    fn lex_number(&mut self, start: usize) -> Token<'src> {
        self.consume_digits();

        let mut kind = TokenKind::IntLiteral;
        if self.peek_char() == Some(b'.') && self.peek_next().is_some_and(|b| b.is_ascii_digit()) {
            kind = TokenKind::FloatLiteral;
            self.consume_char();
            self.consume_digits();
        }

        // `12abc` is one malformed token, not a number followed by a name.
        if self.peek_char().is_some_and(is_ident_continue) {
            while self.peek_char().is_some_and(is_ident_continue) {
                self.consume_char();
            }
            kind = TokenKind::Error(LexError::MalformedNumber);
        }

        self.token(kind, start)
    }

    fn consume_digits(&mut self) {
        while self.peek_char().is_some_and(|b| b.is_ascii_digit() || b == b'_') {
            self.consume_char();
        }
    }

    fn lex_ident_or_keyword(&mut self, start: usize) -> Token<'src> {
        while self.peek_char().is_some_and(is_ident_continue) {
            self.consume_char();
        }

        let kind = match &self.source[start..self.index] {
            "fn" => TokenKind::Fn,
            "extern" => TokenKind::Extern,
            "struct" => TokenKind::Struct,
            "let" => TokenKind::Let,
            "mut" => TokenKind::Mut,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => TokenKind::Ident,
        };
        self.token(kind, start)
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token<'src> {
        Token {
            kind,
            text: &self.source[start..self.index],
            span: self.span_from(start),
        }
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(self.file_id, start as u32, self.index as u32)
    }

    fn peek_char(&self) -> Option<u8> {
        self.bytes.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.bytes.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        if self.index < self.bytes.len() {
            self.index += 1;
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Token<'src>> {
        if self.finished {
            return None;
        }
        let token = self.scan();
        if token.kind == TokenKind::Eof {
            self.finished = true;
        }
        Some(token)
    }
}

/// Resolve the escapes of a string literal body. The lexer has already
/// rejected unknown escapes, so anything unexpected is kept verbatim.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}
