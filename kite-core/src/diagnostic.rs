//! Diagnostics collected while compiling.
//!
//! Every diagnostic carries an explicit `fatal` flag. A fatal diagnostic
//! blocks code generation for the whole compilation; a non-fatal one
//! describes something the backend can lower around (for example by
//! emitting a trapping stub for a function that failed to parse).

use std::borrow::Cow;
use std::fmt;

use crate::span::{FileId, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Which phase produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Invalid character or malformed literal.
    LexError,
    /// Malformed syntax.
    ParseError,
    /// Unresolved reference or type mismatch.
    TypeError,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::LexError => "lex error",
            DiagnosticKind::ParseError => "parse error",
            DiagnosticKind::TypeError => "type error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub fatal: bool,
    pub code: Option<&'static str>,
    pub message: Cow<'static, str>,
    pub span: Span,
}

impl Diagnostic {
    /// A non-fatal error. Use [`Diagnostic::into_fatal`] or
    /// [`Diagnostic::fatal`] for errors that must block codegen.
    pub fn error(kind: DiagnosticKind, message: impl Into<Cow<'static, str>>, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Error,
            kind,
            fatal: false,
            code: None,
            message: message.into(),
            span,
        }
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<Cow<'static, str>>, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(kind, message, span)
        }
    }

    /// A fatal error.
    pub fn fatal(kind: DiagnosticKind, message: impl Into<Cow<'static, str>>, span: Span) -> Self {
        Diagnostic::error(kind, message, span).into_fatal()
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn into_fatal(mut self) -> Self {
        self.fatal = true;
        self.severity = Severity::Error;
        self
    }

    /// Downgrade to a non-fatal diagnostic, keeping the severity.
    pub fn into_recoverable(mut self) -> Self {
        self.fatal = false;
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    pub fn file_id(&self) -> FileId {
        self.span.file_id
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{severity}")?;
        if let Some(code) = self.code {
            write!(f, "[{code}]")?;
        }
        write!(f, " ({}): {} at byte {}", self.kind, self.message, self.span.start)
    }
}

/// Returns true if any diagnostic blocks code generation.
pub fn has_fatal(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_fatal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_flag_is_explicit() {
        let span = Span::new(FileId::USER, 0, 1);
        let plain = Diagnostic::error(DiagnosticKind::ParseError, "bad", span);
        assert!(!plain.is_fatal());
        let fatal = plain.clone().into_fatal();
        assert!(fatal.is_fatal());
        assert!(!fatal.into_recoverable().is_fatal());
        let warning = Diagnostic::warning(DiagnosticKind::TypeError, "w", span);
        let fatal = Diagnostic::fatal(DiagnosticKind::TypeError, "f", span);
        assert!(has_fatal(&[warning.clone(), fatal]));
        assert!(!has_fatal(&[warning]));
    }

    #[test]
    fn display_includes_code_and_kind() {
        let span = Span::new(FileId::USER, 7, 8);
        let diag = Diagnostic::error(DiagnosticKind::LexError, "unexpected character", span)
            .with_code("E0001");
        assert_eq!(
            diag.to_string(),
            "error[E0001] (lex error): unexpected character at byte 7"
        );
    }

    #[test]
    fn constructors_keep_the_given_kind() {
        let span = Span::new(FileId::USER, 0, 1);
        let warning = Diagnostic::warning(DiagnosticKind::TypeError, "unused", span);
        assert_eq!(warning.kind, DiagnosticKind::TypeError);
        assert_eq!(warning.severity, Severity::Warning);
        let fatal = Diagnostic::fatal(DiagnosticKind::LexError, "bad byte", span);
        assert_eq!(fatal.kind, DiagnosticKind::LexError);
        assert!(fatal.to_string().contains("(lex error)"));
    }
}
