//! Syntax error types

use text_size::TextRange;

use crate::base::Span;

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum Severity {
    /// Informational only
    Info,
    /// A problem that does not make the model unusable
    Warning,
    /// A hard error
    #[default]
    Error,
}

impl Severity {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A syntax error with location and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    /// Byte range in the source text
    pub range: TextRange,
    /// Line/column form of `range`
    pub span: Span,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, range: TextRange, span: Span) -> Self {
        Self {
            message: message.into(),
            range,
            span,
        }
    }
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.span.start.line + 1,
            self.span.start.column + 1,
            self.message
        )
    }
}
