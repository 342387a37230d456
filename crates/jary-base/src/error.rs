//! Diagnostics and the fatal-error type shared by compile and execute.
//!
//! Parsing and compilation are non-fatal at the rule level:
//! every problem becomes a [`Diagnostic`] appended to a list, and the
//! driver moves on to the next declaration or rule. Execution is fatal at
//! the first [`Fatal`] error and the instance becomes inert.

use crate::span::TokenSpan;
use std::fmt;

/// A single parse or semantic problem, anchored to the tokens that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub span: TokenSpan,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, span: TokenSpan) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at token {}..{}", self.message, self.span.from, self.span.to)
    }
}

impl std::error::Error for Diagnostic {}

/// Unrecoverable runtime failure. Anything mapped to `Fatal` makes the
/// owning `jary::Runtime` inert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fatal {
    OutOfMemory,
    QueryFailed(String),
    InvariantViolation(String),
}

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fatal::OutOfMemory => write!(f, "out of memory"),
            Fatal::QueryFailed(msg) => write!(f, "query failed: {msg}"),
            Fatal::InvariantViolation(msg) => write!(f, "invariant violation: {msg}"),
        }
    }
}

impl std::error::Error for Fatal {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display_includes_span() {
        let d = Diagnostic::new("type mismatch", TokenSpan::new(3, 5));
        let text = d.to_string();
        assert!(text.contains("type mismatch"));
        assert!(text.contains("3..5"));
    }

    #[test]
    fn fatal_display_variants() {
        assert_eq!(Fatal::OutOfMemory.to_string(), "out of memory");
        assert!(Fatal::QueryFailed("x".into()).to_string().contains('x'));
    }
}
