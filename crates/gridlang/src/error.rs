//! Error taxonomy shared by every pipeline stage (lexer through VM).
//!
//! See spec §7. All five kinds carry the same `line`/`col`/`message` shape so
//! a host can render `<kind> at line L, col C: <message>` uniformly.

use std::fmt;

use thiserror::Error;

/// Result alias used pervasively across the crate.
pub type GridResult<T> = Result<T, GridError>;

/// The five error kinds a conforming implementation raises (spec §7).
#[derive(Debug, Clone, Error)]
pub enum GridError {
    #[error("{0}")]
    Lex(ErrorInfo),
    #[error("{0}")]
    Parse(ErrorInfo),
    #[error("{0}")]
    Compile(ErrorInfo),
    #[error("{0}")]
    Runtime(ErrorInfo),
    #[error("{0}")]
    Assertion(ErrorInfo),
}

/// Location-tagged message shared by every `GridError` variant.
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    pub line: u32,
    pub col: u32,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(line: u32, col: u32, message: impl Into<String>) -> Self {
        Self { line, col, message: message.into() }
    }
}

impl GridError {
    pub fn lex(line: u32, col: u32, message: impl Into<String>) -> Self {
        Self::Lex(ErrorInfo::new(line, col, message))
    }

    pub fn parse(line: u32, col: u32, message: impl Into<String>) -> Self {
        Self::Parse(ErrorInfo::new(line, col, message))
    }

    pub fn compile(line: u32, col: u32, message: impl Into<String>) -> Self {
        Self::Compile(ErrorInfo::new(line, col, message))
    }

    pub fn runtime(line: u32, col: u32, message: impl Into<String>) -> Self {
        Self::Runtime(ErrorInfo::new(line, col, message))
    }

    pub fn assertion(line: u32, col: u32, message: impl Into<String>) -> Self {
        Self::Assertion(ErrorInfo::new(line, col, message))
    }

    /// The kind name as it appears in the user-visible error shape.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Lex(_) => "LexError",
            Self::Parse(_) => "ParseError",
            Self::Compile(_) => "CompileError",
            Self::Runtime(_) => "RuntimeError",
            Self::Assertion(_) => "AssertionError",
        }
    }

    pub fn info(&self) -> &ErrorInfo {
        match self {
            Self::Lex(i) | Self::Parse(i) | Self::Compile(i) | Self::Runtime(i) | Self::Assertion(i) => i,
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at line {}, col {}: {}", self.line, self.col, self.message)
    }
}

/// Renders the full `<kind> at line L, col C: <message>` user-visible shape.
impl GridError {
    pub fn user_visible(&self) -> String {
        format!("{} {}", self.kind_name(), self.info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_visible_shape_matches_spec() {
        let err = GridError::runtime(3, 7, "undefined variable 'x'");
        assert_eq!(err.user_visible(), "RuntimeError at line 3, col 7: undefined variable 'x'");
    }
}
