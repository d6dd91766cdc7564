use thiserror::Error;

/// Position of a token in the source text, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// Define a custom error type for parsing
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// The grammar rejected the input
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("invalid literal at {position}: {message}")]
    InvalidLiteral {
        message: String,
        position: SourcePosition,
    },

    #[error("unexpected rule {rule} at {position}")]
    UnexpectedRule {
        rule: String,
        position: SourcePosition,
    },

    #[error("expected exactly one form, found {0}")]
    FormCount(usize),
}

#[cfg(feature = "pest")]
pub(crate) fn pair_position(pair: &pest::iterators::Pair<super::Rule>) -> SourcePosition {
    let (line, column) = pair.as_span().start_pos().line_col();
    SourcePosition { line, column }
}

#[cfg(feature = "pest")]
pub(crate) fn invalid_literal_error(
    message: impl Into<String>,
    pair: &pest::iterators::Pair<super::Rule>,
) -> ParseError {
    ParseError::InvalidLiteral {
        message: message.into(),
        position: pair_position(pair),
    }
}

#[cfg(feature = "pest")]
impl From<pest::error::Error<super::Rule>> for ParseError {
    fn from(e: pest::error::Error<super::Rule>) -> Self {
        ParseError::Syntax(e.to_string())
    }
}
