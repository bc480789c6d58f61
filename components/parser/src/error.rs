//! Parser error types

use core_types::SourcePosition;
use thiserror::Error;

/// Errors raised while reading or lowering source text
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// A character that cannot start any token
    #[error("unexpected character '{ch}' at {position}")]
    UnexpectedChar {
        /// Offending character
        ch: char,
        /// Where it was found
        position: SourcePosition,
    },

    /// A string literal without its closing quote
    #[error("unterminated string starting at {position}")]
    UnterminatedString {
        /// Position of the opening quote
        position: SourcePosition,
    },

    /// An escape sequence other than `\n \t \\ \"`
    #[error("invalid escape '\\{ch}' at {position}")]
    InvalidEscape {
        /// Character after the backslash
        ch: char,
        /// Position of the backslash
        position: SourcePosition,
    },

    /// A numeric atom that does not fit its type
    #[error("invalid number '{text}' at {position}")]
    InvalidNumber {
        /// Atom text
        text: String,
        /// Where the atom starts
        position: SourcePosition,
    },

    /// A closing parenthesis with no matching opening one
    #[error("unexpected ')' at {position}")]
    UnbalancedClose {
        /// Position of the parenthesis
        position: SourcePosition,
    },

    /// Input ended inside a list or after a quote
    #[error("unexpected end of input, list opened at {position} is not closed")]
    UnexpectedEof {
        /// Where the unfinished construct starts
        position: SourcePosition,
    },

    /// A special form with the wrong shape
    #[error("malformed {form} at {position}: {message}")]
    Malformed {
        /// Name of the form
        form: &'static str,
        /// What is wrong with it
        message: String,
        /// Where the form starts
        position: SourcePosition,
    },
}

impl ParseError {
    /// Position the error refers to
    pub fn position(&self) -> SourcePosition {
        match self {
            ParseError::UnexpectedChar { position, .. }
            | ParseError::UnterminatedString { position }
            | ParseError::InvalidEscape { position, .. }
            | ParseError::InvalidNumber { position, .. }
            | ParseError::UnbalancedClose { position }
            | ParseError::UnexpectedEof { position }
            | ParseError::Malformed { position, .. } => *position,
        }
    }
}

/// Create a malformed-form error
pub fn malformed(
    form: &'static str,
    message: impl Into<String>,
    position: SourcePosition,
) -> ParseError {
    ParseError::Malformed {
        form,
        message: message.into(),
        position,
    }
}
