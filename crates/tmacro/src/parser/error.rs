//! Recoverable lexer and parser problems.
//!
//! Nothing here aborts a parse. Each value describes a span that was degraded
//! to plain text and is reported through the diagnostics channel.

use thiserror::Error;

/// A malformed character sequence inside a macro. The lexer folds the macro
/// back into plaintext and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    /// A character that cannot continue the current token.
    #[error("unexpected '{found}' at offset {offset}: expected {expected}")]
    UnexpectedChar {
        offset: usize,
        skip: usize,
        found: char,
        expected: &'static str,
    },
}

impl LexError {
    /// Absolute byte offset of the offending character.
    pub fn offset(&self) -> usize {
        match self {
            LexError::UnexpectedChar { offset, .. } => *offset,
        }
    }

    /// Byte length of the offending span.
    pub fn skip(&self) -> usize {
        match self {
            LexError::UnexpectedChar { skip, .. } => *skip,
        }
    }
}

/// A structural problem found while grouping tokens into invocations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseWarning {
    /// A `{{` with no matching `}}` before the end of input.
    #[error("unterminated macro starting at offset {offset}")]
    Unterminated { offset: usize },
}
