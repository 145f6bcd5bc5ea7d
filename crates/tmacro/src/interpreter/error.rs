//! Error and warning types for macro evaluation.

use thiserror::Error;

use crate::interpreter::registry::ArgType;
use crate::parser::{LexError, ParseWarning};

/// An error raised by a macro handler or filter.
///
/// The engine never propagates these to the caller. The invocation that
/// raised one is left as literal text and the error is reported as an
/// [`EvalWarning`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacroError {
    /// An argument value the handler cannot work with.
    #[error("invalid argument '{name}': {message}")]
    InvalidArgument { name: String, message: String },

    /// Any other handler failure.
    #[error("{0}")]
    Failed(String),
}

impl MacroError {
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        MacroError::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        MacroError::Failed(message.into())
    }
}

/// A recoverable problem found during one evaluation.
///
/// Warnings are logged through `tracing` when they occur and collected for
/// [`crate::MacroEngine::evaluate_with_diagnostics`]. None of them stop the
/// evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalWarning {
    /// A malformed macro was folded back into text.
    #[error(transparent)]
    Lex(#[from] LexError),

    /// A structural problem such as an unterminated `{{`.
    #[error(transparent)]
    Parse(#[from] ParseWarning),

    /// Wrong number of unnamed arguments.
    #[error("macro '{name}' expects {expected} arguments, got {got}")]
    ArgumentCount {
        name: String,
        expected: String,
        got: usize,
    },

    /// A required named argument was not supplied.
    #[error("macro '{name}' is missing named argument '{arg}'")]
    MissingNamedArgument { name: String, arg: String },

    /// An argument failed its declared type.
    #[error("macro '{name}' argument '{arg}' expects {expected}, got '{value}'")]
    ArgumentType {
        name: String,
        arg: String,
        expected: ArgType,
        value: String,
        strict: bool,
    },

    /// A scoped block was paired with a macro that takes no further argument.
    #[error("macro '{name}' cannot take scoped content")]
    ScopedArgumentRejected { name: String },

    /// A filter name with no registered filter.
    #[error("unknown filter '{filter}' on '{name}'")]
    UnknownFilter { name: String, filter: String },

    /// A filter written with flags, which filters do not accept.
    #[error("filter '{filter}' on '{name}' does not accept flags '{flags}'")]
    FilterFlags {
        name: String,
        filter: String,
        flags: String,
    },

    /// A handler returned an error.
    #[error("macro '{name}' failed: {message}")]
    HandlerFailed { name: String, message: String },

    /// A filter returned an error.
    #[error("filter '{filter}' on '{name}' failed: {message}")]
    FilterFailed {
        name: String,
        filter: String,
        message: String,
    },

    /// Nesting went deeper than the configured ceiling.
    #[error("maximum nesting depth {depth} exceeded at '{name}'")]
    MaxDepthExceeded { name: String, depth: usize },

    /// A numeric variable operator met a value that is not a number.
    #[error("variable '{name}' operator '{op}' needs numbers, got '{value}'")]
    NonNumericVariable {
        name: String,
        op: String,
        value: String,
    },
}

/// Error raised by an environment provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error("provider '{source_label}' failed: {message}")]
    Provider {
        source_label: String,
        message: String,
    },
}

impl EnvError {
    pub fn provider(source_label: impl Into<String>, message: impl Into<String>) -> Self {
        EnvError::Provider {
            source_label: source_label.into(),
            message: message.into(),
        }
    }
}
