//! Miette diagnostics for malformed macros.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;
use tmacro::parser::{LexError, ParseWarning};

/// A problem in a template file, pointed at with source context.
///
/// Fields are read by the miette derive, not directly by code.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(tmacro::syntax))]
pub struct TemplateDiagnostic {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    span: SourceSpan,

    message: String,

    #[help]
    help: Option<String>,
}

impl TemplateDiagnostic {
    fn new(name: &str, content: &str, offset: usize, len: usize, message: String) -> Self {
        // miette panics on spans past the end of the source
        let offset = offset.min(content.len());
        let len = len.min(content.len() - offset);
        TemplateDiagnostic {
            src: NamedSource::new(name, content.to_string()),
            span: (offset, len).into(),
            message,
            help: None,
        }
    }

    /// A character the lexer could not accept. The macro around it was
    /// kept as text.
    pub fn from_lex_error(name: &str, content: &str, err: &LexError) -> Self {
        let LexError::UnexpectedChar {
            found, expected, ..
        } = err;
        let mut diagnostic = Self::new(
            name,
            content,
            err.offset(),
            err.skip(),
            format!("unexpected '{found}' in macro"),
        );
        diagnostic.help = Some(format!("expected {expected}; the macro is kept as text"));
        diagnostic
    }

    pub fn from_parse_warning(name: &str, content: &str, warning: &ParseWarning) -> Self {
        let ParseWarning::Unterminated { offset } = warning;
        let mut diagnostic = Self::new(
            name,
            content,
            *offset,
            2,
            "unterminated macro".to_string(),
        );
        diagnostic.help = Some("close it with '}}' or escape it as '\\{{'".to_string());
        diagnostic
    }

    /// Byte offset the diagnostic points at.
    pub fn offset(&self) -> usize {
        self.span.offset()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
