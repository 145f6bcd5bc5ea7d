//! Macro template lexer and parser.
//!
//! The lexer turns text into a lossless token stream. The parser groups those
//! tokens into a [`Template`] of text and invocation nodes that the
//! interpreter resolves on demand.

pub mod ast;
pub mod error;
mod lexer;
mod template;
pub mod token;
mod whitespace;

pub use ast::*;
pub use error::{LexError, ParseWarning};
pub use lexer::{FLAG_CHARS, Lexed, tokenize, tokenize_at};
pub use template::{Parsed, parse_template, parse_template_at, parse_tokens};
pub use token::{Token, TokenKind, VarOp};
pub use whitespace::{trim_block, trim_inline};
