//! Token types produced by the lexer.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// An operator inside a variable shorthand expression (`{{.name op rhs}}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarOp {
    /// `++`
    Increment,
    /// `--`
    Decrement,
    /// `=`
    Assign,
    /// `+=`
    AddAssign,
    /// `-=`
    SubAssign,
    /// `||`
    Or,
    /// `??`
    Nullish,
    /// `||=`
    OrAssign,
    /// `??=`
    NullishAssign,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
}

impl VarOp {
    /// All operators, longest spelling first so lexing can take the first prefix match.
    pub const BY_LENGTH: [VarOp; 15] = [
        VarOp::OrAssign,
        VarOp::NullishAssign,
        VarOp::Increment,
        VarOp::Decrement,
        VarOp::AddAssign,
        VarOp::SubAssign,
        VarOp::Or,
        VarOp::Nullish,
        VarOp::Eq,
        VarOp::Ne,
        VarOp::Ge,
        VarOp::Le,
        VarOp::Assign,
        VarOp::Gt,
        VarOp::Lt,
    ];

    /// The source spelling of this operator.
    pub fn as_str(self) -> &'static str {
        match self {
            VarOp::Increment => "++",
            VarOp::Decrement => "--",
            VarOp::Assign => "=",
            VarOp::AddAssign => "+=",
            VarOp::SubAssign => "-=",
            VarOp::Or => "||",
            VarOp::Nullish => "??",
            VarOp::OrAssign => "||=",
            VarOp::NullishAssign => "??=",
            VarOp::Eq => "==",
            VarOp::Ne => "!=",
            VarOp::Gt => ">",
            VarOp::Ge => ">=",
            VarOp::Lt => "<",
            VarOp::Le => "<=",
        }
    }

    /// Whether the operator is followed by a right-hand expression.
    pub fn takes_operand(self) -> bool {
        !matches!(self, VarOp::Increment | VarOp::Decrement)
    }
}

impl Display for VarOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// The kind of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Text outside any macro, or a macro region folded back after a lex error.
    Plaintext,
    /// `{{`
    MacroStart,
    /// `}}`
    MacroEnd,
    /// One of `! ? ~ / # >` directly after `{{`.
    Flag,
    /// A flag character directly after a filter pipe.
    FilterFlag,
    /// The macro name.
    MacroIdentifier,
    /// An identifier-shaped word inside the arguments.
    Identifier,
    /// Any other run of argument text.
    Unknown,
    /// `::`
    DoubleColon,
    /// Legacy single `:`, only as the first separator.
    Colon,
    /// `=`
    Equals,
    /// `"`
    Quote,
    /// Unescaped `|`
    Pipe,
    /// The name following a pipe.
    FilterIdentifier,
    /// `\|`, a literal pipe that never starts a filter.
    EscapedPipe,
    /// `.` starting a local variable shorthand.
    VarLocalPrefix,
    /// `$` starting a global variable shorthand.
    VarGlobalPrefix,
    /// The variable name in a shorthand expression.
    VarIdentifier,
    /// A shorthand operator.
    VarOperator(VarOp),
    /// A run of whitespace inside a macro.
    Whitespace,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TokenKind::Plaintext => f.write_str("Plaintext"),
            TokenKind::MacroStart => f.write_str("Macro.Start"),
            TokenKind::MacroEnd => f.write_str("Macro.End"),
            TokenKind::Flag => f.write_str("Macro.Flag"),
            TokenKind::FilterFlag => f.write_str("Macro.FilterFlag"),
            TokenKind::MacroIdentifier => f.write_str("Macro.Identifier"),
            TokenKind::Identifier => f.write_str("Identifier"),
            TokenKind::Unknown => f.write_str("Unknown"),
            TokenKind::DoubleColon => f.write_str("Args.DoubleColon"),
            TokenKind::Colon => f.write_str("Args.Colon"),
            TokenKind::Equals => f.write_str("Args.Equals"),
            TokenKind::Quote => f.write_str("Args.Quote"),
            TokenKind::Pipe => f.write_str("Filter.Pipe"),
            TokenKind::FilterIdentifier => f.write_str("Filter.Identifier"),
            TokenKind::EscapedPipe => f.write_str("Filter.EscapedPipe"),
            TokenKind::VarLocalPrefix => f.write_str("Var.LocalPrefix"),
            TokenKind::VarGlobalPrefix => f.write_str("Var.GlobalPrefix"),
            TokenKind::VarIdentifier => f.write_str("Var.Identifier"),
            TokenKind::VarOperator(op) => write!(f, "Var.Operator({op})"),
            TokenKind::Whitespace => f.write_str("Whitespace"),
        }
    }
}

/// A lexed token. `start` is the absolute byte offset of the token in the
/// top-level content being evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, start: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            start,
        }
    }

    /// Absolute byte offset one past the end of this token.
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}
