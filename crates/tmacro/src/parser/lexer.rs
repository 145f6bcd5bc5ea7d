//! Tolerant two-mode lexer for macro templates.
//!
//! Plaintext mode collects text until an unescaped `{{`. Macro-interior mode
//! is a small state machine per open macro, kept on a stack so nested `{{`
//! inside arguments re-enters it. A character the current state cannot accept
//! records a [`LexError`], turns the innermost open `{{` into plaintext and
//! lexes the rest of that macro again in the enclosing mode.
//!
//! Concatenating the text of every emitted token reproduces the input.

use crate::parser::error::LexError;
use crate::parser::token::{Token, TokenKind, VarOp};

/// Output of a lexer run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

impl Lexed {
    /// Reassemble the source text from the token stream.
    pub fn source(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }
}

/// Tokenize `input`, with offsets relative to its start.
pub fn tokenize(input: &str) -> Lexed {
    tokenize_at(input, 0)
}

/// Tokenize `input` as if it began at `base` in the top-level content.
pub fn tokenize_at(input: &str, base: usize) -> Lexed {
    let mut lexer = Lexer {
        input,
        base,
        pos: 0,
        tokens: Vec::new(),
        errors: Vec::new(),
        stack: Vec::new(),
    };
    lexer.run();
    Lexed {
        tokens: lexer.tokens,
        errors: lexer.errors,
    }
}

/// Flag characters accepted right after `{{` (and after a filter pipe).
pub const FLAG_CHARS: [char; 6] = ['!', '?', '~', '/', '#', '>'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Directly after `{{`: flags and whitespace.
    Flags,
    /// Expecting the macro name or a variable prefix.
    Name,
    /// After a macro or filter name.
    AfterName { saw_space: bool },
    /// Inside argument text.
    Args,
    /// After a pipe: filter flags then the filter name.
    Filter,
    /// After a variable prefix.
    VarName,
    /// After a variable name.
    VarAfterName,
    /// After `++` or `--`.
    VarAfterOp,
}

#[derive(Debug)]
struct Frame {
    /// Index of this macro's `MacroStart` token.
    token_index: usize,
    /// Byte position of the `{{` within the input.
    start: usize,
    state: State,
    /// Whether a separator has been seen since the last name.
    seen_separator: bool,
    in_quote: bool,
}

struct Lexer<'i> {
    input: &'i str,
    base: usize,
    pos: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
    stack: Vec<Frame>,
}

impl<'i> Lexer<'i> {
    fn run(&mut self) {
        while self.pos < self.input.len() {
            if self.stack.is_empty() {
                self.lex_plaintext();
            } else {
                self.lex_interior();
            }
        }
    }

    fn rest(&self) -> &'i str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn frame(&mut self) -> &mut Frame {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn emit(&mut self, kind: TokenKind, len: usize) {
        let text = &self.input[self.pos..self.pos + len];
        if kind == TokenKind::Plaintext
            && let Some(prev) = self.tokens.last_mut()
            && prev.kind == TokenKind::Plaintext
            && prev.end() == self.base + self.pos
        {
            prev.text.push_str(text);
        } else {
            self.tokens.push(Token::new(kind, text, self.base + self.pos));
        }
        self.pos += len;
    }

    fn open_macro(&mut self) {
        self.stack.push(Frame {
            token_index: self.tokens.len(),
            start: self.pos,
            state: State::Flags,
            seen_separator: false,
            in_quote: false,
        });
        self.emit(TokenKind::MacroStart, 2);
    }

    fn close_macro(&mut self) {
        self.emit(TokenKind::MacroEnd, 2);
        self.stack.pop();
    }

    /// Record an error at the current position and fold the innermost macro's
    /// `{{` back into plaintext. Everything after it is lexed again in the
    /// enclosing mode, so well-formed macros further along still open.
    fn fail(&mut self, expected: &'static str) {
        let found = self.peek().unwrap_or('\0');
        let error = LexError::UnexpectedChar {
            offset: self.base + self.pos,
            skip: found.len_utf8(),
            found,
            expected,
        };
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };
        self.tokens.truncate(frame.token_index);
        self.pos = frame.start;
        self.emit(TokenKind::Plaintext, 2);
    }

    fn lex_plaintext(&mut self) {
        let rest = self.rest();
        let mut search = 0;
        loop {
            let Some(found) = rest[search..].find("{{") else {
                self.emit(TokenKind::Plaintext, rest.len());
                return;
            };
            let at = search + found;
            let run = brace_run(&rest[at..]);
            if at > 0 && rest.as_bytes()[at - 1] == b'\\' {
                search = at + run;
                continue;
            }
            // Extra leading braces stay literal; the macro opens on the last two.
            let open = at + run - 2;
            if open > 0 {
                self.emit(TokenKind::Plaintext, open);
            }
            self.open_macro();
            return;
        }
    }

    fn lex_interior(&mut self) {
        let state = self.frame().state;
        match state {
            State::Flags => self.lex_flags(),
            State::Name => self.lex_name(),
            State::AfterName { saw_space } => self.lex_after_name(saw_space),
            State::Args => self.lex_args(),
            State::Filter => self.lex_filter(),
            State::VarName => self.lex_var_name(),
            State::VarAfterName => self.lex_var_after_name(),
            State::VarAfterOp => self.lex_var_after_op(),
        }
    }

    fn lex_whitespace(&mut self) -> bool {
        let len = whitespace_len(self.rest());
        if len > 0 {
            self.emit(TokenKind::Whitespace, len);
        }
        len > 0
    }

    fn lex_flags(&mut self) {
        if self.lex_whitespace() {
            return;
        }
        match self.peek() {
            Some(c) if FLAG_CHARS.contains(&c) => self.emit(TokenKind::Flag, 1),
            _ => self.frame().state = State::Name,
        }
    }

    fn lex_name(&mut self) {
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() => {
                let len = identifier_len(self.rest());
                self.emit(TokenKind::MacroIdentifier, len);
                self.frame().state = State::AfterName { saw_space: false };
            }
            Some('.') => {
                self.emit(TokenKind::VarLocalPrefix, 1);
                self.frame().state = State::VarName;
            }
            Some('$') => {
                self.emit(TokenKind::VarGlobalPrefix, 1);
                self.frame().state = State::VarName;
            }
            _ => self.fail("a macro name"),
        }
    }

    fn lex_after_name(&mut self, saw_space: bool) {
        if self.lex_whitespace() {
            self.frame().state = State::AfterName { saw_space: true };
            return;
        }
        let rest = self.rest();
        if rest.starts_with("}}") {
            self.close_macro();
        } else if rest.starts_with("::") {
            self.emit(TokenKind::DoubleColon, 2);
            self.enter_args();
        } else if rest.starts_with(':') && !self.frame().seen_separator {
            self.emit(TokenKind::Colon, 1);
            self.enter_args();
        } else if rest.starts_with('|') {
            self.emit(TokenKind::Pipe, 1);
            self.frame().seen_separator = false;
            self.frame().state = State::Filter;
        } else if saw_space {
            // Legacy form: a whitespace-separated word starts the arguments.
            self.enter_args();
        } else {
            self.fail("'::', '|' or '}}' after the name");
        }
    }

    fn enter_args(&mut self) {
        let frame = self.frame();
        frame.seen_separator = true;
        frame.state = State::Args;
    }

    fn lex_args(&mut self) {
        let rest = self.rest();
        let in_quote = self.frame().in_quote;
        let Some(c) = rest.chars().next() else {
            return;
        };
        match c {
            '{' => {
                let run = brace_run(rest);
                if run >= 2 {
                    // Extra leading braces stay literal; the macro opens on the last two.
                    for _ in 0..run - 2 {
                        self.emit(TokenKind::Unknown, 1);
                    }
                    self.open_macro();
                } else {
                    self.emit(TokenKind::Unknown, 1);
                }
            }
            '}' => {
                let run = close_run(rest);
                // An odd run keeps its first brace literal and closes on the next two.
                if run >= 2 && run % 2 == 0 {
                    self.close_macro();
                } else {
                    self.emit(TokenKind::Unknown, 1);
                }
            }
            '\\' => {
                let escaped = &rest[1..];
                if escaped.starts_with('|') {
                    self.emit(TokenKind::EscapedPipe, 2);
                } else if escaped.starts_with("{{") || escaped.starts_with("}}") {
                    self.emit(TokenKind::Unknown, 3);
                } else if escaped.starts_with(['{', '}', '"']) {
                    self.emit(TokenKind::Unknown, 2);
                } else {
                    self.emit(TokenKind::Unknown, 1);
                }
            }
            '"' => {
                let frame = self.frame();
                frame.in_quote = !frame.in_quote;
                self.emit(TokenKind::Quote, 1);
            }
            _ if in_quote => {
                let len = text_run_len(rest, true);
                self.emit_word(len);
            }
            '|' => {
                self.emit(TokenKind::Pipe, 1);
                self.frame().seen_separator = false;
                self.frame().state = State::Filter;
            }
            ':' if rest.starts_with("::") => self.emit(TokenKind::DoubleColon, 2),
            ':' => self.emit(TokenKind::Unknown, 1),
            '=' => self.emit(TokenKind::Equals, 1),
            c if c.is_whitespace() => {
                self.lex_whitespace();
            }
            _ => {
                let len = text_run_len(rest, false);
                self.emit_word(len);
            }
        }
    }

    fn emit_word(&mut self, len: usize) {
        let word = &self.rest()[..len];
        let kind = if identifier_len(word) == len && word.starts_with(|c: char| c.is_ascii_alphabetic())
        {
            TokenKind::Identifier
        } else {
            TokenKind::Unknown
        };
        self.emit(kind, len);
    }

    fn lex_filter(&mut self) {
        if self.lex_whitespace() {
            return;
        }
        match self.peek() {
            Some(c) if FLAG_CHARS.contains(&c) => self.emit(TokenKind::FilterFlag, 1),
            Some(c) if c.is_ascii_alphabetic() => {
                let len = identifier_len(self.rest());
                self.emit(TokenKind::FilterIdentifier, len);
                self.frame().state = State::AfterName { saw_space: false };
            }
            _ => self.fail("a filter name"),
        }
    }

    fn lex_var_name(&mut self) {
        let len = var_identifier_len(self.rest());
        if len == 0 {
            self.fail("a variable name");
        } else {
            self.emit(TokenKind::VarIdentifier, len);
            self.frame().state = State::VarAfterName;
        }
    }

    fn lex_var_after_name(&mut self) {
        if self.lex_whitespace() {
            return;
        }
        let rest = self.rest();
        if rest.starts_with("}}") {
            self.close_macro();
            return;
        }
        if let Some(op) = VarOp::BY_LENGTH
            .into_iter()
            .find(|op| rest.starts_with(op.as_str()))
        {
            self.emit(TokenKind::VarOperator(op), op.as_str().len());
            let frame = self.frame();
            if op.takes_operand() {
                frame.seen_separator = true;
                frame.state = State::Args;
            } else {
                frame.state = State::VarAfterOp;
            }
            return;
        }
        if rest.starts_with('|') {
            self.emit(TokenKind::Pipe, 1);
            self.frame().seen_separator = false;
            self.frame().state = State::Filter;
            return;
        }
        self.fail("an operator, '|' or '}}' after the variable name");
    }

    fn lex_var_after_op(&mut self) {
        if self.lex_whitespace() {
            return;
        }
        let rest = self.rest();
        if rest.starts_with("}}") {
            self.close_macro();
        } else if rest.starts_with('|') {
            self.emit(TokenKind::Pipe, 1);
            self.frame().seen_separator = false;
            self.frame().state = State::Filter;
        } else {
            self.fail("'|' or '}}' after the operator");
        }
    }
}

/// Number of consecutive `{` at the start of `s`.
fn brace_run(s: &str) -> usize {
    s.bytes().take_while(|&b| b == b'{').count()
}

/// Number of consecutive `}` at the start of `s`.
fn close_run(s: &str) -> usize {
    s.bytes().take_while(|&b| b == b'}').count()
}

fn whitespace_len(s: &str) -> usize {
    s.char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map_or(s.len(), |(i, _)| i)
}

/// Length of `[A-Za-z][A-Za-z0-9_-]*` at the start of `s`, or the tail of it
/// when the first character has already been checked.
fn identifier_len(s: &str) -> usize {
    s.bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'-')
        .count()
}

/// Length of `[A-Za-z_][A-Za-z0-9_]*(-[A-Za-z0-9_]+)*` at the start of `s`.
///
/// Hyphens are only taken when followed by a word character so that `x--`
/// lexes as `x` and `--`.
fn var_identifier_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
        _ => return 0,
    }
    let mut len = 1;
    while len < bytes.len() {
        if is_word(bytes[len]) {
            len += 1;
        } else if bytes[len] == b'-' && bytes.get(len + 1).is_some_and(|b| is_word(*b)) {
            len += 2;
        } else {
            break;
        }
    }
    len
}

/// Length of a run of ordinary argument text. Quoted text only stops at
/// braces, backslashes and the closing quote.
fn text_run_len(s: &str, quoted: bool) -> usize {
    let stops = |c: char| {
        if quoted {
            matches!(c, '{' | '}' | '\\' | '"')
        } else {
            matches!(c, '{' | '}' | '\\' | '"' | '|' | ':' | '=') || c.is_whitespace()
        }
    };
    s.char_indices()
        .find(|(_, c)| stops(*c))
        .map_or(s.len(), |(i, _)| i)
}
