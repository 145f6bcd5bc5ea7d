//! Groups a token stream into a [`Template`] tree.
//!
//! Handles:
//! - Invocation boundaries from `{{`/`}}` nesting
//! - Flags, names, `::`/`:`/whitespace argument separators, `key=value` and
//!   quoted arguments
//! - Filter chains after unescaped pipes
//! - Variable shorthand expressions
//! - Scoped blocks closed by a same-named `{{/name}}`
//!
//! The parser never fails. A `{{` without a matching `}}` is kept as text and
//! reported as a [`ParseWarning`].

use std::collections::HashMap;
use std::rc::Rc;

use crate::parser::ast::{
    Argument, FilterInvocation, Flags, MacroInvocation, ScopedBlock, Segment, Template, VarScope,
    VariableExpr,
};
use crate::parser::error::{LexError, ParseWarning};
use crate::parser::lexer::tokenize_at;
use crate::parser::token::{Token, TokenKind};
use crate::parser::whitespace::trim_inline;

/// Result of parsing a template string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parsed {
    pub template: Template,
    pub lex_errors: Vec<LexError>,
    pub warnings: Vec<ParseWarning>,
}

/// Parse a template string whose offsets start at zero.
pub fn parse_template(input: &str) -> Parsed {
    parse_template_at(input, 0)
}

/// Parse a template string that sits at `base` in the top-level content.
pub fn parse_template_at(input: &str, base: usize) -> Parsed {
    let lexed = tokenize_at(input, base);
    let (template, warnings) = parse_tokens(&lexed.tokens);
    Parsed {
        template,
        lex_errors: lexed.errors,
        warnings,
    }
}

/// Parse an already lexed token stream.
pub fn parse_tokens(tokens: &[Token]) -> (Template, Vec<ParseWarning>) {
    let mut parser = Parser::new(tokens);
    let template = parser.sequence(0, tokens.len(), TextMode::Value);
    (template, parser.warnings)
}

/// How token text is rendered into a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextMode {
    /// As written. Used for literal fallbacks.
    Raw,
    /// With escapes applied. Used for argument values and content.
    Value,
}

/// A paired invocation's position and whether it is a `{{/name}}` closer.
#[derive(Debug, Clone, Copy)]
struct Head {
    start: usize,
    end: usize,
    closing: bool,
}

struct Parser<'t> {
    tokens: &'t [Token],
    /// For each `MacroStart`, the index of its `MacroEnd`.
    pairs: Vec<Option<usize>>,
    /// For each paired `MacroStart`, how many paired invocations enclose it.
    levels: Vec<usize>,
    /// Paired invocations by lowercased name, in source order.
    heads: HashMap<String, Vec<Head>>,
    /// Invocations by start token, before scope pairing.
    nodes: HashMap<usize, Segment>,
    /// Scoped invocations by (open start, close start).
    scoped: HashMap<(usize, usize), Segment>,
    warnings: Vec<ParseWarning>,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        let mut pairs = vec![None; tokens.len()];
        let mut open = Vec::new();
        for (i, token) in tokens.iter().enumerate() {
            match token.kind {
                TokenKind::MacroStart => open.push(i),
                TokenKind::MacroEnd => {
                    if let Some(start) = open.pop() {
                        pairs[start] = Some(i);
                    }
                }
                _ => {}
            }
        }
        let mut levels = vec![0; tokens.len()];
        let mut heads: HashMap<String, Vec<Head>> = HashMap::new();
        let mut enclosing: Vec<usize> = Vec::new();
        for (start, end) in pairs.iter().enumerate() {
            let Some(end) = *end else {
                continue;
            };
            while enclosing.last().is_some_and(|outer| *outer < start) {
                enclosing.pop();
            }
            levels[start] = enclosing.len();
            enclosing.push(end);
            if let Some((ident, closing)) = head(tokens, start, end) {
                heads
                    .entry(ident.to_lowercase())
                    .or_default()
                    .push(Head {
                        start,
                        end,
                        closing,
                    });
            }
        }
        Self {
            tokens,
            pairs,
            levels,
            heads,
            nodes: HashMap::new(),
            scoped: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    fn kind(&self, i: usize) -> TokenKind {
        self.tokens[i].kind
    }

    /// The matching `MacroEnd` of a `MacroStart` at `i`, if it lies before `hi`.
    fn end_of(&self, i: usize, hi: usize) -> Option<usize> {
        if self.kind(i) != TokenKind::MacroStart {
            return None;
        }
        self.pairs[i].filter(|end| *end < hi)
    }

    fn sequence(&mut self, lo: usize, hi: usize, mode: TextMode) -> Template {
        let mut template = Template::default();
        let mut i = lo;
        while i < hi {
            if let Some(end) = self.end_of(i, hi) {
                let node = self.invocation(i, end);
                let (node, next) = match self.pair_scope(&node, i, end + 1, hi) {
                    Some(paired) => paired,
                    None => (node, end + 1),
                };
                template.push(node);
                i = next;
                continue;
            }
            let token = &self.tokens[i];
            if token.kind == TokenKind::MacroStart {
                let warning = ParseWarning::Unterminated {
                    offset: token.start,
                };
                if !self.warnings.contains(&warning) {
                    self.warnings.push(warning);
                }
            }
            match (token.kind, mode) {
                (TokenKind::EscapedPipe, TextMode::Value) => template.push_str("|"),
                _ => template.push_str(&token.text),
            }
            i += 1;
        }
        template
    }

    /// Index ranges between top-level separator tokens in `lo..hi`.
    /// Nested invocations are skipped as a unit.
    fn split(&self, lo: usize, hi: usize, is_separator: impl Fn(TokenKind) -> bool) -> Vec<(usize, usize)> {
        let mut ranges = Vec::new();
        let mut start = lo;
        let mut i = lo;
        while i < hi {
            if let Some(end) = self.end_of(i, hi) {
                i = end + 1;
                continue;
            }
            if is_separator(self.kind(i)) {
                ranges.push((start, i));
                start = i + 1;
            }
            i += 1;
        }
        ranges.push((start, hi));
        ranges
    }

    fn skip_whitespace(&self, mut i: usize, hi: usize) -> usize {
        while i < hi && self.kind(i) == TokenKind::Whitespace {
            i += 1;
        }
        i
    }

    fn invocation(&mut self, start: usize, end: usize) -> Segment {
        if let Some(node) = self.nodes.get(&start) {
            return node.clone();
        }
        let node = self.build_invocation(start, end);
        self.nodes.insert(start, node.clone());
        node
    }

    fn build_invocation(&mut self, start: usize, end: usize) -> Segment {
        let mut literal = Template::from_text(self.tokens[start].text.clone());
        let inner = self.sequence(start + 1, end, TextMode::Raw);
        literal.extend(&inner);
        literal.push_str(&self.tokens[end].text);

        let mut i = start + 1;
        let mut flag_chars = Vec::new();
        while i < end {
            match self.kind(i) {
                TokenKind::Flag => flag_chars.extend(self.tokens[i].text.chars()),
                TokenKind::Whitespace => {}
                _ => break,
            }
            i += 1;
        }
        let flags = Flags::from_chars(flag_chars);
        let offset = self.tokens[start].start;

        match self.tokens.get(i).map(|t| t.kind) {
            Some(TokenKind::MacroIdentifier) if i < end => {
                let identifier = self.tokens[i].text.clone();
                let sections = self.split(i + 1, end, |k| k == TokenKind::Pipe);
                let (args_lo, args_hi) = sections[0];
                let args = self.arguments(args_lo, args_hi, flags.preserve_whitespace);
                let filters = self.filters(&sections[1..], flags.preserve_whitespace);
                Segment::Macro(Rc::new(MacroInvocation {
                    identifier,
                    flags,
                    args,
                    filters,
                    scope: None,
                    offset,
                    literal,
                }))
            }
            Some(prefix @ (TokenKind::VarLocalPrefix | TokenKind::VarGlobalPrefix)) if i + 1 < end => {
                let scope = if prefix == TokenKind::VarLocalPrefix {
                    VarScope::Local
                } else {
                    VarScope::Global
                };
                let name = self.tokens[i + 1].text.clone();
                let mut j = self.skip_whitespace(i + 2, end);
                let op = match self.kind(j) {
                    TokenKind::VarOperator(op) if j < end => {
                        j += 1;
                        Some(op)
                    }
                    _ => None,
                };
                let sections = self.split(j, end, |k| k == TokenKind::Pipe);
                let (operand_lo, operand_hi) = sections[0];
                let operand = op
                    .filter(|op| op.takes_operand())
                    .map(|_| self.value(operand_lo, operand_hi, flags.preserve_whitespace));
                let filters = self.filters(&sections[1..], flags.preserve_whitespace);
                Segment::Variable(Rc::new(VariableExpr {
                    scope,
                    name,
                    op,
                    operand,
                    flags,
                    filters,
                    offset,
                    literal,
                }))
            }
            _ => Segment::Text(
                self.tokens[start..=end]
                    .iter()
                    .map(|t| t.text.as_str())
                    .collect(),
            ),
        }
    }

    /// Arguments following a macro or filter name.
    fn arguments(&mut self, lo: usize, hi: usize, preserve: bool) -> Vec<Argument> {
        let first = self.skip_whitespace(lo, hi);
        if first >= hi {
            return Vec::new();
        }
        let begin = match self.kind(first) {
            TokenKind::DoubleColon | TokenKind::Colon => first + 1,
            // Legacy whitespace separator: the next word starts the arguments.
            _ => first,
        };
        self.split(begin, hi, |k| k == TokenKind::DoubleColon)
            .into_iter()
            .map(|(a, b)| self.argument(a, b, preserve))
            .collect()
    }

    fn argument(&mut self, lo: usize, hi: usize, preserve: bool) -> Argument {
        let key = self.skip_whitespace(lo, hi);
        let name = (key + 1 < hi
            && self.kind(key) == TokenKind::Identifier
            && self.kind(key + 1) == TokenKind::Equals)
            .then(|| self.tokens[key].text.clone());
        let source = self.value(lo, hi, preserve);
        let value = match name {
            Some(_) => self.value(key + 2, hi, preserve),
            None => source.clone(),
        };
        Argument {
            name,
            value,
            source,
        }
    }

    /// An argument value. A value wrapped in one pair of quotes is taken
    /// verbatim without the quotes; otherwise it is trimmed unless whitespace
    /// is preserved.
    fn value(&mut self, lo: usize, hi: usize, preserve: bool) -> Template {
        let a = self.skip_whitespace(lo, hi);
        let mut b = hi;
        while b > a && self.kind(b - 1) == TokenKind::Whitespace {
            b -= 1;
        }
        if b >= a + 2 && self.kind(a) == TokenKind::Quote && self.kind(b - 1) == TokenKind::Quote {
            let inner_quotes = self
                .split(a + 1, b - 1, |k| k == TokenKind::Quote)
                .len();
            if inner_quotes == 1 {
                return self.sequence(a + 1, b - 1, TextMode::Value);
            }
        }
        let template = self.sequence(lo, hi, TextMode::Value);
        if preserve {
            template
        } else {
            trim_inline(&template)
        }
    }

    fn filters(&mut self, sections: &[(usize, usize)], preserve: bool) -> Vec<FilterInvocation> {
        let mut filters = Vec::new();
        for &(lo, hi) in sections {
            let mut flags = Vec::new();
            let mut i = lo;
            while i < hi && matches!(self.kind(i), TokenKind::Whitespace | TokenKind::FilterFlag) {
                if self.kind(i) == TokenKind::FilterFlag {
                    flags.extend(self.tokens[i].text.chars());
                }
                i += 1;
            }
            if i >= hi || self.kind(i) != TokenKind::FilterIdentifier {
                continue;
            }
            let name = self.tokens[i].text.clone();
            let args = self
                .arguments(i + 1, hi, preserve)
                .into_iter()
                .map(|arg| arg.source)
                .collect();
            filters.push(FilterInvocation {
                name,
                args,
                flags,
                offset: self.tokens[lo - 1].start,
            });
        }
        filters
    }

    /// Find the `{{/name}}` closing the scope opened at `open`, counting
    /// same-named openers at the same nesting level.
    fn find_close(
        &self,
        name: &str,
        open: usize,
        from: usize,
        hi: usize,
    ) -> Option<(usize, usize)> {
        let candidates = self.heads.get(&name.to_lowercase())?;
        let level = self.levels[open];
        let first = candidates.partition_point(|h| h.start < from);
        let mut depth = 1usize;
        for h in candidates[first..].iter().take_while(|h| h.start < hi) {
            if self.levels[h.start] != level || h.end >= hi {
                continue;
            }
            if h.closing {
                depth -= 1;
                if depth == 0 {
                    return Some((h.start, h.end));
                }
            } else {
                depth += 1;
            }
        }
        None
    }

    /// Attach a scoped block to an opening invocation if a closer exists.
    /// Returns the scoped node and the index after the closer.
    fn pair_scope(
        &mut self,
        node: &Segment,
        start: usize,
        from: usize,
        hi: usize,
    ) -> Option<(Segment, usize)> {
        let Segment::Macro(invocation) = node else {
            return None;
        };
        if invocation.flags.closing_block {
            return None;
        }
        let (close_start, close_end) = self.find_close(&invocation.identifier, start, from, hi)?;
        if let Some(scoped) = self.scoped.get(&(start, close_start)) {
            return Some((scoped.clone(), close_end + 1));
        }
        let content = self.sequence(from, close_start, TextMode::Value);
        let closing = self.tokens[close_start..=close_end]
            .iter()
            .map(|t| t.text.as_str())
            .collect();
        let mut scoped = MacroInvocation::clone(invocation);
        scoped.scope = Some(ScopedBlock { content, closing });
        let scoped = Segment::Macro(Rc::new(scoped));
        self.scoped.insert((start, close_start), scoped.clone());
        Some((scoped, close_end + 1))
    }
}

/// Name and closing flag of the invocation spanning `start..=end`.
fn head(tokens: &[Token], start: usize, end: usize) -> Option<(&str, bool)> {
    let mut closing = false;
    for token in &tokens[start + 1..end] {
        match token.kind {
            TokenKind::Flag => closing |= token.text == "/",
            TokenKind::Whitespace => {}
            TokenKind::MacroIdentifier => return Some((token.text.as_str(), closing)),
            _ => return None,
        }
    }
    None
}
