//! Public AST types for parsed macro templates.
//!
//! Nodes are shared through `Rc` so that an invocation's literal form and its
//! argument templates can point at the same nested invocations.

use std::rc::Rc;

use crate::parser::token::VarOp;

/// A parsed template: text interleaved with macro invocations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    pub segments: Vec<Segment>,
}

/// A segment within a template.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text.
    Text(String),
    /// A `{{name...}}` invocation.
    Macro(Rc<MacroInvocation>),
    /// A `{{.name op rhs}}` or `{{$name op rhs}}` expression.
    Variable(Rc<VariableExpr>),
}

impl Template {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// A template holding a single text segment.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            Self::default()
        } else {
            Self::new(vec![Segment::Text(text)])
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether the template contains no invocations.
    pub fn is_plain(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Text(_)))
    }

    /// The text of a template without invocations, or `None`.
    pub fn as_plain_text(&self) -> Option<String> {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Append a segment, merging adjacent text.
    pub fn push(&mut self, segment: Segment) {
        match segment {
            Segment::Text(text) if text.is_empty() => {}
            Segment::Text(text) => {
                if let Some(Segment::Text(prev)) = self.segments.last_mut() {
                    prev.push_str(&text);
                } else {
                    self.segments.push(Segment::Text(text));
                }
            }
            other => self.segments.push(other),
        }
    }

    pub fn push_str(&mut self, text: &str) {
        self.push(Segment::Text(text.to_string()));
    }

    pub fn extend(&mut self, other: &Template) {
        for segment in &other.segments {
            self.push(segment.clone());
        }
    }

    /// The template as written, without resolving anything.
    pub fn source(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Macro(invocation) => out.push_str(&invocation.source()),
                Segment::Variable(expr) => out.push_str(&expr.literal.source()),
            }
        }
        out
    }

    /// Split at top-level marker invocations such as `{{else}}`.
    ///
    /// A marker is an argument-less, non-closing invocation whose name matches
    /// `marker` case-insensitively. Markers nested inside other invocations are
    /// not considered. Always returns at least one template.
    pub fn split_on(&self, marker: &str) -> Vec<Template> {
        let mut parts = vec![Template::default()];
        for segment in &self.segments {
            let is_marker = matches!(segment, Segment::Macro(inv)
                if inv.identifier.eq_ignore_ascii_case(marker)
                    && inv.args.is_empty()
                    && inv.scope.is_none()
                    && !inv.flags.closing_block);
            if is_marker {
                parts.push(Template::default());
            } else if let Some(last) = parts.last_mut() {
                last.push(segment.clone());
            }
        }
        parts
    }
}

/// Flags written directly after `{{`. Purely informational to handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flags {
    /// `!`
    pub immediate: bool,
    /// `?`
    pub delayed: bool,
    /// `~`
    pub reevaluate: bool,
    /// `>`
    pub filter: bool,
    /// `/`
    pub closing_block: bool,
    /// `#`
    pub preserve_whitespace: bool,
    /// Every flag character in source order.
    pub raw: Vec<char>,
}

impl Flags {
    pub fn from_chars(chars: impl IntoIterator<Item = char>) -> Self {
        let mut flags = Flags::default();
        for c in chars {
            match c {
                '!' => flags.immediate = true,
                '?' => flags.delayed = true,
                '~' => flags.reevaluate = true,
                '>' => flags.filter = true,
                '/' => flags.closing_block = true,
                '#' => flags.preserve_whitespace = true,
                _ => {}
            }
            flags.raw.push(c);
        }
        flags
    }
}

/// One argument between separators.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    /// Key when written as `key=value`.
    pub name: Option<String>,
    /// The value (after `=` for keyed arguments).
    pub value: Template,
    /// The whole argument as written, used when the key is not a declared
    /// named argument and the argument counts as unnamed instead.
    pub source: Template,
}

/// A `| name::args` step applied to an invocation's result.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterInvocation {
    pub name: String,
    pub args: Vec<Template>,
    /// Flag characters written after the pipe. Filters reject them.
    pub flags: Vec<char>,
    pub offset: usize,
}

/// Content between an opening invocation and its `{{/name}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedBlock {
    /// The enclosed content, untrimmed.
    pub content: Template,
    /// The closing tag as written.
    pub closing: String,
}

/// A parsed `{{...}}` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroInvocation {
    pub identifier: String,
    pub flags: Flags,
    pub args: Vec<Argument>,
    pub filters: Vec<FilterInvocation>,
    pub scope: Option<ScopedBlock>,
    /// Absolute offset of the opening `{{` in the top-level content.
    pub offset: usize,
    /// The opening invocation as written, with nested invocations kept as
    /// nodes so a literal fallback still resolves them.
    pub literal: Template,
}

impl MacroInvocation {
    pub fn is_scoped(&self) -> bool {
        self.scope.is_some()
    }

    /// Source text of the invocation, including a paired scoped block.
    pub fn source(&self) -> String {
        let mut out = self.literal.source();
        if let Some(scope) = &self.scope {
            out.push_str(&scope.content.source());
            out.push_str(&scope.closing);
        }
        out
    }
}

/// Which variable namespace a shorthand addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarScope {
    /// `.name`
    Local,
    /// `$name`
    Global,
}

/// A parsed variable shorthand expression.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableExpr {
    pub scope: VarScope,
    pub name: String,
    pub op: Option<VarOp>,
    /// Right-hand expression, left unresolved until the operator needs it.
    pub operand: Option<Template>,
    pub flags: Flags,
    pub filters: Vec<FilterInvocation>,
    pub offset: usize,
    pub literal: Template,
}
