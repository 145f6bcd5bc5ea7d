//! The view of one invocation that a macro handler receives.

use crate::interpreter::env::Environment;
use crate::interpreter::registry::MacroDefinition;
use crate::interpreter::resolver::Resolver;
use crate::parser::{Flags, MacroInvocation, Template};

/// An argument as passed to a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Already resolved, for ordinary macros.
    Resolved(String),
    /// Left unresolved, for macros with delayed argument resolution.
    Deferred(Template),
}

impl ArgValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ArgValue::Resolved(text) => Some(text),
            ArgValue::Deferred(_) => None,
        }
    }

    pub fn template(&self) -> Option<&Template> {
        match self {
            ArgValue::Deferred(template) => Some(template),
            ArgValue::Resolved(_) => None,
        }
    }
}

/// One invocation of a macro, with its arguments and a handle back into the
/// resolver.
///
/// Unnamed arguments include list arguments and, for scoped invocations, the
/// scoped content as the last one.
pub struct MacroCall<'r> {
    resolver: &'r Resolver<'r>,
    invocation: &'r MacroInvocation,
    definition: &'r MacroDefinition,
    args: Vec<ArgValue>,
    named: Vec<(String, ArgValue)>,
}

impl<'r> MacroCall<'r> {
    pub(crate) fn new(
        resolver: &'r Resolver<'r>,
        invocation: &'r MacroInvocation,
        definition: &'r MacroDefinition,
        args: Vec<ArgValue>,
        named: Vec<(String, ArgValue)>,
    ) -> Self {
        Self {
            resolver,
            invocation,
            definition,
            args,
            named,
        }
    }

    /// The macro name as written.
    pub fn name(&self) -> &str {
        &self.invocation.identifier
    }

    pub fn definition(&self) -> &MacroDefinition {
        self.definition
    }

    pub fn env(&self) -> &Environment {
        self.resolver.env()
    }

    pub fn flags(&self) -> &Flags {
        &self.invocation.flags
    }

    /// Absolute offset of this invocation's `{{` in the top-level content.
    pub fn offset(&self) -> usize {
        self.invocation.offset
    }

    pub fn is_scoped(&self) -> bool {
        self.invocation.is_scoped()
    }

    /// Whether block content of this call should be trimmed and dedented.
    pub fn trims_content(&self) -> bool {
        self.is_scoped()
            && self.resolver.trims_scoped_content()
            && !self.invocation.flags.preserve_whitespace
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// A resolved unnamed argument. `None` when missing or deferred.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(ArgValue::as_text)
    }

    /// All resolved unnamed arguments.
    pub fn args(&self) -> Vec<&str> {
        self.args.iter().filter_map(ArgValue::as_text).collect()
    }

    /// Arguments past the declared unnamed ones.
    pub fn list(&self) -> &[ArgValue] {
        let declared = self.definition.unnamed_args.len().min(self.args.len());
        &self.args[declared..]
    }

    pub fn raw_arg(&self, index: usize) -> Option<&ArgValue> {
        self.args.get(index)
    }

    /// An unnamed argument, resolving it first if it was deferred.
    pub fn resolve_arg(&self, index: usize) -> Option<String> {
        self.args.get(index).map(|arg| self.resolve_value(arg))
    }

    pub fn named(&self, name: &str) -> Option<&str> {
        self.named_value(name).and_then(ArgValue::as_text)
    }

    pub fn resolve_named(&self, name: &str) -> Option<String> {
        self.named_value(name).map(|arg| self.resolve_value(arg))
    }

    fn named_value(&self, name: &str) -> Option<&ArgValue> {
        self.named
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    fn resolve_value(&self, arg: &ArgValue) -> String {
        match arg {
            ArgValue::Resolved(text) => text.clone(),
            ArgValue::Deferred(template) => self.resolve(template),
        }
    }

    /// Resolve a template. Nested invocations keep their own absolute
    /// offsets, so the result matches resolving them in place.
    pub fn resolve(&self, template: &Template) -> String {
        self.resolver.resolve(template)
    }

    /// Evaluate fresh text as if it were written at this invocation's
    /// offset.
    pub fn evaluate_text(&self, text: &str) -> String {
        self.resolver.evaluate_text(text, self.offset())
    }

    /// Whether `name` resolves to a registered or dynamic macro.
    pub fn has_macro(&self, name: &str) -> bool {
        self.resolver.lookup(name).is_some()
    }
}
