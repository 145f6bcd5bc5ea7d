//! Resolution of parsed templates for one evaluation.
//!
//! Ordinary macros resolve their arguments depth-first before the handler
//! runs. Macros with delayed argument resolution receive the argument
//! templates and resolve only what they choose. Anything that cannot run
//! (unknown name, bad arity, failed strict type check, handler error, bad
//! filter) falls back to its literal source with nested invocations still
//! resolved.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use strsim::levenshtein;
use tracing::{debug, error, warn};

use crate::interpreter::call::{ArgValue, MacroCall};
use crate::interpreter::engine::MacroEngine;
use crate::interpreter::env::Environment;
use crate::interpreter::error::EvalWarning;
use crate::interpreter::registry::{ArgSpec, MacroDefinition};
use crate::parser::{
    FilterInvocation, MacroInvocation, Segment, Template, parse_template_at, trim_block,
};

/// Per-evaluation resolver state.
pub(crate) struct Resolver<'a> {
    engine: &'a MacroEngine,
    env: &'a Environment,
    depth: Cell<usize>,
    diagnostics: RefCell<Vec<EvalWarning>>,
    /// Last output of each resolved node by address. The node is kept alive
    /// so its address stays unique for the evaluation.
    resolved: RefCell<HashMap<*const (), (Segment, String)>>,
}

/// Decrements the nesting depth when dropped.
pub(crate) struct DepthGuard<'r> {
    depth: &'r Cell<usize>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

fn node_key(segment: &Segment) -> Option<*const ()> {
    match segment {
        Segment::Text(_) => None,
        Segment::Macro(node) => Some(Rc::as_ptr(node).cast()),
        Segment::Variable(node) => Some(Rc::as_ptr(node).cast()),
    }
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(engine: &'a MacroEngine, env: &'a Environment) -> Self {
        Self {
            engine,
            env,
            depth: Cell::new(0),
            diagnostics: RefCell::new(Vec::new()),
            resolved: RefCell::new(HashMap::new()),
        }
    }

    pub(crate) fn env(&self) -> &'a Environment {
        self.env
    }

    pub(crate) fn trims_scoped_content(&self) -> bool {
        self.engine.trim_scoped_content()
    }

    pub(crate) fn into_diagnostics(self) -> Vec<EvalWarning> {
        self.diagnostics.into_inner()
    }

    /// Log a warning and record it once.
    pub(crate) fn warn(&self, warning: EvalWarning) {
        match &warning {
            EvalWarning::Lex(_) => debug!("{warning}"),
            EvalWarning::HandlerFailed { .. } | EvalWarning::FilterFailed { .. } => {
                error!("{warning}");
            }
            _ => warn!("{warning}"),
        }
        let mut diagnostics = self.diagnostics.borrow_mut();
        if !diagnostics.contains(&warning) {
            diagnostics.push(warning);
        }
    }

    pub(crate) fn enter(&self, name: &str) -> Option<DepthGuard<'_>> {
        let depth = self.depth.get();
        let max_depth = self.engine.max_depth();
        if depth >= max_depth {
            self.warn(EvalWarning::MaxDepthExceeded {
                name: name.to_string(),
                depth: max_depth,
            });
            return None;
        }
        self.depth.set(depth + 1);
        Some(DepthGuard { depth: &self.depth })
    }

    /// Parse `text` as if it began at `base` and resolve it.
    pub(crate) fn evaluate_text(&self, text: &str, base: usize) -> String {
        let parsed = parse_template_at(text, base);
        for error in parsed.lex_errors {
            self.warn(error.into());
        }
        for warning in parsed.warnings {
            self.warn(warning.into());
        }
        self.resolve(&parsed.template)
    }

    pub(crate) fn resolve(&self, template: &Template) -> String {
        template
            .segments
            .iter()
            .map(|segment| self.resolve_segment(segment))
            .collect()
    }

    fn resolve_segment(&self, segment: &Segment) -> String {
        let output = match segment {
            Segment::Text(text) => return text.clone(),
            Segment::Macro(invocation) => self.resolve_invocation(invocation),
            Segment::Variable(expr) => self.resolve_variable(expr),
        };
        if let Some(key) = node_key(segment) {
            self.resolved
                .borrow_mut()
                .insert(key, (segment.clone(), output.clone()));
        }
        output
    }

    /// Resolve literal source, reusing the output of nodes that already ran
    /// so their side effects do not repeat.
    pub(crate) fn resolve_literal(&self, template: &Template) -> String {
        template
            .segments
            .iter()
            .map(|segment| {
                let cached = node_key(segment).and_then(|key| {
                    self.resolved
                        .borrow()
                        .get(&key)
                        .map(|(_, output)| output.clone())
                });
                cached.unwrap_or_else(|| self.resolve_segment(segment))
            })
            .collect()
    }

    fn fallback(&self, invocation: &MacroInvocation) -> String {
        let mut out = self.resolve_literal(&invocation.literal);
        if let Some(scope) = &invocation.scope {
            out.push_str(&self.resolve_literal(&scope.content));
            out.push_str(&scope.closing);
        }
        out
    }

    /// Dynamic macros first, then the registry.
    pub(crate) fn lookup(&self, name: &str) -> Option<Arc<MacroDefinition>> {
        match self.env.dynamic_macro(name) {
            Some(dynamic) => Some(dynamic.definition(name)),
            None => self.engine.registry().get(name),
        }
    }

    fn suggestions(&self, name: &str) -> Vec<String> {
        let name = name.to_lowercase();
        let max_distance = if name.len() <= 3 { 1 } else { 2 };
        let mut candidates = self.engine.registry().names();
        candidates.extend(self.env.dynamic_macros.keys().cloned());
        let mut suggestions: Vec<(usize, String)> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let distance = levenshtein(&name, &candidate);
                (distance > 0 && distance <= max_distance).then_some((distance, candidate))
            })
            .collect();
        suggestions.sort();
        suggestions.into_iter().take(3).map(|(_, s)| s).collect()
    }

    fn resolve_invocation(&self, invocation: &MacroInvocation) -> String {
        let Some(_guard) = self.enter(&invocation.identifier) else {
            return invocation.source();
        };
        if invocation.flags.closing_block {
            debug!(name = %invocation.identifier, "unmatched closing tag left as text");
            return self.fallback(invocation);
        }
        let Some(definition) = self.lookup(&invocation.identifier) else {
            let suggestions = self.suggestions(&invocation.identifier);
            debug!(name = %invocation.identifier, ?suggestions, "unknown macro left as text");
            return self.fallback(invocation);
        };
        self.invoke(invocation, &definition)
            .unwrap_or_else(|| self.fallback(invocation))
    }

    /// Run a known macro. `None` means the invocation stays literal.
    fn invoke(&self, invocation: &MacroInvocation, definition: &MacroDefinition) -> Option<String> {
        let name = &invocation.identifier;
        let mut unnamed: Vec<Template> = Vec::new();
        let mut named: Vec<(String, Template)> = Vec::new();
        for arg in &invocation.args {
            match arg.name.as_deref().and_then(|key| definition.named_spec(key)) {
                Some(spec) => named.push((spec.name.clone(), arg.value.clone())),
                None => unnamed.push(arg.source.clone()),
            }
        }

        let (min, max) = definition.arity();
        if let Some(scope) = &invocation.scope {
            if max.is_some_and(|max| unnamed.len() >= max) {
                self.warn(EvalWarning::ScopedArgumentRejected { name: name.clone() });
                return None;
            }
            let trim = self.engine.trim_scoped_content() && !invocation.flags.preserve_whitespace;
            unnamed.push(if trim {
                trim_block(&scope.content)
            } else {
                scope.content.clone()
            });
        }
        if unnamed.len() < min || max.is_some_and(|max| unnamed.len() > max) {
            self.warn(EvalWarning::ArgumentCount {
                name: name.clone(),
                expected: definition.arity_label(),
                got: unnamed.len(),
            });
            return None;
        }
        for spec in definition.unnamed_args.iter().skip(unnamed.len()) {
            let Some(default) = &spec.default_value else {
                break;
            };
            unnamed.push(Template::from_text(default.clone()));
        }
        for spec in &definition.named_args {
            if named.iter().any(|(key, _)| *key == spec.name) {
                continue;
            }
            if let Some(default) = &spec.default_value {
                named.push((spec.name.clone(), Template::from_text(default.clone())));
            } else if !spec.optional {
                self.warn(EvalWarning::MissingNamedArgument {
                    name: name.clone(),
                    arg: spec.name.clone(),
                });
                return None;
            }
        }
        if !self.check_filters(name, &invocation.filters) {
            return None;
        }

        let (args, named) = if definition.delay_arg_resolution {
            (
                unnamed.into_iter().map(ArgValue::Deferred).collect(),
                named
                    .into_iter()
                    .map(|(key, value)| (key, ArgValue::Deferred(value)))
                    .collect(),
            )
        } else {
            let args: Vec<String> = unnamed.iter().map(|t| self.resolve(t)).collect();
            let named: Vec<(String, String)> = named
                .iter()
                .map(|(key, value)| (key.clone(), self.resolve(value)))
                .collect();
            if !self.check_types(name, definition, &args, &named) {
                return None;
            }
            (
                args.into_iter().map(ArgValue::Resolved).collect(),
                named
                    .into_iter()
                    .map(|(key, value)| (key, ArgValue::Resolved(value)))
                    .collect(),
            )
        };

        let call = MacroCall::new(self, invocation, definition, args, named);
        let output = match (definition.handler)(&call) {
            Ok(output) => output,
            Err(error) => {
                self.warn(EvalWarning::HandlerFailed {
                    name: name.clone(),
                    message: error.to_string(),
                });
                return None;
            }
        };
        self.apply_filters(name, &invocation.filters, output)
    }

    /// Warn about every argument that fails its type. Returns `false` when a
    /// strict definition must not run.
    fn check_types(
        &self,
        name: &str,
        definition: &MacroDefinition,
        args: &[String],
        named: &[(String, String)],
    ) -> bool {
        let positional = definition.unnamed_args.iter().zip(args);
        let keyed = named.iter().filter_map(|(key, value)| {
            definition
                .named_spec(key)
                .map(|spec: &ArgSpec| (spec, value))
        });
        let mut runnable = true;
        for (spec, value) in positional.chain(keyed) {
            if spec.arg_type.accepts(value) {
                continue;
            }
            self.warn(EvalWarning::ArgumentType {
                name: name.to_string(),
                arg: spec.name.clone(),
                expected: spec.arg_type,
                value: value.clone(),
                strict: definition.strict_args,
            });
            runnable &= !definition.strict_args;
        }
        runnable
    }

    /// Reject unknown filters and filters written with flags before anything
    /// runs.
    pub(crate) fn check_filters(&self, name: &str, filters: &[FilterInvocation]) -> bool {
        for filter in filters {
            if !filter.flags.is_empty() {
                self.warn(EvalWarning::FilterFlags {
                    name: name.to_string(),
                    filter: filter.name.clone(),
                    flags: filter.flags.iter().collect(),
                });
                return false;
            }
            if !self.engine.filters().has_filter(&filter.name) {
                self.warn(EvalWarning::UnknownFilter {
                    name: name.to_string(),
                    filter: filter.name.clone(),
                });
                return false;
            }
        }
        true
    }

    /// Apply filters left to right. `None` when one fails.
    pub(crate) fn apply_filters(
        &self,
        name: &str,
        filters: &[FilterInvocation],
        value: String,
    ) -> Option<String> {
        let mut value = value;
        for filter in filters {
            let Some(apply) = self.engine.filters().get(&filter.name) else {
                self.warn(EvalWarning::UnknownFilter {
                    name: name.to_string(),
                    filter: filter.name.clone(),
                });
                return None;
            };
            let args: Vec<String> = filter.args.iter().map(|arg| self.resolve(arg)).collect();
            match apply(&value, &args) {
                Ok(next) => value = next,
                Err(error) => {
                    self.warn(EvalWarning::FilterFailed {
                        name: name.to_string(),
                        filter: filter.name.clone(),
                        message: error.to_string(),
                    });
                    return None;
                }
            }
        }
        Some(value)
    }
}
