//! The evaluation entry point.
//!
//! [`MacroEngine`] owns the macro and filter registries and the processor
//! pipelines. One call to [`MacroEngine::evaluate`] runs pre-processors,
//! resolves the content, then runs post-processors.

use std::sync::Arc;

use bon::Builder;
use tracing::debug_span;

use crate::interpreter::builtins;
use crate::interpreter::env::Environment;
use crate::interpreter::error::{EvalWarning, MacroError};
use crate::interpreter::filters::FilterRegistry;
use crate::interpreter::processors::{Processor, ProcessorOptions, ProcessorPipeline};
use crate::interpreter::registry::{MacroDefinition, MacroRegistry};
use crate::interpreter::resolver::Resolver;

/// Output of one evaluation together with the warnings it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub output: String,
    pub diagnostics: Vec<EvalWarning>,
}

/// Macro expansion engine.
///
/// # Example
///
/// ```
/// use tmacro::{EnvBuilder, MacroEngine, RawEnv};
///
/// let engine = MacroEngine::with_builtins();
/// let env = EnvBuilder::default().build(RawEnv::builder().content("Hello, {{user}}!").build());
/// assert_eq!(engine.evaluate("Hello, {{user}}!", &env), "Hello, User!");
/// ```
#[derive(Builder)]
pub struct MacroEngine {
    /// Nesting depth past which invocations are left as written.
    #[builder(default = 64)]
    max_depth: usize,

    /// Trim and dedent scoped block content unless the `#` flag is set.
    #[builder(default = true)]
    trim_scoped_content: bool,

    #[builder(skip)]
    registry: MacroRegistry,

    #[builder(skip)]
    filters: FilterRegistry,

    #[builder(skip)]
    pre_processors: ProcessorPipeline,

    #[builder(skip)]
    post_processors: ProcessorPipeline,
}

impl Default for MacroEngine {
    fn default() -> Self {
        MacroEngine::builder().build()
    }
}

impl MacroEngine {
    /// An engine with no macros, filters or processors.
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine with the built-in macros, filters and post-processor.
    pub fn with_builtins() -> Self {
        let mut engine = Self::new();
        engine.install_builtins();
        engine
    }

    pub fn install_builtins(&mut self) {
        builtins::install(self);
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn trim_scoped_content(&self) -> bool {
        self.trim_scoped_content
    }

    // =========================================================================
    // Registries
    // =========================================================================

    pub fn registry(&self) -> &MacroRegistry {
        &self.registry
    }

    /// Register a macro. Replaces and returns any macro of the same name.
    pub fn register_macro(&mut self, definition: MacroDefinition) -> Option<Arc<MacroDefinition>> {
        self.registry.register(definition)
    }

    pub fn unregister_macro(&mut self, name: &str) -> Option<Arc<MacroDefinition>> {
        self.registry.unregister(name)
    }

    pub fn get_macro(&self, name: &str) -> Option<Arc<MacroDefinition>> {
        self.registry.get(name)
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn register_filter<F>(&mut self, name: &str, filter: F)
    where
        F: Fn(&str, &[String]) -> Result<String, MacroError> + Send + Sync + 'static,
    {
        self.filters.register(name, filter);
    }

    pub fn unregister_filter(&mut self, name: &str) -> bool {
        self.filters.unregister(name)
    }

    // =========================================================================
    // Processors
    // =========================================================================

    pub fn add_pre_processor(&mut self, processor: Processor, options: ProcessorOptions) {
        self.pre_processors.add(processor, options);
    }

    pub fn add_post_processor(&mut self, processor: Processor, options: ProcessorOptions) {
        self.post_processors.add(processor, options);
    }

    /// Remove a pre-processor by handle identity.
    pub fn remove_pre_processor(&mut self, processor: &Processor) -> bool {
        self.pre_processors.remove(processor)
    }

    /// Remove a post-processor by handle identity.
    pub fn remove_post_processor(&mut self, processor: &Processor) -> bool {
        self.post_processors.remove(processor)
    }

    pub fn pre_processors(&self) -> &ProcessorPipeline {
        &self.pre_processors
    }

    pub fn post_processors(&self) -> &ProcessorPipeline {
        &self.post_processors
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Expand every macro in `content`. Never fails; problems are logged and
    /// the affected invocations stay as written.
    pub fn evaluate(&self, content: &str, env: &Environment) -> String {
        self.evaluate_with_diagnostics(content, env).output
    }

    /// Like [`MacroEngine::evaluate`], also returning the warnings raised.
    pub fn evaluate_with_diagnostics(&self, content: &str, env: &Environment) -> Evaluation {
        let _span = debug_span!("evaluate", len = content.len()).entered();
        let input = self.pre_processors.run(content, env);
        let resolver = Resolver::new(self, env);
        let resolved = resolver.evaluate_text(&input, 0);
        let diagnostics = resolver.into_diagnostics();
        Evaluation {
            output: self.post_processors.run(&resolved, env),
            diagnostics,
        }
    }
}
