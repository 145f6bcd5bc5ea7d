//! Macro interpreter.
//!
//! This module resolves parsed templates against an [`Environment`]: macro
//! lookup, argument checking, eager and delayed resolution, variable
//! shorthand, filters and the processor pipelines around them.

mod builtins;
mod call;
mod engine;
mod env;
mod error;
mod filters;
mod processors;
mod registry;
mod resolver;
mod shorthand;
mod variables;

pub use builtins::unescape_braces;
pub use call::{ArgValue, MacroCall};
pub use engine::{Evaluation, MacroEngine};
pub use env::{
    Character, DynamicMacro, EnvBuilder, EnvDefaults, EnvProvider, Environment, Names,
    ProviderOrder, RawEnv,
};
pub use error::{EnvError, EvalWarning, MacroError};
pub use filters::{FilterFn, FilterRegistry};
pub use processors::{Processor, ProcessorOptions, ProcessorPipeline, processor};
pub use registry::{
    ArgSpec, ArgType, ListBounds, MacroDefinition, MacroHandler, MacroRegistry, macro_handler,
};
pub use shorthand::{format_number, is_truthy, parse_number};
pub use variables::{MemoryVariableStore, VariableStore, Variables};
