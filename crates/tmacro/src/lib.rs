//! `{{...}}` macro expansion.
//!
//! Text is lexed into tokens, grouped into a template of text and invocation
//! nodes, then resolved against an [`Environment`] by a [`MacroEngine`].
//! Malformed or unknown macros never fail an evaluation; they stay in the
//! output as written.

pub mod interpreter;
pub mod parser;

pub use interpreter::{
    ArgSpec, ArgType, ArgValue, Character, DynamicMacro, EnvBuilder, EnvDefaults, EnvError,
    Environment, EvalWarning, Evaluation, ListBounds, MacroCall, MacroDefinition, MacroEngine,
    MacroError, MacroHandler, MemoryVariableStore, ProcessorOptions, ProviderOrder, RawEnv,
    VariableStore, Variables, macro_handler, processor,
};
pub use parser::{Template, parse_template, tokenize};
