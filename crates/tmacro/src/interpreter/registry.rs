//! Macro registry: definitions keyed by lowercased name.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use bon::Builder;

use crate::interpreter::call::MacroCall;
use crate::interpreter::error::MacroError;
use crate::interpreter::shorthand::parse_number;

/// Handler signature shared by every macro.
pub type MacroHandler = Arc<dyn Fn(&MacroCall<'_>) -> Result<String, MacroError> + Send + Sync>;

/// Wrap a closure as a [`MacroHandler`].
pub fn macro_handler<F>(handler: F) -> MacroHandler
where
    F: Fn(&MacroCall<'_>) -> Result<String, MacroError> + Send + Sync + 'static,
{
    Arc::new(handler)
}

/// Declared type of an argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ArgType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
}

impl ArgType {
    /// Whether `value` is acceptable for this type.
    pub fn accepts(self, value: &str) -> bool {
        let value = value.trim();
        match self {
            ArgType::String => true,
            ArgType::Integer => value.parse::<i64>().is_ok(),
            ArgType::Number => parse_number(value).is_some(),
            ArgType::Boolean => matches!(
                value.to_ascii_lowercase().as_str(),
                "true" | "false" | "1" | "0"
            ),
        }
    }
}

impl Display for ArgType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgType::String => "string",
            ArgType::Integer => "integer",
            ArgType::Number => "number",
            ArgType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// One declared argument.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct ArgSpec {
    #[builder(into)]
    pub name: String,
    #[builder(default)]
    pub arg_type: ArgType,
    #[builder(default)]
    pub optional: bool,
    /// Value used when an optional argument is omitted.
    #[builder(into)]
    pub default_value: Option<String>,
}

impl ArgSpec {
    pub fn required(name: impl Into<String>) -> Self {
        ArgSpec::builder().name(name).build()
    }

    pub fn typed(name: impl Into<String>, arg_type: ArgType) -> Self {
        ArgSpec::builder().name(name).arg_type(arg_type).build()
    }

    pub fn optional(name: impl Into<String>) -> Self {
        ArgSpec::builder().name(name).optional(true).build()
    }
}

/// Bounds on extra arguments accepted after the declared unnamed ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListBounds {
    pub min: usize,
    /// `None` means unbounded.
    pub max: Option<usize>,
}

impl ListBounds {
    pub fn unbounded(min: usize) -> Self {
        Self { min, max: None }
    }
}

/// A registered macro.
///
/// # Example
///
/// ```
/// use tmacro::{ArgSpec, MacroDefinition, macro_handler};
///
/// let shout = MacroDefinition::builder()
///     .name("shout")
///     .unnamed_args(vec![ArgSpec::required("text")])
///     .handler(macro_handler(|call| Ok(call.arg(0).unwrap_or_default().to_uppercase())))
///     .build();
/// assert_eq!(shout.arity(), (1, Some(1)));
/// ```
#[derive(Clone, Builder)]
#[builder(on(String, into))]
pub struct MacroDefinition {
    pub name: String,
    #[builder(default)]
    pub description: String,
    #[builder(default)]
    pub unnamed_args: Vec<ArgSpec>,
    #[builder(default)]
    pub named_args: Vec<ArgSpec>,
    pub list: Option<ListBounds>,
    /// Block the handler when an argument fails its type.
    #[builder(default)]
    pub strict_args: bool,
    /// Pass arguments unresolved; the handler resolves what it needs.
    #[builder(default)]
    pub delay_arg_resolution: bool,
    pub handler: MacroHandler,
}

impl MacroDefinition {
    /// Minimum and maximum count of unnamed plus list arguments.
    pub fn arity(&self) -> (usize, Option<usize>) {
        let required = self.unnamed_args.iter().filter(|spec| !spec.optional).count();
        let declared = self.unnamed_args.len();
        match self.list {
            // List items follow every unnamed slot, so a non-empty list fills the optionals first.
            Some(bounds) if bounds.min > 0 => (
                declared + bounds.min,
                bounds.max.map(|max| declared + max),
            ),
            Some(bounds) => (required, bounds.max.map(|max| declared + max)),
            None => (required, Some(declared)),
        }
    }

    /// Human-readable arity, used in warnings.
    pub fn arity_label(&self) -> String {
        match self.arity() {
            (min, Some(max)) if min == max => min.to_string(),
            (min, Some(max)) => format!("{min} to {max}"),
            (min, None) => format!("at least {min}"),
        }
    }

    pub fn named_spec(&self, name: &str) -> Option<&ArgSpec> {
        self.named_args
            .iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(name))
    }
}

impl fmt::Debug for MacroDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacroDefinition")
            .field("name", &self.name)
            .field("unnamed_args", &self.unnamed_args)
            .field("named_args", &self.named_args)
            .field("list", &self.list)
            .field("strict_args", &self.strict_args)
            .field("delay_arg_resolution", &self.delay_arg_resolution)
            .finish_non_exhaustive()
    }
}

/// Registered macros, looked up case-insensitively.
#[derive(Debug, Default, Clone)]
pub struct MacroRegistry {
    macros: HashMap<String, Arc<MacroDefinition>>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. A previous definition of the same name is
    /// replaced and returned.
    pub fn register(&mut self, definition: MacroDefinition) -> Option<Arc<MacroDefinition>> {
        let key = definition.name.to_lowercase();
        self.macros.insert(key, Arc::new(definition))
    }

    pub fn unregister(&mut self, name: &str) -> Option<Arc<MacroDefinition>> {
        self.macros.remove(&name.to_lowercase())
    }

    pub fn get(&self, name: &str) -> Option<Arc<MacroDefinition>> {
        self.macros.get(&name.to_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(&name.to_lowercase())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.macros.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}
