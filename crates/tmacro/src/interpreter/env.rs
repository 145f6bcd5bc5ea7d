//! Per-evaluation environment and the builder that assembles it.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use bon::Builder;
use const_fnv1a_hash::fnv1a_hash_str_64;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::interpreter::error::EnvError;
use crate::interpreter::registry::{MacroDefinition, MacroHandler, macro_handler};
use crate::interpreter::variables::Variables;

/// A character card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(on(String, into))]
#[serde(default)]
pub struct Character {
    #[builder(default)]
    pub name: String,
    #[builder(default)]
    pub description: String,
    #[builder(default)]
    pub personality: String,
    #[builder(default)]
    pub scenario: String,
    #[builder(default)]
    pub first_message: String,
    #[builder(default)]
    pub mes_examples: String,
    #[builder(default)]
    pub creator_notes: String,
}

/// Display names for the current conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Names {
    pub user: String,
    pub char: String,
    pub group: String,
}

/// A macro supplied for one evaluation only, overriding the registry.
#[derive(Clone)]
pub enum DynamicMacro {
    /// Constant text. Takes no arguments.
    Text(String),
    /// A handler that takes no arguments.
    Handler(MacroHandler),
    /// A full definition with its own argument specs.
    Definition(Arc<MacroDefinition>),
}

impl DynamicMacro {
    /// The definition to resolve this macro with.
    pub fn definition(&self, name: &str) -> Arc<MacroDefinition> {
        match self {
            DynamicMacro::Text(text) => {
                let text = text.clone();
                Arc::new(
                    MacroDefinition::builder()
                        .name(name)
                        .handler(macro_handler(move |_| Ok(text.clone())))
                        .build(),
                )
            }
            DynamicMacro::Handler(handler) => Arc::new(
                MacroDefinition::builder()
                    .name(name)
                    .handler(Arc::clone(handler))
                    .build(),
            ),
            DynamicMacro::Definition(definition) => Arc::clone(definition),
        }
    }
}

impl From<&str> for DynamicMacro {
    fn from(text: &str) -> Self {
        DynamicMacro::Text(text.to_string())
    }
}

impl From<String> for DynamicMacro {
    fn from(text: String) -> Self {
        DynamicMacro::Text(text)
    }
}

impl From<MacroDefinition> for DynamicMacro {
    fn from(definition: MacroDefinition) -> Self {
        DynamicMacro::Definition(Arc::new(definition))
    }
}

impl fmt::Debug for DynamicMacro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicMacro::Text(text) => f.debug_tuple("Text").field(text).finish(),
            DynamicMacro::Handler(_) => f.write_str("Handler"),
            DynamicMacro::Definition(definition) => {
                f.debug_tuple("Definition").field(&definition.name).finish()
            }
        }
    }
}

/// Caller-supplied inputs for one evaluation.
#[derive(Debug, Builder)]
pub struct RawEnv {
    /// The top-level content being evaluated.
    #[builder(into)]
    pub content: String,
    #[builder(into)]
    pub name1_override: Option<String>,
    #[builder(into)]
    pub name2_override: Option<String>,
    #[builder(into)]
    pub group_override: Option<String>,
    /// Expose the ambient character card to macros.
    #[builder(default)]
    pub replace_character_card: bool,
    #[builder(default)]
    pub dynamic_macros: HashMap<String, DynamicMacro>,
    /// Returned once by `{{original}}`, then empty.
    #[builder(into)]
    pub original: Option<String>,
}

/// The context one evaluation reads from.
///
/// Everything is fixed for the evaluation except the variable stores and
/// the one-shot `original` value.
#[derive(Debug)]
pub struct Environment {
    pub content: String,
    pub content_hash: u64,
    pub names: Names,
    pub character: Option<Character>,
    pub variables: Variables,
    /// Keys are lowercased.
    pub dynamic_macros: HashMap<String, DynamicMacro>,
    pub system: BTreeMap<String, String>,
    pub extra: Map<String, Value>,
    original: RefCell<Option<String>>,
}

impl Environment {
    /// The `original` value the first time, then an empty string.
    pub fn take_original(&self) -> String {
        self.original.borrow_mut().take().unwrap_or_default()
    }

    pub fn dynamic_macro(&self, name: &str) -> Option<&DynamicMacro> {
        self.dynamic_macros.get(&name.to_lowercase())
    }
}

/// Values used when a [`RawEnv`] does not override them.
#[derive(Debug, Clone, Builder)]
pub struct EnvDefaults {
    #[builder(into, default = "User".to_string())]
    pub user: String,
    #[builder(into, default = "Character".to_string())]
    pub char: String,
    #[builder(into)]
    pub group: Option<String>,
    pub character: Option<Character>,
    #[builder(default)]
    pub variables: Variables,
}

impl Default for EnvDefaults {
    fn default() -> Self {
        EnvDefaults::builder().build()
    }
}

/// Bucket a provider runs in. Buckets run in declaration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProviderOrder {
    Early,
    #[default]
    Normal,
    Late,
}

/// Enriches [`Environment::extra`]. Sees the environment as built so far.
pub type EnvProvider =
    Arc<dyn Fn(&Environment) -> Result<Map<String, Value>, EnvError> + Send + Sync>;

#[derive(Clone)]
struct ProviderEntry {
    order: ProviderOrder,
    seq: usize,
    source: String,
    provider: EnvProvider,
}

/// Builds an [`Environment`] from a [`RawEnv`].
#[derive(Clone, Default)]
pub struct EnvBuilder {
    defaults: EnvDefaults,
    providers: Vec<ProviderEntry>,
    next_seq: usize,
}

impl EnvBuilder {
    pub fn new(defaults: EnvDefaults) -> Self {
        Self {
            defaults,
            providers: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn defaults(&self) -> &EnvDefaults {
        &self.defaults
    }

    /// Register a provider. Within a bucket providers run in the order they
    /// were added.
    pub fn add_provider<F>(&mut self, order: ProviderOrder, source: &str, provider: F)
    where
        F: Fn(&Environment) -> Result<Map<String, Value>, EnvError> + Send + Sync + 'static,
    {
        self.providers.push(ProviderEntry {
            order,
            seq: self.next_seq,
            source: source.to_string(),
            provider: Arc::new(provider),
        });
        self.next_seq += 1;
        self.providers.sort_by_key(|entry| (entry.order, entry.seq));
    }

    pub fn build(&self, raw: RawEnv) -> Environment {
        let user = raw
            .name1_override
            .unwrap_or_else(|| self.defaults.user.clone());
        let char = raw
            .name2_override
            .unwrap_or_else(|| self.defaults.char.clone());
        let group = raw
            .group_override
            .or_else(|| self.defaults.group.clone())
            .unwrap_or_else(|| char.clone());
        let character = if raw.replace_character_card {
            self.defaults.character.clone()
        } else {
            None
        };
        let dynamic_macros = raw
            .dynamic_macros
            .into_iter()
            .map(|(name, value)| (name.to_lowercase(), value))
            .collect();
        let mut system = BTreeMap::new();
        system.insert(
            "version".to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );

        let mut env = Environment {
            content_hash: fnv1a_hash_str_64(&raw.content),
            content: raw.content,
            names: Names { user, char, group },
            character,
            variables: self.defaults.variables.clone(),
            dynamic_macros,
            system,
            extra: Map::new(),
            original: RefCell::new(raw.original),
        };

        for entry in &self.providers {
            match (entry.provider)(&env) {
                Ok(values) => {
                    debug!(source = %entry.source, keys = values.len(), "environment provider ran");
                    env.extra.extend(values);
                }
                Err(error) => {
                    warn!(source = %entry.source, %error, "environment provider failed");
                }
            }
        }
        env
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn group_falls_back_to_char() {
        let builder = EnvBuilder::default();
        let env = builder.build(RawEnv::builder().content("").name2_override("Alice").build());
        assert_eq!(env.names.user, "User");
        assert_eq!(env.names.group, "Alice");
    }

    #[test]
    fn original_is_one_shot() {
        let env = EnvBuilder::default().build(RawEnv::builder().content("").original("first").build());
        assert_eq!(env.take_original(), "first");
        assert_eq!(env.take_original(), "");
    }

    #[test]
    fn late_provider_sees_earlier_output() {
        let mut builder = EnvBuilder::default();
        builder.add_provider(ProviderOrder::Late, "late", |env| {
            let seen = env.extra.get("stage").cloned().unwrap_or(Value::Null);
            Ok([("seen".to_string(), seen)].into_iter().collect())
        });
        builder.add_provider(ProviderOrder::Early, "early", |_| {
            Ok([("stage".to_string(), json!("early"))].into_iter().collect())
        });
        let env = builder.build(RawEnv::builder().content("").build());
        assert_eq!(env.extra.get("seen"), Some(&json!("early")));
    }
}
