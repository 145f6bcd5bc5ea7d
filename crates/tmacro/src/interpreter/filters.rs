//! Filter registry for `| name::args` post-processing steps.

use std::collections::HashMap;
use std::sync::Arc;

use crate::interpreter::error::MacroError;

/// Filter function signature.
///
/// Takes the running value and the filter's resolved arguments, and returns
/// the new value.
pub type FilterFn = Arc<dyn Fn(&str, &[String]) -> Result<String, MacroError> + Send + Sync>;

/// Registered filters, looked up case-insensitively.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, FilterFn>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter, replacing any previous one of the same name.
    pub fn register<F>(&mut self, name: &str, filter: F)
    where
        F: Fn(&str, &[String]) -> Result<String, MacroError> + Send + Sync + 'static,
    {
        self.filters.insert(name.to_lowercase(), Arc::new(filter));
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.filters.remove(&name.to_lowercase()).is_some()
    }

    pub fn get(&self, name: &str) -> Option<FilterFn> {
        self.filters.get(&name.to_lowercase()).cloned()
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.filters.contains_key(&name.to_lowercase())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.filters.keys().cloned().collect();
        names.sort();
        names
    }
}
