//! Variable stores for the local and global namespaces.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::parser::VarScope;

/// Storage behind `{{setvar}}`, `{{getvar}}` and the `.name`/`$name`
/// shorthand. The engine reads and writes through this trait and never
/// persists anything itself.
pub trait VariableStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String);

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove a variable, returning whether it existed.
    fn delete(&self, key: &str) -> bool;

    /// Read-modify-write as one step.
    ///
    /// `f` receives the current value and returns the value to store, or
    /// `None` to leave the variable untouched. Returns what was stored.
    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&str>) -> Option<String>,
    ) -> Option<String>;
}

/// In-memory store. `update` holds the write lock for the whole step, so
/// concurrent increments never lose updates.
#[derive(Debug, Default)]
pub struct MemoryVariableStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryVariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: RwLock::new(values),
        }
    }

    /// Copy of all variables, ordered by name.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl VariableStore for MemoryVariableStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value);
    }

    fn has(&self, key: &str) -> bool {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.contains_key(key)
    }

    fn delete(&self, key: &str) -> bool {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.remove(key).is_some()
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&str>) -> Option<String>,
    ) -> Option<String> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        let next = f(values.get(key).map(String::as_str))?;
        values.insert(key.to_string(), next.clone());
        Some(next)
    }
}

/// The two variable namespaces visible to one evaluation.
#[derive(Clone)]
pub struct Variables {
    pub local: Arc<dyn VariableStore>,
    pub global: Arc<dyn VariableStore>,
}

impl Variables {
    pub fn new(local: Arc<dyn VariableStore>, global: Arc<dyn VariableStore>) -> Self {
        Self { local, global }
    }

    pub fn scope(&self, scope: VarScope) -> &dyn VariableStore {
        match scope {
            VarScope::Local => self.local.as_ref(),
            VarScope::Global => self.global.as_ref(),
        }
    }
}

impl Default for Variables {
    fn default() -> Self {
        Self::new(
            Arc::new(MemoryVariableStore::new()),
            Arc::new(MemoryVariableStore::new()),
        )
    }
}

impl fmt::Debug for Variables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variables").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn update_none_leaves_value() {
        let store = MemoryVariableStore::with_values([("x", "1")]);
        assert_eq!(store.update("x", &mut |_| None), None);
        assert_eq!(store.get("x").as_deref(), Some("1"));
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let store = Arc::new(MemoryVariableStore::new());
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..100 {
                        store.update("n", &mut |current| {
                            let n: i64 = current.and_then(|v| v.parse().ok()).unwrap_or(0);
                            Some((n + 1).to_string())
                        });
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(store.get("n").as_deref(), Some("800"));
    }
}
