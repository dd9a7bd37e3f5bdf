//! Executor registry - name-to-executor resolution
//!
//! Maps executor type names (as written in rule actions) to their
//! [`TaskExecutor`] implementations, enabling configuration-driven task
//! construction. Lookups are case-insensitive: `Jenkins` and `jenkins`
//! resolve to the same executor.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{http, jenkins, shell, telegram, TaskExecutor};

/// Registry of task executors keyed by lower-cased name.
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn TaskExecutor>>,
}

impl ExecutorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    /// Register an executor under its own name.
    ///
    /// A later registration with the same name replaces the earlier one.
    pub fn register(&mut self, executor: Arc<dyn TaskExecutor>) {
        self.executors
            .insert(executor.name().to_lowercase(), executor);
    }

    /// Resolve an executor by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<Arc<dyn TaskExecutor>> {
        self.executors.get(&name.to_lowercase()).cloned()
    }

    /// Check whether an executor is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.executors.contains_key(&name.to_lowercase())
    }

    /// Registered executor names, sorted.
    pub fn available(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.executors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered executors.
    pub fn len(&self) -> usize {
        self.executors.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with all bundled executors registered.
pub fn default_registry() -> ExecutorRegistry {
    let mut registry = ExecutorRegistry::new();
    registry.register(Arc::new(shell::ShellExecutor::new()));
    registry.register(Arc::new(http::HttpExecutor::new()));
    registry.register(Arc::new(jenkins::JenkinsExecutor::new()));
    registry.register(Arc::new(telegram::TelegramExecutor::new()));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_bundled_executors() {
        let registry = default_registry();
        assert_eq!(
            registry.available(),
            vec!["http", "jenkins", "shell", "telegram"]
        );
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = default_registry();
        assert!(registry.get("Jenkins").is_some());
        assert!(registry.get("SHELL").is_some());
        assert!(registry.contains("Telegram"));
    }

    #[test]
    fn unknown_executor_is_absent() {
        let registry = ExecutorRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("shell").is_none());
    }
}
