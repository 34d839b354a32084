//! ActionRegistry - name-to-action lookup shared by the scheduler and
//! execution engine

use std::collections::HashMap;
use std::sync::Arc;

use super::Action;
use super::builtin::{AddAction, FetchAction, ReadFileAction, SleepAction, SubAction, WriteFileAction};

/// Maps action names to callables
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    /// Create a registry with the standard builtin actions
    pub fn standard() -> Self {
        let mut registry = Self::empty();

        // Arithmetic payloads
        registry.register(Arc::new(AddAction));
        registry.register(Arc::new(SubAction));

        // Timing payload
        registry.register(Arc::new(SleepAction));

        // File system payloads
        registry.register(Arc::new(ReadFileAction));
        registry.register(Arc::new(WriteFileAction));

        // HTTP payload
        registry.register(Arc::new(FetchAction::new()));

        registry
    }

    /// Create an empty registry (for testing)
    pub fn empty() -> Self {
        Self { actions: HashMap::new() }
    }

    /// Add an action to the registry
    pub fn register(&mut self, action: Arc<dyn Action>) {
        self.actions.insert(action.name().to_string(), action);
    }

    /// Look up an action by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    /// Check if an action exists
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Get registered action names
    pub fn action_names(&self) -> Vec<String> {
        self.actions.keys().cloned().collect()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
