use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// One operator-configured external command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommandDefinition {
    pub id: String,

    #[serde(default)]
    pub description: String,

    /// Executable path, resolved through `PATH` when not absolute.
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,
}

/// Read-only lookup of command definitions by id.
///
/// Keeps configuration order for listing.
#[derive(Debug, Default)]
pub struct CommandCatalog {
    ordered: Vec<Arc<CommandDefinition>>,
    by_id: HashMap<String, Arc<CommandDefinition>>,
}

impl CommandCatalog {
    pub fn new(definitions: impl IntoIterator<Item = CommandDefinition>) -> Self {
        let mut catalog = Self::default();

        for definition in definitions {
            let definition = Arc::new(definition);
            // Ids are unique after config validation; first definition wins otherwise.
            if catalog.by_id.contains_key(&definition.id) {
                tracing::warn!(id = %definition.id, "duplicate command definition ignored");
                continue;
            }
            catalog
                .by_id
                .insert(definition.id.clone(), definition.clone());
            catalog.ordered.push(definition);
        }

        catalog
    }

    pub fn get(&self, id: &str) -> Option<Arc<CommandDefinition>> {
        self.by_id.get(id).cloned()
    }

    pub fn all(&self) -> &[Arc<CommandDefinition>] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
