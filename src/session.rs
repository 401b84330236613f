//! Compilation state: identifier issuance, the component registry, and
//! per-document accumulators

use crate::types::CompiledUnit;
use std::collections::{BTreeSet, HashMap};

/// Identifier -> normalized snippet source. Append-only.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, identifier: &str, source: &str) {
        match self.index.get(identifier) {
            Some(&slot) => self.entries[slot].1 = source.to_string(),
            None => {
                self.index.insert(identifier.to_string(), self.entries.len());
                self.entries.push((identifier.to_string(), source.to_string()));
            }
        }
    }

    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.index
            .get(identifier)
            .map(|&slot| self.entries[slot].1.as_str())
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.index.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(id, source)| (id.as_str(), source.as_str()))
    }
}

/// Owns the identifier counter and the registry.
///
/// Reference mode keeps one session for the life of the process so that
/// identifiers are never reused; inline mode builds a fresh one per document.
#[derive(Debug, Clone, Default)]
pub struct CompilerSession {
    issued: usize,
    registry: ComponentRegistry,
}

impl CompilerSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next unit identity. Never deduplicates by content.
    pub fn next_unit(&mut self, prefix: &str, local_prefix: &str) -> CompiledUnit {
        let index = self.issued;
        self.issued += 1;
        let identifier = format!("{}{}", prefix, index);
        CompiledUnit {
            index,
            local_name: format!("{}{}", local_prefix, index),
            identifier,
        }
    }

    /// Number of identifiers issued so far
    pub fn issued(&self) -> usize {
        self.issued
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }
}

/// Deduplicated framework bindings required by a document's inline demos
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportAggregate {
    bindings: BTreeSet<String>,
}

impl ImportAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, binding: impl Into<String>) {
        self.bindings.insert(binding.into());
    }

    pub fn extend<I, S>(&mut self, bindings: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for binding in bindings {
            self.insert(binding);
        }
    }

    pub fn contains(&self, binding: &str) -> bool {
        self.bindings.contains(binding)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Single import statement for every binding, or `None` when there are none
    pub fn render(&self, module: &str) -> Option<String> {
        if self.bindings.is_empty() {
            return None;
        }
        let names: Vec<&str> = self.bindings.iter().map(String::as_str).collect();
        Some(format!("import {{ {} }} from '{}';", names.join(", "), module))
    }
}

/// Script material gathered while transforming one document
#[derive(Debug, Clone, Default)]
pub struct DocumentScope {
    /// Module id of the document being transformed
    pub document: String,
    /// Reference mode: one import statement per registered demo
    pub component_imports: Vec<String>,
    /// Inline mode: framework bindings
    pub imports: ImportAggregate,
    /// Inline mode: non-framework import statements
    pub foreign_imports: Vec<String>,
    /// Inline mode: `const componentN = _defineComponent(...)` definitions
    pub definitions: Vec<String>,
}

impl DocumentScope {
    pub fn new(document: &str) -> Self {
        Self {
            document: document.to_string(),
            ..Default::default()
        }
    }

    pub fn add_component_import(&mut self, statement: String) {
        if !self.component_imports.contains(&statement) {
            self.component_imports.push(statement);
        }
    }

    pub fn add_foreign_import(&mut self, statement: String) {
        if !self.foreign_imports.contains(&statement) {
            self.foreign_imports.push(statement);
        }
    }
}
