//! Combined table registry.
//!
//! Merges built-in tables with the custom tables the ingestor hands over.
//! Custom tables are only ever added or removed whole, by id, through the
//! [`TableRegistry`] trait.

use crate::table::TableDefinition;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashSet};

/// Mutation hooks the ingestor drives.
pub trait TableRegistry {
    /// Register a custom table, replacing any custom table with that id.
    fn add_table(&mut self, table: TableDefinition);

    /// Remove a custom table. Returns whether it was registered.
    fn remove_table(&mut self, id: &str) -> bool;

    /// Remove every custom table.
    fn clear_all_custom(&mut self);
}

/// Built-in and custom tables with lookup by id.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    builtins: IndexMap<String, TableDefinition>,
    custom: IndexMap<String, TableDefinition>,
}

impl Registry {
    /// Create a registry seeded with built-in tables.
    pub fn new(builtins: impl IntoIterator<Item = TableDefinition>) -> Self {
        Self {
            builtins: builtins
                .into_iter()
                .map(|table| (table.id.clone(), table))
                .collect(),
            custom: IndexMap::new(),
        }
    }

    /// Ids of the built-in tables.
    pub fn builtin_ids(&self) -> HashSet<String> {
        self.builtins.keys().cloned().collect()
    }

    /// Look up a table by id. Built-ins take precedence.
    pub fn get(&self, id: &str) -> Option<&TableDefinition> {
        self.builtins.get(id).or_else(|| self.custom.get(id))
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// All tables, built-ins first.
    pub fn tables(&self) -> impl Iterator<Item = &TableDefinition> {
        self.builtins.values().chain(self.custom.values())
    }

    /// Registered custom tables in registration order.
    pub fn custom_tables(&self) -> impl Iterator<Item = &TableDefinition> {
        self.custom.values()
    }

    /// Number of registered tables.
    pub fn len(&self) -> usize {
        self.builtins.len() + self.custom.len()
    }

    /// Whether the registry holds no tables.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build the category tree over every registered table.
    pub fn category_tree(&self) -> CategoryNode {
        let mut root = CategoryNode::default();
        for table in self.tables() {
            let mut node = &mut root;
            for segment in table.category_path() {
                node = node.children.entry(segment.to_string()).or_default();
            }
            node.tables.push(table.id.clone());
        }
        root
    }
}

impl TableRegistry for Registry {
    fn add_table(&mut self, table: TableDefinition) {
        if self.builtins.contains_key(&table.id) {
            log::warn!("Custom table '{}' shadows a built-in table", table.id);
        }
        self.custom.insert(table.id.clone(), table);
    }

    fn remove_table(&mut self, id: &str) -> bool {
        self.custom.shift_remove(id).is_some()
    }

    fn clear_all_custom(&mut self) {
        self.custom.clear();
    }
}

/// One level of the category tree.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CategoryNode {
    /// Sub-categories by name, sorted.
    pub children: BTreeMap<String, CategoryNode>,
    /// Ids of tables placed directly at this level, in registry order.
    pub tables: Vec<String>,
}

impl CategoryNode {
    /// Child node for a `/`-separated path, if present.
    pub fn find(&self, path: &str) -> Option<&CategoryNode> {
        path.split(crate::table::CATEGORY_SEPARATOR)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| node.children.get(segment))
    }

    /// Indented outline, two spaces per level, tables prefixed with `- `.
    pub fn outline(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.outline_into(0, &mut lines);
        lines
    }

    fn outline_into(&self, depth: usize, lines: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        for id in &self.tables {
            lines.push(format!("{}- {}", indent, id));
        }
        for (name, child) in &self.children {
            lines.push(format!("{}{}/", indent, name));
            child.outline_into(depth + 1, lines);
        }
    }
}
