use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{column::ColumnDefinition, index::IndexDefinition};

/// A declared table. Column insertion order is significant for generated
/// DDL, hence the ordered map rather than a `BTreeMap`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub columns: IndexMap<String, ColumnDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexDefinition>,
    /// Composite primary-key column list. Used only when more than one
    /// column is a primary key; a single-column PK is declared via that
    /// column's `primaryKey` flag instead (§3 invariant 3).
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "primaryKey")]
    pub primary_key: Option<Vec<String>>,
}

impl TableDefinition {
    #[must_use]
    pub fn new() -> Self {
        Self {
            columns: IndexMap::new(),
            indexes: Vec::new(),
            primary_key: None,
        }
    }

    #[must_use]
    pub fn with_column(mut self, name: impl Into<String>, column: ColumnDefinition) -> Self {
        self.columns.insert(name.into(), column);
        self
    }

    #[must_use]
    pub fn with_index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    #[must_use]
    pub fn with_composite_primary_key(mut self, columns: Vec<String>) -> Self {
        self.primary_key = Some(columns);
        self
    }

    /// The effective primary-key column list: the explicit composite list if
    /// present, otherwise the single column (if any) flagged `primaryKey`.
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<String> {
        if let Some(composite) = &self.primary_key {
            return composite.clone();
        }

        self.columns
            .iter()
            .filter(|(_, column)| column.primary_key)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl Default for TableDefinition {
    fn default() -> Self {
        Self::new()
    }
}
