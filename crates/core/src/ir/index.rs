use serde::{Deserialize, Serialize};

/// One index declared on a [`super::table::TableDefinition`].
///
/// A missing `name` defaults to `idx_<table>_<col1>_<col2>…` via
/// [`IndexDefinition::resolved_name`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "where")]
    pub predicate: Option<String>,
}

impl IndexDefinition {
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            name: None,
            columns,
            unique: false,
            predicate: None,
        }
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Generated default name `idx_<table>_<col1>_<col2>…`.
    #[must_use]
    pub fn resolved_name(&self, table: &str) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => {
                let mut generated = format!("idx_{table}");
                for column in &self.columns {
                    generated.push('_');
                    generated.push_str(column);
                }
                generated
            }
        }
    }
}
