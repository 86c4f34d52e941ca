use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::table::TableDefinition;

/// A declared schema: table name → [`TableDefinition`]. Table iteration
/// order is not significant (unlike column order within a table), so a
/// `BTreeMap` keeps serialization and diffing deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub tables: BTreeMap<String, TableDefinition>,
}

impl SchemaDefinition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_table(mut self, name: impl Into<String>, table: TableDefinition) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    /// SHA-256 over the canonical JSON serialization, used by the registry
    /// as a content-addressed checksum (§4.7) and by the diff engine's
    /// generated migrations (§4.6).
    #[must_use]
    pub fn checksum(&self) -> String {
        use sha2::{Digest, Sha256};

        let canonical =
            serde_json::to_vec(self).expect("SchemaDefinition serialization cannot fail");
        let digest = Sha256::digest(canonical);
        crate::util::hex_encode(&digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ColumnDefinition, ColumnType};

    #[test]
    fn checksum_is_stable_across_clones() {
        let schema = SchemaDefinition::new().with_table(
            "users",
            TableDefinition::new().with_column("id", ColumnDefinition::new(ColumnType::Uuid)),
        );
        assert_eq!(schema.checksum(), schema.clone().checksum());
    }

    #[test]
    fn checksum_changes_with_content() {
        let base = SchemaDefinition::new().with_table(
            "users",
            TableDefinition::new().with_column("id", ColumnDefinition::new(ColumnType::Uuid)),
        );
        let mut changed = base.clone();
        changed
            .tables
            .get_mut("users")
            .unwrap()
            .columns
            .get_mut("id")
            .unwrap()
            .nullable = true;
        assert_ne!(base.checksum(), changed.checksum());
    }
}
