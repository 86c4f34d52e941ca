use serde::{Deserialize, Serialize};

use crate::ir::ColumnDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    TableAdd,
    TableDrop,
    ColumnAdd,
    ColumnDrop,
    ColumnModify,
    IndexAdd,
    IndexDrop,
    ForeignKeyAdd,
    ForeignKeyDrop,
}

/// A typed record of one structural difference between two
/// [`crate::SchemaDefinition`]s (§3, §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaChange {
    pub kind: ChangeKind,
    pub table: String,
    pub object: String,
    pub breaking: bool,
    pub up_sql: Vec<String>,
    pub down_sql: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_column: Option<ColumnDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_column: Option<ColumnDefinition>,
}

impl SchemaChange {
    #[must_use]
    pub fn symbol(&self) -> char {
        match self.kind {
            ChangeKind::TableAdd | ChangeKind::ColumnAdd | ChangeKind::IndexAdd | ChangeKind::ForeignKeyAdd => '+',
            ChangeKind::TableDrop | ChangeKind::ColumnDrop | ChangeKind::IndexDrop | ChangeKind::ForeignKeyDrop => '-',
            ChangeKind::ColumnModify => '~',
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffSummary {
    pub tables_added: usize,
    pub tables_dropped: usize,
    pub columns_added: usize,
    pub columns_dropped: usize,
    pub columns_modified: usize,
    pub indexes_added: usize,
    pub indexes_dropped: usize,
    pub foreign_keys_added: usize,
    pub foreign_keys_dropped: usize,
}

/// Output of [`crate::DiffEngine::diff`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffResult {
    pub has_differences: bool,
    pub summary: DiffSummary,
    pub changes: Vec<SchemaChange>,
}

impl DiffResult {
    #[must_use]
    pub fn breaking_changes(&self) -> Vec<&SchemaChange> {
        self.changes.iter().filter(|change| change.breaking).collect()
    }

    /// `up_sql` flattened in change order, `down_sql` flattened in reverse
    /// change order (§4.6 "Migration generation").
    #[must_use]
    pub fn up_sql(&self) -> Vec<String> {
        self.changes.iter().flat_map(|change| change.up_sql.clone()).collect()
    }

    #[must_use]
    pub fn down_sql(&self) -> Vec<String> {
        self.changes
            .iter()
            .rev()
            .flat_map(|change| change.down_sql.clone())
            .collect()
    }

    #[must_use]
    pub fn checksum(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        for statement in self.up_sql().iter().chain(self.down_sql().iter()) {
            hasher.update(statement.as_bytes());
        }
        crate::util::hex_encode(&hasher.finalize())
    }
}
