use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a migration belongs to the shared core schema or to a per-template
/// schema (§3, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationScope {
    Core,
    Template,
}

/// One applied-or-pending migration, mirrored into the ledger table by
/// `lpdb-migrate`'s runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// The 14-digit timestamp prefix of the migration file name.
    pub version: i64,
    pub name: String,
    pub scope: MigrationScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    /// Hex SHA-256 of the concatenated up/down SQL.
    pub checksum: String,
    pub up_sql: Vec<String>,
    pub down_sql: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_by: Option<String>,
}

impl MigrationRecord {
    /// SHA-256 over the concatenation of up and down statements (§3, §4.4
    /// step 4).
    #[must_use]
    pub fn compute_checksum(up_sql: &[String], down_sql: &[String]) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        for statement in up_sql.iter().chain(down_sql.iter()) {
            hasher.update(statement.as_bytes());
        }
        crate::util::hex_encode(&hasher.finalize())
    }
}
