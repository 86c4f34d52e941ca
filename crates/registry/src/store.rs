//! Persists and reconciles per-tenant schema registrations (§4.7).

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use lpdb_core::{Dialect, DiffEngine, SchemaChange, SchemaDefinition, validate_schema};
use lpdb_driver::Driver;

use crate::error::{RegistryError, Result};
use crate::introspector::Introspector;

/// Outcome of applying one [`SchemaChange`] during a `register` call.
#[derive(Debug, Clone)]
pub struct MigrationResult {
    pub version: i64,
    pub name: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

pub struct Registry {
    driver: Arc<Driver>,
    dialect: Arc<dyn Dialect>,
    introspector: Introspector,
    table: String,
}

impl Registry {
    #[must_use]
    pub fn new(driver: Arc<Driver>, dialect: Arc<dyn Dialect>) -> Self {
        let introspector = Introspector::new(Arc::clone(&driver), Arc::clone(&dialect));
        Self { driver, dialect, introspector, table: lpdb_core::DEFAULT_SCHEMA_REGISTRY_TABLE.to_string() }
    }

    pub async fn ensure_table(&self) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {table} (\n  \
                app_id TEXT NOT NULL,\n  \
                schema_name TEXT NOT NULL,\n  \
                version TEXT NOT NULL,\n  \
                schema_json TEXT NOT NULL,\n  \
                checksum TEXT NOT NULL,\n  \
                created_at TEXT NOT NULL,\n  \
                updated_at TEXT NOT NULL,\n  \
                PRIMARY KEY (app_id, schema_name)\n)",
            table = self.table
        );
        self.driver.execute(&sql, &[]).await?;
        Ok(())
    }

    /// Reads the live schema via the [`Introspector`] (§2, §4.5): this is
    /// what `register` diffs the desired schema against. The registry's own
    /// persisted `schema_json` is a cache of the last registration and is
    /// only consulted as a fallback, when introspection itself fails (e.g.
    /// the connected role lacks catalog-read access).
    async fn fetch_current(&self, app_id: &str, schema_name: &str) -> Result<SchemaDefinition> {
        match self.introspector.introspect_database(false).await {
            Ok(live) => Ok(live),
            Err(source) => {
                tracing::warn!(
                    app_id, schema_name, %source,
                    "live introspection failed, falling back to the cached schema_json"
                );
                Ok(self.fetch_cached(app_id, schema_name).await?.unwrap_or_default())
            }
        }
    }

    async fn fetch_cached(&self, app_id: &str, schema_name: &str) -> Result<Option<SchemaDefinition>> {
        let sql = format!(
            "SELECT schema_json FROM {table} WHERE app_id = ? AND schema_name = ?",
            table = self.table
        );
        let result = self.driver.query(&sql, &[app_id.to_string(), schema_name.to_string()]).await?;
        let Some(row) = result.rows.first() else {
            return Ok(None);
        };
        let payload: String = row.try_get("schema_json")?;
        let schema = serde_json::from_str(&payload).map_err(|source| RegistryError::CorruptPayload {
            app_id: app_id.to_string(),
            schema_name: schema_name.to_string(),
            source,
        })?;
        Ok(Some(schema))
    }

    async fn upsert(&self, app_id: &str, schema_name: &str, version: &str, schema: &SchemaDefinition) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let payload = serde_json::to_string(schema).expect("SchemaDefinition serialization cannot fail");
        let checksum = schema.checksum();

        let delete_sql =
            format!("DELETE FROM {table} WHERE app_id = ? AND schema_name = ?", table = self.table);
        self.driver.execute(&delete_sql, &[app_id.to_string(), schema_name.to_string()]).await?;

        let insert_sql = format!(
            "INSERT INTO {table} (app_id, schema_name, version, schema_json, checksum, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            table = self.table
        );
        self.driver
            .execute(
                &insert_sql,
                &[
                    app_id.to_string(),
                    schema_name.to_string(),
                    version.to_string(),
                    payload,
                    checksum,
                    now.clone(),
                    now,
                ],
            )
            .await?;
        Ok(())
    }

    /// Reconciles the persisted schema for `(app_id, schema_name)` towards
    /// `schema`, applying the diff engine's generated DDL and recording the
    /// new version. Returns one [`MigrationResult`] per emitted change;
    /// an empty vec means the schema was already up to date.
    pub async fn register(
        &self,
        app_id: &str,
        schema_name: &str,
        version: &str,
        schema: &SchemaDefinition,
    ) -> Result<Vec<MigrationResult>> {
        self.ensure_table().await?;
        validate_schema(schema)?;

        let current = self.fetch_current(app_id, schema_name).await?;
        let diff = DiffEngine::new(self.dialect.as_ref()).diff(Some(&current), schema)?;

        if !diff.has_differences {
            return Ok(Vec::new());
        }

        let results = if self.dialect.supports_transactional_ddl() {
            self.apply_transactional(&diff.changes).await?
        } else {
            self.apply_sequential(&diff.changes).await
        };

        self.upsert(app_id, schema_name, version, schema).await?;
        Ok(results)
    }

    async fn apply_transactional(&self, changes: &[SchemaChange]) -> Result<Vec<MigrationResult>> {
        use futures::FutureExt;

        tracing::debug!(changes = changes.len(), "beginning transactional schema change batch");
        let changes = changes.to_vec();
        let outcome = self
            .driver
            .transaction(move |tx| {
                async move {
                    let mut results = Vec::with_capacity(changes.len());
                    for change in &changes {
                        let start = Instant::now();
                        let name = change_name(change);
                        tracing::info!(name = %name, "applying schema change");
                        for statement in &change.up_sql {
                            tx.execute(statement, &[]).await?;
                        }
                        results.push(MigrationResult {
                            version: change_version(),
                            name,
                            success: true,
                            error: None,
                            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                        });
                    }
                    Ok(results)
                }
                .boxed()
            })
            .await
            .map_err(RegistryError::Driver);

        match &outcome {
            Ok(_) => tracing::debug!("schema change batch committed"),
            Err(source) => tracing::warn!(%source, "schema change batch rolled back"),
        }
        outcome
    }

    /// Applies changes one at a time and stops at the first failure,
    /// abandoning the remaining batch (§7: "the Registry surfaces the first
    /// change that fails and abandons the batch").
    async fn apply_sequential(&self, changes: &[SchemaChange]) -> Vec<MigrationResult> {
        tracing::debug!(changes = changes.len(), "beginning sequential schema change batch");
        let mut results = Vec::with_capacity(changes.len());
        for change in changes {
            let start = Instant::now();
            let name = change_name(change);
            tracing::info!(name = %name, "applying schema change");
            let mut error = None;
            for statement in &change.up_sql {
                if let Err(source) = self.driver.execute(statement, &[]).await {
                    tracing::warn!(name = %name, %source, "schema change failed, abandoning batch");
                    error = Some(source.to_string());
                    break;
                }
            }
            let failed = error.is_some();
            results.push(MigrationResult {
                version: change_version(),
                name,
                success: !failed,
                error,
                duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            });
            if failed {
                break;
            }
        }
        results
    }
}

fn change_version() -> i64 {
    Utc::now().timestamp()
}

fn change_name(change: &SchemaChange) -> String {
    format!("{:?}:{}.{}", change.kind, change.table, change.object)
}

#[cfg(test)]
mod tests {
    use lpdb_core::ChangeKind;

    use super::*;

    #[test]
    fn change_name_includes_kind_table_and_object() {
        let change = SchemaChange {
            kind: ChangeKind::ColumnAdd,
            table: "users".to_string(),
            object: "email".to_string(),
            breaking: false,
            up_sql: vec![],
            down_sql: vec![],
            old_column: None,
            new_column: None,
        };
        assert_eq!(change_name(&change), "ColumnAdd:users.email");
    }
}
