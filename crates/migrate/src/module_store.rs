//! Persists the module registry table and applies module migrations in
//! dependency order (§4.4 "Modules").

use std::sync::Arc;

use lpdb_core::{ModuleDefinition, order_modules};
use lpdb_driver::Driver;

use crate::collector::CollectedMigration;
use crate::runner::{Result, Runner, RunnerError, UpOptions};

pub struct ModuleStore {
    driver: Arc<Driver>,
    table: String,
}

impl ModuleStore {
    #[must_use]
    pub fn new(driver: Arc<Driver>) -> Self {
        Self { driver, table: lpdb_core::DEFAULT_MODULE_REGISTRY_TABLE.to_string() }
    }

    pub async fn ensure_table(&self) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {table} (\n  \
                name TEXT PRIMARY KEY,\n  \
                display_name TEXT NOT NULL,\n  \
                description TEXT NOT NULL,\n  \
                version TEXT NOT NULL,\n  \
                dependencies TEXT NOT NULL,\n  \
                migration_prefix TEXT NOT NULL,\n  \
                created_at TEXT NOT NULL\n)",
            table = self.table
        );
        self.driver.execute(&sql, &[]).await?;
        Ok(())
    }

    pub async fn register(&self, module: &ModuleDefinition) -> Result<()> {
        let sql = format!(
            "INSERT INTO {table} (name, display_name, description, version, dependencies, migration_prefix, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            table = self.table
        );
        let dependencies = serde_json::to_string(&module.dependencies).unwrap_or_default();
        self.driver
            .execute(
                &sql,
                &[
                    module.name.clone(),
                    module.display_name.clone(),
                    module.description.clone(),
                    module.version.clone(),
                    dependencies,
                    module.migration_prefix.clone(),
                    chrono::Utc::now().to_rfc3339(),
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<ModuleDefinition>> {
        let sql = format!(
            "SELECT name, display_name, description, version, dependencies, migration_prefix FROM {table}",
            table = self.table
        );
        let result = self.driver.query(&sql, &[]).await?;
        let mut modules = Vec::with_capacity(result.rows.len());
        for row in &result.rows {
            let dependencies_json: String = row.try_get("dependencies")?;
            modules.push(ModuleDefinition {
                name: row.try_get("name")?,
                display_name: row.try_get("display_name")?,
                version: row.try_get("version")?,
                migration_prefix: row.try_get("migration_prefix")?,
                dependencies: serde_json::from_str(&dependencies_json).unwrap_or_default(),
                description: row.try_get("description")?,
            });
        }
        Ok(modules)
    }

    /// Applies every module's pending migrations in dependency order; within
    /// a module, files are applied in version order (handled by `Runner`).
    pub async fn apply_all(
        &self,
        runner: &Runner,
        discovered: &[CollectedMigration],
        options: &UpOptions,
    ) -> Result<Vec<lpdb_core::MigrationRecord>> {
        let modules = self.list().await?;
        let order = order_modules(&modules)
            .map_err(|err| RunnerError::Dialect(lpdb_core::Error::SchemaValidation {
                table: "lp_module_registry".to_string(),
                reason: err.to_string(),
            }))?;

        let mut applied = Vec::new();
        for module_name in order {
            let module_migrations: Vec<CollectedMigration> =
                discovered.iter().filter(|m| m.module_name == module_name).cloned().collect();
            if module_migrations.is_empty() {
                continue;
            }
            let mut result = runner.up(&module_migrations, options).await?;
            applied.append(&mut result);
        }
        Ok(applied)
    }
}
