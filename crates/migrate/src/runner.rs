//! Applies/reverts collected migrations under a cooperative lock, persists
//! the tamper-detecting ledger, and verifies checksums (§4.4).

use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use lpdb_core::{Dialect, MigrationRecord, MigrationScope};
use lpdb_driver::Driver;
use thiserror::Error;

use crate::collector::CollectedMigration;

/// Sentinel used in place of SQL `NULL` for the nullable PK columns
/// (`template_key`, `module_name`) so the ledger's composite primary key
/// works uniformly across dialects — §6 calls for nulls to compare distinct,
/// which a literal `NULL` in a primary key cannot portably express.
const NULL_SENTINEL: &str = "";

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("driver error: {0}")]
    Driver(#[from] lpdb_driver::Error),
    #[error("dialect error: {0}")]
    Dialect(#[from] lpdb_core::Error),
    #[error("migration ledger is tampered: versions {0:?} no longer match their recorded checksum")]
    Tampered(Vec<i64>),
    #[error("failed to acquire the migration lock; another process is applying migrations")]
    LockContended,
}

pub type Result<T> = std::result::Result<T, RunnerError>;

#[derive(Debug, Default, Clone)]
pub struct UpOptions {
    pub steps: Option<usize>,
    pub to_version: Option<i64>,
    pub dry_run: bool,
    pub executed_by: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct DownOptions {
    pub steps: Option<usize>,
    pub to_version: Option<i64>,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct MigrationStatusEntry {
    pub version: i64,
    pub name: String,
    pub module_name: String,
    pub applied: bool,
}

#[derive(Debug, Clone)]
pub struct TamperedMigration {
    pub version: i64,
    pub recorded_checksum: String,
    pub recomputed_checksum: String,
}

pub struct Runner {
    driver: Arc<Driver>,
    dialect: Arc<dyn Dialect>,
    ledger_table: String,
    lock_table: String,
}

impl Runner {
    #[must_use]
    pub fn new(driver: Arc<Driver>, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            driver,
            dialect,
            ledger_table: lpdb_core::DEFAULT_MIGRATIONS_TABLE.to_string(),
            lock_table: format!("{}_lock", lpdb_core::DEFAULT_MIGRATIONS_TABLE),
        }
    }

    pub async fn ensure_ledger_table(&self) -> Result<()> {
        let ledger_sql = format!(
            "CREATE TABLE IF NOT EXISTS {table} (\n  \
                version TEXT NOT NULL,\n  \
                name TEXT NOT NULL,\n  \
                scope TEXT NOT NULL,\n  \
                template_key TEXT NOT NULL,\n  \
                module_name TEXT NOT NULL,\n  \
                checksum TEXT NOT NULL,\n  \
                up_sql TEXT NOT NULL,\n  \
                down_sql TEXT NOT NULL,\n  \
                applied_at TEXT NOT NULL,\n  \
                executed_by TEXT,\n  \
                PRIMARY KEY (version, scope, template_key, module_name)\n)",
            table = self.ledger_table
        );
        self.driver.execute(&ledger_sql, &[]).await?;

        let lock_sql = format!(
            "CREATE TABLE IF NOT EXISTS {table} (id INTEGER PRIMARY KEY)",
            table = self.lock_table
        );
        self.driver.execute(&lock_sql, &[]).await?;
        Ok(())
    }

    /// Cooperative lock via a table insert, uniform across dialects: only
    /// one process can hold the single-row lock at a time (§4.4 step 1).
    async fn acquire_lock(&self) -> Result<()> {
        let sql = format!("INSERT INTO {table} (id) VALUES (1)", table = self.lock_table);
        if let Err(source) = self.driver.execute(&sql, &[]).await {
            tracing::warn!(table = %self.lock_table, %source, "failed to acquire migration lock");
            return Err(RunnerError::LockContended);
        }
        tracing::debug!(table = %self.lock_table, "acquired migration lock");
        Ok(())
    }

    async fn release_lock(&self) -> Result<()> {
        let sql = format!("DELETE FROM {table} WHERE id = 1", table = self.lock_table);
        self.driver.execute(&sql, &[]).await?;
        tracing::debug!(table = %self.lock_table, "released migration lock");
        Ok(())
    }

    async fn applied_versions(&self) -> Result<Vec<MigrationRecord>> {
        let sql = format!(
            "SELECT version, name, scope, template_key, module_name, checksum, up_sql, down_sql, applied_at, executed_by FROM {table} ORDER BY version ASC",
            table = self.ledger_table
        );
        let result = self.driver.query(&sql, &[]).await?;
        let mut records = Vec::with_capacity(result.rows.len());
        for row in &result.rows {
            records.push(row_to_record(row)?);
        }
        Ok(records)
    }

    /// Applies pending migrations in order, under the cooperative lock
    /// (§4.4). `options.steps`/`to_version` bound how many are applied;
    /// `dry_run` reports the plan without executing anything.
    pub async fn up(&self, pending: &[CollectedMigration], options: &UpOptions) -> Result<Vec<MigrationRecord>> {
        let applied = self.applied_versions().await?;
        let applied_versions: std::collections::HashSet<i64> = applied.iter().map(|r| r.version).collect();

        let mut plan: Vec<&CollectedMigration> =
            pending.iter().filter(|m| !applied_versions.contains(&m.version)).collect();
        plan.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.module_name.cmp(&b.module_name)));

        if let Some(to_version) = options.to_version {
            plan.retain(|m| m.version <= to_version);
        }
        if let Some(steps) = options.steps {
            plan.truncate(steps);
        }

        if options.dry_run {
            return Ok(plan
                .into_iter()
                .map(|m| self.to_pending_record(m, options.executed_by.clone()))
                .collect());
        }

        self.acquire_lock().await?;
        let mut applied_now = Vec::with_capacity(plan.len());
        let result = async {
            for migration in &plan {
                let record = self.apply_one_up(migration, options.executed_by.clone()).await?;
                applied_now.push(record);
            }
            Ok::<(), RunnerError>(())
        }
        .await;
        self.release_lock().await?;
        result?;

        Ok(applied_now)
    }

    fn to_pending_record(&self, migration: &CollectedMigration, executed_by: Option<String>) -> MigrationRecord {
        MigrationRecord {
            version: migration.version,
            name: migration.name.clone(),
            scope: MigrationScope::Core,
            template_key: None,
            module_name: Some(migration.module_name.clone()),
            checksum: MigrationRecord::compute_checksum(&migration.up_sql, &migration.down_sql),
            up_sql: migration.up_sql.clone(),
            down_sql: migration.down_sql.clone(),
            applied_at: None,
            executed_by,
        }
    }

    async fn apply_one_up(&self, migration: &CollectedMigration, executed_by: Option<String>) -> Result<MigrationRecord> {
        let checksum = MigrationRecord::compute_checksum(&migration.up_sql, &migration.down_sql);
        let applied_at = Utc::now();
        tracing::info!(version = migration.version, name = %migration.name, "applying migration");

        if self.dialect.supports_transactional_ddl() {
            let up_sql = migration.up_sql.clone();
            let insert_sql = self.ledger_insert_sql();
            let bind_values = self.ledger_bind_values(migration, &checksum, applied_at, &executed_by);

            self.driver
                .transaction(move |tx| {
                    async move {
                        for statement in &up_sql {
                            tx.execute(statement, &[]).await?;
                        }
                        tx.execute(&insert_sql, &bind_values).await?;
                        Ok(())
                    }
                    .boxed()
                })
                .await?;
        } else {
            // MySQL: DDL is non-transactional. A mid-statement failure here
            // leaves partial DDL applied; this is accepted per §4.4.
            for statement in &migration.up_sql {
                self.driver.execute(statement, &[]).await?;
            }
            let insert_sql = self.ledger_insert_sql();
            let bind_values = self.ledger_bind_values(migration, &checksum, applied_at, &executed_by);
            self.driver.execute(&insert_sql, &bind_values).await?;
        }

        tracing::info!(version = migration.version, name = %migration.name, "applied migration");
        Ok(MigrationRecord {
            version: migration.version,
            name: migration.name.clone(),
            scope: MigrationScope::Core,
            template_key: None,
            module_name: Some(migration.module_name.clone()),
            checksum,
            up_sql: migration.up_sql.clone(),
            down_sql: migration.down_sql.clone(),
            applied_at: Some(applied_at),
            executed_by,
        })
    }

    fn ledger_insert_sql(&self) -> String {
        format!(
            "INSERT INTO {table} (version, name, scope, template_key, module_name, checksum, up_sql, down_sql, applied_at, executed_by) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            table = self.ledger_table
        )
    }

    fn ledger_bind_values(
        &self,
        migration: &CollectedMigration,
        checksum: &str,
        applied_at: chrono::DateTime<Utc>,
        executed_by: &Option<String>,
    ) -> Vec<String> {
        vec![
            migration.version.to_string(),
            migration.name.clone(),
            "core".to_string(),
            NULL_SENTINEL.to_string(),
            migration.module_name.clone(),
            checksum.to_string(),
            serde_json::to_string(&migration.up_sql).unwrap_or_default(),
            serde_json::to_string(&migration.down_sql).unwrap_or_default(),
            applied_at.to_rfc3339(),
            executed_by.clone().unwrap_or_default(),
        ]
    }

    /// Reverts applied migrations in reverse version order, deleting each
    /// ledger row after its down statements run (§4.4).
    pub async fn down(&self, options: &DownOptions) -> Result<Vec<MigrationRecord>> {
        let mut applied = self.applied_versions().await?;
        applied.sort_by(|a, b| b.version.cmp(&a.version));

        if let Some(to_version) = options.to_version {
            applied.retain(|m| m.version > to_version);
        }
        if let Some(steps) = options.steps {
            applied.truncate(steps);
        }

        if options.dry_run {
            return Ok(applied);
        }

        self.acquire_lock().await?;
        let mut reverted = Vec::with_capacity(applied.len());
        let result = async {
            for record in &applied {
                self.revert_one(record).await?;
                reverted.push(record.clone());
            }
            Ok::<(), RunnerError>(())
        }
        .await;
        self.release_lock().await?;
        result?;

        Ok(reverted)
    }

    async fn revert_one(&self, record: &MigrationRecord) -> Result<()> {
        tracing::info!(version = record.version, name = %record.name, "reverting migration");
        let delete_sql = format!(
            "DELETE FROM {table} WHERE version = ? AND scope = ?",
            table = self.ledger_table
        );
        let down_sql = record.down_sql.clone();
        let version = record.version.to_string();

        if self.dialect.supports_transactional_ddl() {
            self.driver
                .transaction(move |tx| {
                    async move {
                        for statement in down_sql.iter().rev() {
                            tx.execute(statement, &[]).await?;
                        }
                        tx.execute(&delete_sql, &[version, "core".to_string()]).await?;
                        Ok(())
                    }
                    .boxed()
                })
                .await?;
        } else {
            for statement in down_sql.iter().rev() {
                self.driver.execute(statement, &[]).await?;
            }
            self.driver.execute(&delete_sql, &[version, "core".to_string()]).await?;
        }
        tracing::info!(version = record.version, name = %record.name, "reverted migration");
        Ok(())
    }

    pub async fn status(&self, discovered: &[CollectedMigration]) -> Result<Vec<MigrationStatusEntry>> {
        let applied = self.applied_versions().await?;
        let applied_versions: std::collections::HashSet<i64> = applied.iter().map(|r| r.version).collect();

        let mut entries: Vec<MigrationStatusEntry> = discovered
            .iter()
            .map(|m| MigrationStatusEntry {
                version: m.version,
                name: m.name.clone(),
                module_name: m.module_name.clone(),
                applied: applied_versions.contains(&m.version),
            })
            .collect();
        entries.sort_by_key(|e| e.version);
        Ok(entries)
    }

    /// Recomputes checksums for every ledger row against the current file
    /// contents and reports mismatches as tampered (§4.4).
    pub async fn verify(&self, discovered: &[CollectedMigration]) -> Result<Vec<TamperedMigration>> {
        let applied = self.applied_versions().await?;
        let by_version: std::collections::HashMap<i64, &CollectedMigration> =
            discovered.iter().map(|m| (m.version, m)).collect();

        let mut tampered = Vec::new();
        for record in &applied {
            if let Some(file) = by_version.get(&record.version) {
                let recomputed = MigrationRecord::compute_checksum(&file.up_sql, &file.down_sql);
                if recomputed != record.checksum {
                    tampered.push(TamperedMigration {
                        version: record.version,
                        recorded_checksum: record.checksum.clone(),
                        recomputed_checksum: recomputed,
                    });
                }
            }
        }
        Ok(tampered)
    }
}

fn row_to_record(row: &lpdb_driver::Row) -> Result<MigrationRecord> {
    let version: String = row.try_get("version")?;
    let module_name: String = row.try_get("module_name")?;
    let template_key: String = row.try_get("template_key")?;
    let executed_by: String = row.try_get("executed_by")?;
    let up_sql: String = row.try_get("up_sql")?;
    let down_sql: String = row.try_get("down_sql")?;
    let applied_at: String = row.try_get("applied_at")?;

    Ok(MigrationRecord {
        version: version.parse().unwrap_or_default(),
        name: row.try_get("name")?,
        scope: MigrationScope::Core,
        template_key: (!template_key.is_empty()).then_some(template_key),
        module_name: (!module_name.is_empty()).then_some(module_name),
        checksum: row.try_get("checksum")?,
        up_sql: serde_json::from_str(&up_sql).unwrap_or_default(),
        down_sql: serde_json::from_str(&down_sql).unwrap_or_default(),
        applied_at: chrono::DateTime::parse_from_rfc3339(&applied_at).ok().map(|dt| dt.with_timezone(&Utc)),
        executed_by: (!executed_by.is_empty()).then_some(executed_by),
    })
}
