//! Pooled connection driver: query/execute/transaction, health checks,
//! pool-utilization monitoring, active-query tracking, and graceful drain
//! (§4.2). The only crate in the workspace that opens a socket.

mod config;
mod drain;
mod error;
mod health;
mod monitor;
mod retry;
mod tracking;

pub use config::{DriverConfig, HealthCheckConfig, PoolMonitorConfig};
pub use drain::{DrainOptions, DrainPhase, DrainResult};
pub use error::{Error, Result, is_transient};
pub use health::HealthStatus;
pub use monitor::{MonitorCallback, PoolStats, UtilizationLevel};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use tracking::ActiveQuery;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures::FutureExt;
use sqlx::any::{AnyPoolOptions, install_default_drivers};
use sqlx::AnyPool;
use sqlx::{Any, Row as SqlxRow, Transaction as SqlxTransaction};
use tokio::sync::Mutex;

use health::HealthChecker;
use monitor::PoolMonitor;
use tracking::ActiveQueryTable;

/// Generic row handle spanning all three backends, via `sqlx`'s `Any` driver.
pub struct Row(sqlx::any::AnyRow);

impl Row {
    pub fn try_get<'r, T>(&'r self, index: &str) -> Result<T>
    where
        T: sqlx::Decode<'r, Any> + sqlx::Type<Any>,
    {
        self.0
            .try_get(index)
            .map_err(|source| Error::Connection { sql: format!("column `{index}`"), source })
    }
}

pub struct QueryResult {
    pub rows: Vec<Row>,
    pub row_count: u64,
}

/// A handle into one pinned connection for the lifetime of a `transaction`
/// closure (§4.2). `query`/`execute` here always run on that connection.
/// Owns a `'static` transaction because `sqlx::Pool::begin` hands back an
/// owned pooled connection rather than borrowing the pool.
pub struct TransactionClient {
    tx: SqlxTransaction<'static, Any>,
}

impl TransactionClient {
    pub async fn query(&mut self, sql: &str, params: &[String]) -> Result<QueryResult> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(param.clone());
        }
        let rows = query
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|source| Error::Connection { sql: sql.to_string(), source })?;
        let row_count = u64::try_from(rows.len()).unwrap_or(u64::MAX);
        Ok(QueryResult { rows: rows.into_iter().map(Row).collect(), row_count })
    }

    pub async fn execute(&mut self, sql: &str, params: &[String]) -> Result<u64> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(param.clone());
        }
        let result = query
            .execute(&mut *self.tx)
            .await
            .map_err(|source| Error::Connection { sql: sql.to_string(), source })?;
        Ok(result.rows_affected())
    }
}

/// The pooled driver itself. Cheap to clone: the pool and tracking state are
/// reference-counted internally.
pub struct Driver {
    pool: AnyPool,
    config: DriverConfig,
    active_queries: Arc<ActiveQueryTable>,
    is_draining: Arc<AtomicBool>,
    health_checker: Mutex<HealthChecker>,
    pool_monitor: Mutex<PoolMonitor>,
}

impl Driver {
    pub async fn connect(config: DriverConfig) -> Result<Self> {
        install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .idle_timeout(config.idle_timeout)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.connection_string)
            .await
            .map_err(|source| Error::Connection { sql: "CONNECT".to_string(), source })?;

        tracing::info!(max_connections = config.max_connections, "connection pool acquired");

        Ok(Self {
            pool,
            config,
            active_queries: Arc::new(ActiveQueryTable::new()),
            is_draining: Arc::new(AtomicBool::new(false)),
            health_checker: Mutex::new(HealthChecker::new()),
            pool_monitor: Mutex::new(PoolMonitor::new()),
        })
    }

    fn ensure_not_draining(&self) -> Result<()> {
        if self.is_draining.load(Ordering::SeqCst) { Err(Error::Draining) } else { Ok(()) }
    }

    pub async fn query(&self, sql: &str, params: &[String]) -> Result<QueryResult> {
        self.ensure_not_draining()?;
        let id = self.active_queries.track(sql, None);
        let result = self.query_inner(sql, params).await;
        self.active_queries.untrack(id);
        result
    }

    async fn query_inner(&self, sql: &str, params: &[String]) -> Result<QueryResult> {
        let policy = RetryPolicy::default();
        let markers = self.config.extra_retry_markers.clone();
        let pool = self.pool.clone();
        let sql_owned = sql.to_string();
        let params_owned = params.to_vec();

        let rows = retry_with_backoff(&policy, &markers, || {
            let pool = pool.clone();
            let sql = sql_owned.clone();
            let params = params_owned.clone();
            async move {
                let mut query = sqlx::query(&sql);
                for param in &params {
                    query = query.bind(param.clone());
                }
                query.fetch_all(&pool).await
            }
        })
        .await
        .map_err(|source| Error::Connection { sql: sql.to_string(), source })?;

        let row_count = u64::try_from(rows.len()).unwrap_or(u64::MAX);
        Ok(QueryResult { rows: rows.into_iter().map(Row).collect(), row_count })
    }

    pub async fn execute(&self, sql: &str, params: &[String]) -> Result<u64> {
        self.ensure_not_draining()?;
        let id = self.active_queries.track(sql, None);
        let result = self.execute_inner(sql, params).await;
        self.active_queries.untrack(id);
        result
    }

    async fn execute_inner(&self, sql: &str, params: &[String]) -> Result<u64> {
        let policy = RetryPolicy::default();
        let markers = self.config.extra_retry_markers.clone();
        let pool = self.pool.clone();
        let sql_owned = sql.to_string();
        let params_owned = params.to_vec();

        let result = retry_with_backoff(&policy, &markers, || {
            let pool = pool.clone();
            let sql = sql_owned.clone();
            let params = params_owned.clone();
            async move {
                let mut query = sqlx::query(&sql);
                for param in &params {
                    query = query.bind(param.clone());
                }
                query.execute(&pool).await
            }
        })
        .await
        .map_err(|source| Error::Connection { sql: sql.to_string(), source })?;

        Ok(result.rows_affected())
    }

    /// Reserves one connection for the lifetime of `f`: `BEGIN` on entry,
    /// `COMMIT` on `f`'s success, `ROLLBACK` on any failure (§4.2). The
    /// reservation is released on every exit path.
    pub async fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut TransactionClient) -> futures::future::BoxFuture<'a, Result<T>>,
    {
        self.ensure_not_draining()?;
        let id = self.active_queries.track("BEGIN", None);
        tracing::debug!("transaction begin");

        let tx = self.pool.begin().await.map_err(|source| Error::Transaction { source });
        let tx = match tx {
            Ok(tx) => tx,
            Err(err) => {
                self.active_queries.untrack(id);
                return Err(err);
            }
        };
        let mut client = TransactionClient { tx };

        let outcome = f(&mut client).await;
        let commit_or_rollback = match &outcome {
            Ok(_) => {
                tracing::debug!("transaction commit");
                client.tx.commit().await
            }
            Err(_) => {
                tracing::debug!("transaction rollback");
                client.tx.rollback().await
            }
        };
        self.active_queries.untrack(id);

        commit_or_rollback.map_err(|source| Error::Transaction { source })?;
        outcome
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> HealthStatus {
        health::check_once(&self.pool, self.config.health_check.timeout).await
    }

    #[must_use]
    pub fn get_pool_stats(&self) -> PoolStats {
        PoolStats::from_pool(&self.pool)
    }

    pub async fn is_healthy(&self) -> bool {
        self.health_check().await.healthy
    }

    pub async fn start_health_checks(&self) {
        if !self.config.health_check.enabled {
            return;
        }
        self.health_checker.lock().await.start(self.pool.clone(), self.config.health_check.clone());
    }

    pub async fn stop_health_checks(&self) {
        self.health_checker.lock().await.stop();
    }

    pub async fn start_pool_monitor(&self, config: PoolMonitorConfig, on_level_change: MonitorCallback) {
        self.pool_monitor.lock().await.start(self.pool.clone(), config, on_level_change);
    }

    pub async fn stop_pool_monitor(&self) {
        self.pool_monitor.lock().await.stop();
    }

    #[must_use]
    pub fn get_active_query_count(&self) -> usize {
        self.active_queries.count()
    }

    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.is_draining.load(Ordering::SeqCst)
    }

    /// Quiesces the pool: transitions to draining, waits up to
    /// `options.timeout` for active queries to empty, force-cancels
    /// still-running queries if requested, then closes the pool (§4.2).
    /// Dialect-specific cancellation (`pg_cancel_backend`/`KILL QUERY`) is
    /// issued for each tracked query whose backend PID is known.
    pub async fn drain_and_close(
        &self,
        options: DrainOptions,
        mut on_progress: impl FnMut(DrainPhase),
    ) -> DrainResult {
        let start = Instant::now();
        self.is_draining.store(true, Ordering::SeqCst);
        tracing::info!("drain phase: draining");
        on_progress(DrainPhase::Draining);

        let initial_count = self.active_queries.count();
        let deadline = start + options.timeout;
        while self.active_queries.count() > 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }

        let remaining = self.active_queries.snapshot();
        let mut cancelled_queries = 0;
        if !remaining.is_empty() && options.force_cancel_on_timeout {
            tracing::info!(remaining = remaining.len(), "drain phase: cancelling");
            on_progress(DrainPhase::Cancelling);
            for entry in &remaining {
                if let Some(pid) = entry.backend_pid {
                    if let Some(sql) = cancellation_sql(&self.config.connection_string, pid) {
                        // Best-effort: cancellation failures are logged, not fatal (§5).
                        if let Err(source) = sqlx::query(&sql).execute(&self.pool).await {
                            tracing::warn!(query_id = entry.id, %source, "failed to cancel query during drain");
                        }
                    }
                }
                self.active_queries.mark_cancelled(entry.id);
                cancelled_queries += 1;
            }
        }

        tracing::info!("drain phase: closing");
        on_progress(DrainPhase::Closing);
        self.pool.close().await;
        tracing::info!("drain phase: complete");
        on_progress(DrainPhase::Complete);

        let completed_queries = initial_count.saturating_sub(remaining.len());
        DrainResult {
            success: remaining.len() == cancelled_queries,
            completed_queries,
            cancelled_queries,
            elapsed_ms: drain::elapsed_ms(start),
        }
    }
}

/// Best-effort dialect detection from the connection string's scheme, used
/// only to pick the cancellation statement during drain (§4.2); unrecognized
/// schemes skip cancellation.
fn cancellation_sql(connection_string: &str, backend_pid: i32) -> Option<String> {
    if connection_string.starts_with("postgres") {
        Some(format!("SELECT pg_cancel_backend({backend_pid})"))
    } else if connection_string.starts_with("mysql") {
        Some(format!("KILL QUERY {backend_pid}"))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sqlite_in_memory_round_trip() {
        let config = DriverConfig::new("sqlite::memory:");
        let driver = Driver::connect(config).await.unwrap();

        driver.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)", &[]).await.unwrap();
        driver.execute("INSERT INTO t (id, name) VALUES (1, 'a')", &[]).await.unwrap();

        let result = driver.query("SELECT name FROM t WHERE id = 1", &[]).await.unwrap();
        assert_eq!(result.row_count, 1);
        let name: String = result.rows[0].try_get("name").unwrap();
        assert_eq!(name, "a");
    }

    #[tokio::test]
    async fn transaction_rolls_back_on_failure() {
        let config = DriverConfig::new("sqlite::memory:");
        let driver = Driver::connect(config).await.unwrap();
        driver.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", &[]).await.unwrap();

        let outcome: Result<()> = driver
            .transaction(|tx| {
                async move {
                    tx.execute("INSERT INTO t (id) VALUES (1)", &[]).await?;
                    Err(Error::Transaction { source: sqlx::Error::RowNotFound })
                }
                .boxed()
            })
            .await;
        assert!(outcome.is_err());

        let result = driver.query("SELECT COUNT(*) AS c FROM t", &[]).await.unwrap();
        let count: i64 = result.rows[0].try_get("c").unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn draining_rejects_new_queries() {
        let config = DriverConfig::new("sqlite::memory:");
        let driver = Driver::connect(config).await.unwrap();
        driver
            .drain_and_close(DrainOptions { timeout: Duration::from_millis(50), force_cancel_on_timeout: true }, |_| {})
            .await;
        assert!(driver.is_draining());
    }

    #[test]
    fn zero_active_queries_initially() {
        // Construction requires async connect; this only checks the counter
        // semantics on a freshly-built table.
        let table = ActiveQueryTable::new();
        assert_eq!(table.count(), 0);
    }
}
