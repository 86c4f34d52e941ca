use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlx::AnyPool;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::HealthCheckConfig;

/// Result of one health-check round trip (§4.2).
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub latency_ms: u64,
    pub last_checked_at: Instant,
    pub error: Option<String>,
}

/// Acquires a connection, issues `SELECT 1`, and records the outcome. Races
/// the round trip against `timeout`.
pub async fn check_once(pool: &AnyPool, timeout: Duration) -> HealthStatus {
    let start = Instant::now();
    let outcome = tokio::time::timeout(timeout, sqlx::query("SELECT 1").execute(pool)).await;

    match outcome {
        Ok(Ok(_)) => HealthStatus { healthy: true, latency_ms: elapsed_ms(start), last_checked_at: Instant::now(), error: None },
        Ok(Err(source)) => HealthStatus {
            healthy: false,
            latency_ms: elapsed_ms(start),
            last_checked_at: Instant::now(),
            error: Some(source.to_string()),
        },
        Err(_) => HealthStatus {
            healthy: false,
            latency_ms: elapsed_ms(start),
            last_checked_at: Instant::now(),
            error: Some(format!("health check timed out after {}ms", timeout.as_millis())),
        },
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Periodic health-check task handle. Invokes `on_health_change` once per
/// healthy/unhealthy transition, never on a steady-state result.
pub struct HealthChecker {
    handle: Option<JoinHandle<()>>,
    last_status: Arc<Mutex<Option<HealthStatus>>>,
}

impl HealthChecker {
    #[must_use]
    pub fn new() -> Self {
        Self { handle: None, last_status: Arc::new(Mutex::new(None)) }
    }

    pub fn start(&mut self, pool: AnyPool, config: HealthCheckConfig) {
        if self.handle.is_some() {
            return;
        }

        let last_status = Arc::clone(&self.last_status);
        let was_healthy = Arc::new(AtomicBool::new(true));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.interval);
            loop {
                ticker.tick().await;
                let status = check_once(&pool, config.timeout).await;
                let previously_healthy = was_healthy.swap(status.healthy, Ordering::SeqCst);
                if previously_healthy != status.healthy {
                    if status.healthy {
                        tracing::info!(latency_ms = status.latency_ms, "health check transitioned to healthy");
                    } else {
                        tracing::warn!(error = ?status.error, "health check transitioned to unhealthy");
                    }
                    if let Some(callback) = &config.on_health_change {
                        callback(status.healthy);
                    }
                }
                *last_status.lock().await = Some(status);
            }
        });

        self.handle = Some(handle);
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub async fn last_status(&self) -> Option<HealthStatus> {
        self.last_status.lock().await.clone()
    }
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HealthChecker {
    fn drop(&mut self) {
        self.stop();
    }
}
