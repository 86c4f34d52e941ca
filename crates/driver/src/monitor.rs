use std::sync::Arc;

use sqlx::AnyPool;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::PoolMonitorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtilizationLevel {
    Normal,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy)]
pub struct PoolStats {
    pub active: u32,
    pub idle: u32,
    pub max: u32,
}

impl PoolStats {
    #[must_use]
    pub fn from_pool(pool: &AnyPool) -> Self {
        let size = pool.size();
        let idle = u32::try_from(pool.num_idle()).unwrap_or(u32::MAX);
        Self { active: size.saturating_sub(idle), idle, max: pool.options().get_max_connections() }
    }

    /// Classifies `active/max` against the configured thresholds (§4.2).
    /// Zero `max` is treated as normal.
    #[must_use]
    pub fn utilization_level(&self, config: &PoolMonitorConfig) -> UtilizationLevel {
        if self.max == 0 {
            return UtilizationLevel::Normal;
        }

        let ratio = f64::from(self.active) / f64::from(self.max);
        if ratio >= config.critical_threshold {
            UtilizationLevel::Critical
        } else if ratio >= config.warning_threshold {
            UtilizationLevel::Warning
        } else {
            UtilizationLevel::Normal
        }
    }
}

pub type MonitorCallback = Arc<dyn Fn(UtilizationLevel) + Send + Sync>;

/// Polls `getPoolStats` and fires `on_level_change` only on entry into a new
/// level (§4.2): each threshold callback fires once per entry edge, and a
/// recovery callback fires on return to `normal`.
pub struct PoolMonitor {
    handle: Option<JoinHandle<()>>,
}

impl PoolMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self { handle: None }
    }

    pub fn start(&mut self, pool: AnyPool, config: PoolMonitorConfig, on_level_change: MonitorCallback) {
        if self.handle.is_some() {
            return;
        }

        let current_level = Arc::new(Mutex::new(UtilizationLevel::Normal));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.poll_interval);
            loop {
                ticker.tick().await;
                let stats = PoolStats::from_pool(&pool);
                let level = stats.utilization_level(&config);
                let mut guard = current_level.lock().await;
                if *guard != level {
                    *guard = level;
                    on_level_change(level);
                }
            }
        });

        self.handle = Some(handle);
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Default for PoolMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PoolMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PoolMonitorConfig {
        PoolMonitorConfig { poll_interval: std::time::Duration::from_secs(1), warning_threshold: 0.80, critical_threshold: 0.95 }
    }

    #[test]
    fn exactly_at_warning_threshold_triggers_warning() {
        let stats = PoolStats { active: 80, idle: 0, max: 100 };
        assert_eq!(stats.utilization_level(&config()), UtilizationLevel::Warning);
    }

    #[test]
    fn exactly_at_critical_threshold_triggers_critical() {
        let stats = PoolStats { active: 95, idle: 0, max: 100 };
        assert_eq!(stats.utilization_level(&config()), UtilizationLevel::Critical);
    }

    #[test]
    fn below_warning_is_normal() {
        let stats = PoolStats { active: 10, idle: 0, max: 100 };
        assert_eq!(stats.utilization_level(&config()), UtilizationLevel::Normal);
    }

    #[test]
    fn zero_max_is_always_normal() {
        let stats = PoolStats { active: 0, idle: 0, max: 0 };
        assert_eq!(stats.utilization_level(&config()), UtilizationLevel::Normal);
    }
}
