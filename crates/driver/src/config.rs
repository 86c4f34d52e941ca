use std::sync::Arc;
use std::time::Duration;

/// The sole required configuration for a driver is a connection string;
/// everything else here defaults (§6).
#[derive(Clone)]
pub struct DriverConfig {
    pub connection_string: String,
    pub max_connections: u32,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
    pub health_check: HealthCheckConfig,
    /// Extra error markers the retry utility should treat as transient,
    /// appended to the fixed taxonomy (§4.2).
    pub extra_retry_markers: Vec<&'static str>,
}

impl DriverConfig {
    #[must_use]
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            health_check: HealthCheckConfig::default(),
            extra_retry_markers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    #[must_use]
    pub fn with_health_check(mut self, health_check: HealthCheckConfig) -> Self {
        self.health_check = health_check;
        self
    }
}

const DEFAULT_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone)]
pub struct HealthCheckConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub timeout: Duration,
    /// Invoked once per healthy/unhealthy transition (§4.2), never on a
    /// steady-state result.
    pub on_health_change: Option<Arc<dyn Fn(bool) + Send + Sync>>,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(5),
            on_health_change: None,
        }
    }
}

impl std::fmt::Debug for HealthCheckConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthCheckConfig")
            .field("enabled", &self.enabled)
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .field("on_health_change", &self.on_health_change.is_some())
            .finish()
    }
}

/// Pool utilization thresholds the monitor classifies `active/max` into
/// (§4.2); defaults 0.80/0.95.
#[derive(Debug, Clone, Copy)]
pub struct PoolMonitorConfig {
    pub poll_interval: Duration,
    pub warning_threshold: f64,
    pub critical_threshold: f64,
}

impl Default for PoolMonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            warning_threshold: 0.80,
            critical_threshold: 0.95,
        }
    }
}
