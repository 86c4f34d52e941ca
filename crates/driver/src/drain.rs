use std::time::{Duration, Instant};

/// Progress phases emitted during `drainAndClose` (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainPhase {
    Draining,
    Cancelling,
    Closing,
    Complete,
}

#[derive(Debug, Clone)]
pub struct DrainOptions {
    pub timeout: Duration,
    pub force_cancel_on_timeout: bool,
}

impl Default for DrainOptions {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), force_cancel_on_timeout: true }
    }
}

#[derive(Debug, Clone)]
pub struct DrainResult {
    pub success: bool,
    pub completed_queries: usize,
    pub cancelled_queries: usize,
    pub elapsed_ms: u64,
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
