use thiserror::Error;

/// Errors raised while opening, using, or draining a pooled connection (§7:
/// `ConnectionTransient`, `DrainTimeout`). Everything else unwinds from
/// `sqlx::Error` with the failing SQL attached for diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    #[error("connection error executing `{sql}`: {source}")]
    Connection {
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("transaction failed: {source}")]
    Transaction {
        #[source]
        source: sqlx::Error,
    },

    #[error("drain timed out after {elapsed_ms}ms with {remaining} active queries still running")]
    DrainTimeout { elapsed_ms: u64, remaining: usize },

    #[error("driver is draining; no new queries are accepted")]
    Draining,

    #[error("health check timed out after {timeout_ms}ms")]
    HealthCheckTimeout { timeout_ms: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Connection-class error codes/messages the retry utility treats as
/// transient (§4.2). Matched against `sqlx::Error`'s rendered text because
/// `sqlx` does not expose a single enum spanning all three backends'
/// driver-level codes.
const TRANSIENT_MARKERS: &[&str] = &[
    "ECONNREFUSED",
    "ETIMEDOUT",
    "ECONNRESET",
    "EPIPE",
    "ENOTCONN",
    "57P01",
    "57P02",
    "57P03",
    "PROTOCOL_CONNECTION_LOST",
    "ER_CON_COUNT_ERROR",
];

/// True when `err` belongs to the connection-class taxonomy the retry
/// utility is allowed to retry, per the fixed list plus any caller-supplied
/// extensions.
#[must_use]
pub fn is_transient(err: &sqlx::Error, extra_markers: &[&str]) -> bool {
    if matches!(err, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)) {
        return true;
    }

    let rendered = err.to_string();
    TRANSIENT_MARKERS
        .iter()
        .chain(extra_markers)
        .any(|marker| rendered.contains(marker))
}
