use thiserror::Error;

/// Errors raised by schema validation, dialect capability checks, and the
/// diff engine's breaking-change policy (§7).
///
/// Higher-level crates (`lpdb-migrate`, `lpdb-registry`, `lpdb-compiler`)
/// define their own error enums and wrap this one with `#[from]` rather than
/// reusing it directly, the same way execution failures layer over
/// dialect-capability failures here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("schema validation failed for table `{table}`: {reason}")]
    SchemaValidation { table: String, reason: String },

    #[error("dialect `{dialect}` does not support {operation}: {remedy}")]
    UnsupportedFeature {
        dialect: String,
        operation: String,
        remedy: String,
    },

    #[error("dialect `{0}` is not supported for this operation")]
    DialectNotSupported(String),

    #[error("`{table}.{object}` is a breaking change; re-run with force to apply")]
    BreakingChange { table: String, object: String },
}

pub type Result<T> = std::result::Result<T, Error>;
