use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("driver error: {0}")]
    Driver(#[from] lpdb_driver::Error),
    #[error("dialect error: {0}")]
    Dialect(#[from] lpdb_core::Error),
    #[error("stored schema payload for `{app_id}/{schema_name}` is not valid JSON: {source}")]
    CorruptPayload {
        app_id: String,
        schema_name: String,
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, RegistryError>;
