use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("tenant context is required but was not supplied")]
    TenantContextRequired,
    #[error("order direction `{0}` must be ASC or DESC")]
    InvalidOrderDirection(String),
    #[error("batch insert requires at least one row")]
    EmptyInsert,
    #[error("dialect `{dialect}` does not support {feature}")]
    UnsupportedFeature { dialect: String, feature: String },
}

pub type Result<T> = std::result::Result<T, CompileError>;
