use thiserror::Error;

/// Backend-facing storage errors, translated into `LedgerError` at each
/// `StoragePort` method boundary rather than leaking `sqlx` types upward.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("unique constraint violated: {0}")]
    Duplicate(String),

    #[error("row not found")]
    NotFound,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type DbResult<T> = Result<T, DbError>;
