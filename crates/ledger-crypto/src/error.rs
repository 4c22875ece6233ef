use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("value is not canonically encodable: {0}")]
    Encoding(String),

    #[error("key material is malformed: {0}")]
    KeyFormat(String),

    #[error("signature verification failed: {0}")]
    Signature(String),

    #[error("json serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
