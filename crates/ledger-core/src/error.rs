//! Uniform error taxonomy for the append path.
//!
//! One enum, matching the depth of `openibank-core`'s `CoreError` and
//! `openibank-issuer`'s `IssuerError`; the HTTP edge is the only place
//! permitted to translate a variant into a status code.

use thiserror::Error;

use ledger_crypto::CryptoError;
use ledger_registry::RegistryError;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    #[error("permission denied: emitter class {emitter_class} not allowed for {event_type}")]
    PermissionDenied {
        emitter_class: String,
        event_type: String,
    },

    #[error("evidence policy violation: expected {expected}, got {actual}")]
    EvidencePolicyViolation { expected: String, actual: String },

    #[error("precondition failed: expected version {expected}, current version {current}")]
    PreconditionFailed { expected: u64, current: u64 },

    #[error("idempotency mismatch for key {0}")]
    IdempotencyMismatch(String),

    #[error("concurrency conflict")]
    ConcurrencyConflict,

    #[error("timed out waiting on {0}")]
    Timeout(String),

    #[error("signature error: {0}")]
    SignatureError(String),

    #[error("key format error: {0}")]
    KeyFormatError(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl LedgerError {
    /// The conceptual taxonomy name from the error design (not a type name),
    /// used by the HTTP edge to map onto a transport status code.
    pub fn taxonomy_name(&self) -> &'static str {
        match self {
            LedgerError::BadRequest(_) => "BadRequest",
            LedgerError::UnknownEventType(_) => "UnknownEventType",
            LedgerError::PermissionDenied { .. } => "PermissionDenied",
            LedgerError::EvidencePolicyViolation { .. } => "EvidencePolicyViolation",
            LedgerError::PreconditionFailed { .. } => "PreconditionFailed",
            LedgerError::IdempotencyMismatch(_) => "IdempotencyMismatch",
            LedgerError::ConcurrencyConflict => "ConcurrencyConflict",
            LedgerError::Timeout(_) => "Timeout",
            LedgerError::SignatureError(_) => "SignatureError",
            LedgerError::KeyFormatError(_) => "KeyFormatError",
            LedgerError::EncodingError(_) => "EncodingError",
            LedgerError::StorageError(_) => "StorageError",
        }
    }
}

impl From<CryptoError> for LedgerError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Encoding(msg) => LedgerError::EncodingError(msg),
            CryptoError::KeyFormat(msg) => LedgerError::KeyFormatError(msg),
            CryptoError::Signature(msg) => LedgerError::SignatureError(msg),
            CryptoError::Json(err) => LedgerError::EncodingError(err.to_string()),
        }
    }
}

impl From<RegistryError> for LedgerError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotFound(event_type) => LedgerError::UnknownEventType(event_type),
            RegistryError::Load(err) => LedgerError::StorageError(err.to_string()),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
