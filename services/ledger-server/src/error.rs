//! Maps `LedgerError` onto HTTP status codes. The only place in the
//! workspace permitted to do so, per the coordinator's uniform result
//! channel.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use ledger_core::LedgerError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LedgerError::BadRequest(_) | LedgerError::EvidencePolicyViolation { .. } => {
                StatusCode::BAD_REQUEST
            }
            LedgerError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            LedgerError::UnknownEventType(_) => StatusCode::NOT_FOUND,
            LedgerError::PreconditionFailed { .. } | LedgerError::IdempotencyMismatch(_) => {
                StatusCode::CONFLICT
            }
            LedgerError::Timeout(_) | LedgerError::ConcurrencyConflict => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            LedgerError::SignatureError(_)
            | LedgerError::KeyFormatError(_)
            | LedgerError::EncodingError(_)
            | LedgerError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorBody {
            error: self.0.taxonomy_name().to_string(),
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
