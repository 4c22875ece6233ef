//! The authentication boundary: `tenant_id` and `role` are read from
//! request extensions set by upstream middleware, never from the JSON
//! body. This crate does not implement that middleware — it is an
//! external collaborator's concern — but defines the extractor contract
//! it must populate.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use ledger_types::{Role, TenantId};

/// Populated by upstream auth middleware via `parts.extensions.insert(..)`.
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller {
    pub tenant_id: TenantId,
    pub role: Role,
    pub emitter_id: String,
}

#[derive(Debug, Serialize)]
struct Unauthorized {
    error: &'static str,
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(Unauthorized {
            error: "missing authenticated context",
        }),
    )
        .into_response()
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedCaller
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedCaller>()
            .cloned()
            .ok_or_else(unauthorized)
    }
}
