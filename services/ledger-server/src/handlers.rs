//! The one mutation endpoint and the two read-side stubs.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::Value;

use ledger_core::LedgerError;
use ledger_storage::StoragePort;
use ledger_types::{AssetId, TenantId};

use crate::error::{ApiError, ApiResult};
use crate::extractors::AuthenticatedCaller;
use crate::state::AppState;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, LedgerError> {
    headers
        .get(name)
        .ok_or_else(|| LedgerError::BadRequest(format!("{name} header is required")))?
        .to_str()
        .map_err(|_| LedgerError::BadRequest(format!("{name} header is not valid UTF-8")))
}

/// `POST /v1/tenants/{tenant_id}/assets/{asset_id}/events`
///
/// The path's `tenant_id` is routing sugar only; the authoritative
/// tenant scope is the one resolved by upstream auth middleware. A
/// mismatch between the two is rejected before a transaction ever opens.
pub async fn append_event(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, asset_id)): Path<(String, String)>,
    caller: AuthenticatedCaller,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    if tenant_id != caller.tenant_id.as_str() {
        return Err(LedgerError::BadRequest("path tenant_id does not match authenticated tenant".into()).into());
    }
    let asset_id = asset_id
        .parse()
        .map_err(|_| ApiError(LedgerError::BadRequest("asset_id must be a UUID".into())))?;

    let if_match = header_str(&headers, "if-match")?;
    let idempotency_key = header_str(&headers, "idempotency-key")?;

    let envelope = state
        .coordinator
        .append(
            TenantId::new(tenant_id),
            asset_id,
            caller.role,
            caller.emitter_id.clone(),
            body,
            if_match,
            idempotency_key,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(serde_json::to_value(envelope).unwrap())))
}

/// `GET /v1/tenants/{tenant_id}/assets/{asset_id}/tip` — thin passthrough
/// to the current chain tip. Read-side projection is out of core scope;
/// this exists only so the tip isn't otherwise unreachable.
pub async fn get_tip(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, asset_id)): Path<(String, String)>,
    caller: AuthenticatedCaller,
) -> ApiResult<Json<Value>> {
    if tenant_id != caller.tenant_id.as_str() {
        return Err(LedgerError::BadRequest("path tenant_id does not match authenticated tenant".into()).into());
    }
    let asset_id: AssetId = asset_id
        .parse()
        .map_err(|_| ApiError(LedgerError::BadRequest("asset_id must be a UUID".into())))?;

    let mut tx = state
        .storage
        .begin()
        .await
        .map_err(|e| ApiError(LedgerError::StorageError(e.to_string())))?;
    let tip = state
        .storage
        .read_asset_tip(&mut tx, &caller.tenant_id, &asset_id)
        .await
        .map_err(|e| ApiError(LedgerError::StorageError(e.to_string())))?;
    state
        .storage
        .commit(tx)
        .await
        .map_err(|e| ApiError(LedgerError::StorageError(e.to_string())))?;

    Ok(Json(serde_json::json!({
        "current_version": tip.as_ref().map(|t| t.current_version).unwrap_or(0),
        "current_event_hash": tip.map(|t| t.current_event_hash).unwrap_or_else(|| ledger_types::GENESIS_HASH.to_string()),
    })))
}

/// `GET /v1/tenants/{tenant_id}/assets/{asset_id}/lineage` — lineage
/// reconstruction is an explicit non-goal of the core path; preserved as
/// a 501 stub, matching the original router's own unimplemented route.
pub async fn get_lineage() -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}
