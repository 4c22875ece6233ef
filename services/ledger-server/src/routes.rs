//! Route table.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

pub fn v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/tenants/:tenant_id/assets/:asset_id/events",
            post(handlers::append_event),
        )
        .route(
            "/tenants/:tenant_id/assets/:asset_id/tip",
            get(handlers::get_tip),
        )
        .route(
            "/tenants/:tenant_id/assets/:asset_id/lineage",
            get(handlers::get_lineage),
        )
}
