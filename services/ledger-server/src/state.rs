//! Shared application state.

use std::sync::Arc;

use ledger_coordinator::Coordinator;
use ledger_storage::PostgresStoragePort;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator<PostgresStoragePort>>,
    pub storage: Arc<PostgresStoragePort>,
}
