//! In-memory `StoragePort` double used to exercise the Append Coordinator
//! in unit tests without a live PostgreSQL instance.
//!
//! Serialization is coarser than the PostgreSQL implementation's
//! per-`(tenant_id, asset_id)` row lock — one process-wide mutex stands
//! in for it — which is sufficient to prove the coordinator's ordering
//! and rollback contracts under test, if not its cross-asset concurrency.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use ledger_core::Envelope;
use ledger_outbox::OutboxRow;
use ledger_types::{AssetId, OutboxId, TenantId};

use crate::error::DbError;
use crate::port::{AssetTip, IdempotencyRecord, StoragePort};

#[derive(Default)]
pub struct InMemoryState {
    events: Vec<Envelope>,
    idempotency: HashMap<(String, String), IdempotencyRecord>,
    outbox: Vec<OutboxRow>,
}

#[derive(Clone, Default)]
pub struct InMemoryStoragePort {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryStoragePort {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn event_count(&self) -> usize {
        self.state.lock().await.events.len()
    }

    pub async fn outbox_count(&self) -> usize {
        self.state.lock().await.outbox.len()
    }
}

/// Tracks what this in-flight transaction added so `rollback` can undo it
/// without disturbing anything another (necessarily sequential, given the
/// held mutex) transaction committed earlier.
pub struct InMemoryTx {
    guard: OwnedMutexGuard<InMemoryState>,
    added_event: Option<(TenantId, AssetId, u64)>,
    added_idempotency: Option<(String, String)>,
    added_outbox: Option<OutboxId>,
}

#[async_trait]
impl StoragePort for InMemoryStoragePort {
    type Tx<'c> = InMemoryTx;

    async fn begin(&self) -> Result<Self::Tx<'_>, DbError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        Ok(InMemoryTx {
            guard,
            added_event: None,
            added_idempotency: None,
            added_outbox: None,
        })
    }

    async fn read_idempotency<'c>(
        &self,
        tx: &mut Self::Tx<'c>,
        tenant_id: &TenantId,
        idempotency_key: &str,
    ) -> Result<Option<IdempotencyRecord>, DbError> {
        let key = (tenant_id.as_str().to_string(), idempotency_key.to_string());
        Ok(tx.guard.idempotency.get(&key).cloned())
    }

    async fn read_asset_tip<'c>(
        &self,
        tx: &mut Self::Tx<'c>,
        tenant_id: &TenantId,
        asset_id: &AssetId,
    ) -> Result<Option<AssetTip>, DbError> {
        let tip = tx
            .guard
            .events
            .iter()
            .filter(|e| &e.tenant_id == tenant_id && &e.asset_id == asset_id)
            .max_by_key(|e| e.aggregate_version);

        Ok(tip.map(|e| AssetTip {
            current_version: e.aggregate_version,
            current_event_hash: e.event_hash.clone(),
        }))
    }

    async fn insert_event<'c>(&self, tx: &mut Self::Tx<'c>, envelope: &Envelope) -> Result<(), DbError> {
        let conflict = tx.guard.events.iter().any(|e| {
            e.event_id == envelope.event_id
                || (e.tenant_id == envelope.tenant_id
                    && e.asset_id == envelope.asset_id
                    && e.aggregate_version == envelope.aggregate_version)
        });
        if conflict {
            return Err(DbError::Duplicate("event_store".to_string()));
        }
        tx.guard.events.push(envelope.clone());
        tx.added_event = Some((
            envelope.tenant_id.clone(),
            envelope.asset_id,
            envelope.aggregate_version,
        ));
        Ok(())
    }

    async fn insert_idempotency<'c>(
        &self,
        tx: &mut Self::Tx<'c>,
        tenant_id: &TenantId,
        idempotency_key: &str,
        request_fingerprint: &str,
        response: &Envelope,
    ) -> Result<(), DbError> {
        let key = (tenant_id.as_str().to_string(), idempotency_key.to_string());
        if tx.guard.idempotency.contains_key(&key) {
            return Err(DbError::Duplicate("idempotency_keys".to_string()));
        }
        tx.guard.idempotency.insert(
            key.clone(),
            IdempotencyRecord {
                request_fingerprint: request_fingerprint.to_string(),
                stored_response: response.clone(),
            },
        );
        tx.added_idempotency = Some(key);
        Ok(())
    }

    async fn insert_outbox<'c>(&self, tx: &mut Self::Tx<'c>, row: &OutboxRow) -> Result<(), DbError> {
        tx.guard.outbox.push(row.clone());
        tx.added_outbox = Some(row.outbox_id);
        Ok(())
    }

    async fn commit<'c>(&self, _tx: Self::Tx<'c>) -> Result<(), DbError> {
        Ok(())
    }

    async fn rollback<'c>(&self, mut tx: Self::Tx<'c>) -> Result<(), DbError> {
        if let Some((tenant_id, asset_id, version)) = tx.added_event.take() {
            tx.guard
                .events
                .retain(|e| !(e.tenant_id == tenant_id && e.asset_id == asset_id && e.aggregate_version == version));
        }
        if let Some(key) = tx.added_idempotency.take() {
            tx.guard.idempotency.remove(&key);
        }
        if let Some(outbox_id) = tx.added_outbox.take() {
            tx.guard.outbox.retain(|o| o.outbox_id != outbox_id);
        }
        Ok(())
    }
}
