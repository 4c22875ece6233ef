//! The transactional surface the Append Coordinator relies on.
//!
//! Every operation takes the open transaction handle the coordinator
//! acquired from `begin`; ordering and consistency guarantees (row locks,
//! unique-constraint-as-conflict-detector) are part of each
//! implementation's contract, not this trait's.

use async_trait::async_trait;

use ledger_core::Envelope;
use ledger_outbox::OutboxRow;
use ledger_types::{AssetId, TenantId};

use crate::error::DbError;

/// The stored idempotency record for a `(tenant_id, idempotency_key)` pair.
#[derive(Debug, Clone)]
pub struct IdempotencyRecord {
    pub request_fingerprint: String,
    pub stored_response: Envelope,
}

/// The current tip of an asset's chain.
#[derive(Debug, Clone)]
pub struct AssetTip {
    pub current_version: u64,
    pub current_event_hash: String,
}

/// Transactional primitives the coordinator composes into one append.
///
/// `Tx` is an associated type rather than a concrete `sqlx::Transaction`
/// so the coordinator can be exercised against an in-memory double
/// without a live database.
#[async_trait]
pub trait StoragePort: Send + Sync {
    type Tx<'c>: Send
    where
        Self: 'c;

    async fn begin(&self) -> Result<Self::Tx<'_>, DbError>;

    async fn read_idempotency<'c>(
        &self,
        tx: &mut Self::Tx<'c>,
        tenant_id: &TenantId,
        idempotency_key: &str,
    ) -> Result<Option<IdempotencyRecord>, DbError>;

    /// Returns the highest-version event for the asset. Must block
    /// concurrent appenders to the same `(tenant_id, asset_id)` until this
    /// transaction commits or rolls back.
    async fn read_asset_tip<'c>(
        &self,
        tx: &mut Self::Tx<'c>,
        tenant_id: &TenantId,
        asset_id: &AssetId,
    ) -> Result<Option<AssetTip>, DbError>;

    /// Fails with `DbError::Duplicate` if `(tenant_id, asset_id,
    /// aggregate_version)` or `event_id` already exists.
    async fn insert_event<'c>(&self, tx: &mut Self::Tx<'c>, envelope: &Envelope) -> Result<(), DbError>;

    /// Fails with `DbError::Duplicate` on a repeated `(tenant_id,
    /// idempotency_key)`.
    async fn insert_idempotency<'c>(
        &self,
        tx: &mut Self::Tx<'c>,
        tenant_id: &TenantId,
        idempotency_key: &str,
        request_fingerprint: &str,
        response: &Envelope,
    ) -> Result<(), DbError>;

    async fn insert_outbox<'c>(&self, tx: &mut Self::Tx<'c>, row: &OutboxRow) -> Result<(), DbError>;

    async fn commit<'c>(&self, tx: Self::Tx<'c>) -> Result<(), DbError>;

    async fn rollback<'c>(&self, tx: Self::Tx<'c>) -> Result<(), DbError>;
}
