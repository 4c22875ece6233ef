//! PostgreSQL implementation of the Storage Port.
//!
//! Grounded on `openibank-db::repos::wallet`'s `pool.begin()` → `SELECT
//! ... FOR UPDATE` → mutate → `tx.commit()` shape: `read_asset_tip` locks
//! the asset's row set for the duration of the transaction so a second
//! concurrent append blocks until the first commits or rolls back;
//! `read_idempotency` does the same for the idempotency key. Conflicts on
//! insert surface as `DbError::Duplicate`, which the coordinator
//! translates per the append-path contract.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Row, Transaction};

use ledger_core::Envelope;
use ledger_outbox::OutboxRow;
use ledger_types::{AssetId, TenantId};

use crate::config::DatabaseConfig;
use crate::error::{DbError, DbResult};
use crate::port::{AssetTip, IdempotencyRecord, StoragePort};

/// Owns the PostgreSQL connection pool. Analogous to `openibank-db`'s
/// `Database`, minus the Redis half this ledger has no use for.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pg_max_connections)
            .min_connections(config.pg_min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.pg_acquire_timeout_secs))
            .connect(&config.postgres_url)
            .await
            .map_err(DbError::from)?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> DbResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DbError::Migration(e.to_string()))
    }

    pub async fn health_check(&self) -> DbResult<bool> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(true)
    }

    pub fn storage_port(&self) -> PostgresStoragePort {
        PostgresStoragePort {
            pool: self.pool.clone(),
        }
    }
}

pub struct PostgresStoragePort {
    pool: PgPool,
}

impl PostgresStoragePort {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505")
    )
}

#[async_trait]
impl StoragePort for PostgresStoragePort {
    type Tx<'c> = Transaction<'c, Postgres>;

    async fn begin(&self) -> Result<Self::Tx<'_>, DbError> {
        Ok(self.pool.begin().await?)
    }

    async fn read_idempotency<'c>(
        &self,
        tx: &mut Self::Tx<'c>,
        tenant_id: &TenantId,
        idempotency_key: &str,
    ) -> Result<Option<IdempotencyRecord>, DbError> {
        let row = sqlx::query(
            "SELECT request_hash, response_json FROM idempotency_keys \
             WHERE tenant_id = $1 AND idempotency_key = $2 FOR UPDATE",
        )
        .bind(tenant_id.as_str())
        .bind(idempotency_key)
        .fetch_optional(&mut **tx)
        .await?;

        let Some(row) = row else { return Ok(None) };
        let fingerprint: String = row.try_get("request_hash")?;
        let response_json: serde_json::Value = row.try_get("response_json")?;
        let stored_response: Envelope = serde_json::from_value(response_json)?;

        Ok(Some(IdempotencyRecord {
            request_fingerprint: fingerprint,
            stored_response,
        }))
    }

    async fn read_asset_tip<'c>(
        &self,
        tx: &mut Self::Tx<'c>,
        tenant_id: &TenantId,
        asset_id: &AssetId,
    ) -> Result<Option<AssetTip>, DbError> {
        let row = sqlx::query(
            "SELECT aggregate_version, event_hash FROM event_store \
             WHERE tenant_id = $1 AND asset_id = $2 \
             ORDER BY aggregate_version DESC LIMIT 1 FOR UPDATE",
        )
        .bind(tenant_id.as_str())
        .bind(asset_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await?;

        let Some(row) = row else { return Ok(None) };
        let current_version: i64 = row.try_get("aggregate_version")?;
        let current_event_hash: String = row.try_get("event_hash")?;

        Ok(Some(AssetTip {
            current_version: current_version as u64,
            current_event_hash,
        }))
    }

    async fn insert_event<'c>(&self, tx: &mut Self::Tx<'c>, envelope: &Envelope) -> Result<(), DbError> {
        let payload_json = serde_json::to_value(&envelope.payload)?;
        let evidence_json = serde_json::to_value(&envelope.evidence)?;

        let result = sqlx::query(
            "INSERT INTO event_store \
             (event_id, asset_id, tenant_id, aggregate_version, event_type, \
              emitter_class, emitter_id, ts_utc, evidence_policy, evidence_hash, \
              waiver_reason, payload_json, evidence_json, prev_event_hash, event_hash, signature) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(envelope.event_id.as_uuid())
        .bind(envelope.asset_id.as_uuid())
        .bind(envelope.tenant_id.as_str())
        .bind(envelope.aggregate_version as i64)
        .bind(&envelope.event_type)
        .bind(envelope.emitter_class.to_string())
        .bind(&envelope.emitter_id)
        .bind(&envelope.timestamp)
        .bind(envelope.evidence_policy.to_string())
        .bind(&envelope.evidence_hash)
        .bind(&envelope.waiver_reason)
        .bind(payload_json)
        .bind(evidence_json)
        .bind(&envelope.prev_event_hash)
        .bind(&envelope.event_hash)
        .bind(&envelope.signature)
        .execute(&mut **tx)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(DbError::Duplicate("event_store".to_string()))
            }
            Err(e) => Err(DbError::from(e)),
        }
    }

    async fn insert_idempotency<'c>(
        &self,
        tx: &mut Self::Tx<'c>,
        tenant_id: &TenantId,
        idempotency_key: &str,
        request_fingerprint: &str,
        response: &Envelope,
    ) -> Result<(), DbError> {
        let response_json = serde_json::to_value(response)?;

        let result = sqlx::query(
            "INSERT INTO idempotency_keys \
             (tenant_id, idempotency_key, request_hash, response_json, created_at) \
             VALUES ($1, $2, $3, $4, now())",
        )
        .bind(tenant_id.as_str())
        .bind(idempotency_key)
        .bind(request_fingerprint)
        .bind(response_json)
        .execute(&mut **tx)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(DbError::Duplicate("idempotency_keys".to_string()))
            }
            Err(e) => Err(DbError::from(e)),
        }
    }

    async fn insert_outbox<'c>(&self, tx: &mut Self::Tx<'c>, row: &OutboxRow) -> Result<(), DbError> {
        let payload_json = serde_json::to_value(&row.payload)?;

        sqlx::query(
            "INSERT INTO outbox_webhooks (outbox_id, tenant_id, topic, payload_json, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(row.outbox_id.as_uuid())
        .bind(row.tenant_id.as_str())
        .bind(&row.topic)
        .bind(payload_json)
        .bind(row.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn commit<'c>(&self, tx: Self::Tx<'c>) -> Result<(), DbError> {
        tx.commit().await?;
        Ok(())
    }

    async fn rollback<'c>(&self, tx: Self::Tx<'c>) -> Result<(), DbError> {
        tx.rollback().await?;
        Ok(())
    }
}
