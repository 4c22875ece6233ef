//! The Append Coordinator — the heart of the system.
//!
//! Orchestrates the end-to-end append under a single transaction with the
//! ordering and failure semantics laid out step by step: idempotency
//! check, tip read + version check (serialized under the storage port's
//! lock), envelope build, the three inserts, commit. Grounded on the
//! `mint`/`burn` orchestration shape in `openibank-issuer` — validate,
//! gate, build/sign, persist, return — fused with the exact transaction
//! step ordering of the append path this ledger was built to replace.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};

use ledger_core::{build_envelope, Envelope, LedgerError, Validator};
use ledger_crypto::{canonical_bytes, sha256_hex, PrivateKey};
use ledger_outbox::outbox_row_for;
use ledger_registry::Registry;
use ledger_storage::{DbError, StoragePort};
use ledger_types::{AssetId, Role, TenantId, GENESIS_HASH};

fn storage_err(e: DbError) -> LedgerError {
    LedgerError::StorageError(e.to_string())
}

/// Orchestrates appends for one process; cheap to clone, holds only
/// shared, read-only/immutable state (the registry, the signing key, and
/// a handle to the storage backend).
pub struct Coordinator<S: StoragePort> {
    storage: Arc<S>,
    registry: Arc<Registry>,
    signing_key: Arc<PrivateKey>,
}

impl<S: StoragePort> Coordinator<S> {
    pub fn new(storage: Arc<S>, registry: Arc<Registry>, signing_key: Arc<PrivateKey>) -> Self {
        Self {
            storage,
            registry,
            signing_key,
        }
    }

    /// `append(tenant_id, asset_id, role, submitted_event, if_match_header,
    /// idempotency_key) -> envelope`.
    #[allow(clippy::too_many_arguments)]
    pub async fn append(
        &self,
        tenant_id: TenantId,
        asset_id: AssetId,
        role: Role,
        emitter_id: String,
        submitted_body: Value,
        if_match_header: &str,
        idempotency_key: &str,
    ) -> Result<Envelope, LedgerError> {
        // Pre-transaction: Validator (policy), fingerprint, If-Match parse.
        let validator = Validator::new(&self.registry);
        let validated = validator.validate(submitted_body, role)?;

        let fingerprint_input = json!({
            "asset_id": asset_id.to_string(),
            "event": {
                "event_type": validated.submitted.event_type,
                "payload": validated.submitted.payload,
                "evidence": validated.submitted.evidence,
            }
        });
        let request_fingerprint = sha256_hex(&canonical_bytes(&fingerprint_input)?);
        let if_match_version = ledger_core::parse_if_match(if_match_header)?;

        let mut tx = self.storage.begin().await.map_err(storage_err)?;

        // Step 1: idempotency short-circuit.
        match self
            .storage
            .read_idempotency(&mut tx, &tenant_id, idempotency_key)
            .await
            .map_err(storage_err)?
        {
            Some(existing) if existing.request_fingerprint == request_fingerprint => {
                self.storage.commit(tx).await.map_err(storage_err)?;
                return Ok(existing.stored_response);
            }
            Some(_) => {
                let _ = self.storage.rollback(tx).await;
                return Err(LedgerError::IdempotencyMismatch(idempotency_key.to_string()));
            }
            None => {}
        }

        // Step 2: tip read, serialized per-asset by the storage port's lock.
        let tip = self
            .storage
            .read_asset_tip(&mut tx, &tenant_id, &asset_id)
            .await
            .map_err(storage_err)?;
        let (current_version, prev_hash) = match tip {
            Some(t) => (t.current_version, t.current_event_hash),
            None => (0, GENESIS_HASH.to_string()),
        };

        // Step 3: optimistic-concurrency precondition, after the lock.
        if current_version != if_match_version {
            let _ = self.storage.rollback(tx).await;
            return Err(LedgerError::PreconditionFailed {
                expected: if_match_version,
                current: current_version,
            });
        }

        let next_version = current_version + 1;

        // Step 5: build and sign the envelope.
        let envelope = match build_envelope(
            tenant_id.clone(),
            asset_id,
            validated.submitted.event_type.clone(),
            validated.submitted.evidence.clone(),
            validated.submitted.payload.clone(),
            validated.emitter_class,
            emitter_id,
            next_version,
            prev_hash,
            validated.evidence_policy,
            &self.signing_key,
        ) {
            Ok(envelope) => envelope,
            Err(e) => {
                let _ = self.storage.rollback(tx).await;
                return Err(e);
            }
        };

        // Step 6: insert event; a conflict here means a peer committed
        // between steps 2 and 6 despite the lock.
        if let Err(e) = self.storage.insert_event(&mut tx, &envelope).await {
            let _ = self.storage.rollback(tx).await;
            return Err(match e {
                DbError::Duplicate(_) => LedgerError::PreconditionFailed {
                    expected: if_match_version,
                    current: current_version,
                },
                other => storage_err(other),
            });
        }

        // Step 7: insert idempotency record.
        if let Err(e) = self
            .storage
            .insert_idempotency(&mut tx, &tenant_id, idempotency_key, &request_fingerprint, &envelope)
            .await
        {
            let _ = self.storage.rollback(tx).await;
            return Err(match e {
                DbError::Duplicate(_) => LedgerError::IdempotencyMismatch(idempotency_key.to_string()),
                other => storage_err(other),
            });
        }

        // Step 8: insert outbox row.
        let outbox_row = outbox_row_for(tenant_id, &envelope, Utc::now());
        if let Err(e) = self.storage.insert_outbox(&mut tx, &outbox_row).await {
            let _ = self.storage.rollback(tx).await;
            return Err(storage_err(e));
        }

        // Step 9: commit.
        self.storage.commit(tx).await.map_err(storage_err)?;

        tracing::info!(
            asset_id = %envelope.asset_id,
            aggregate_version = envelope.aggregate_version,
            event_type = %envelope.event_type,
            "event appended"
        );

        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use ledger_registry::RegistryEntry;
    use ledger_storage::InMemoryStoragePort;
    use ledger_types::EmitterClass;
    use serde_json::json;
    use std::collections::{HashMap, HashSet};

    fn test_coordinator() -> Coordinator<InMemoryStoragePort> {
        let mut entries = HashMap::new();
        entries.insert(
            "ASSET_CREATED".to_string(),
            RegistryEntry {
                allowed_emitter_classes: HashSet::from([EmitterClass::Human]),
                evidence_policy: ledger_types::EvidencePolicy::Required,
            },
        );
        entries.insert(
            "RECONCILIATION_RUN".to_string(),
            RegistryEntry {
                allowed_emitter_classes: HashSet::from([EmitterClass::System]),
                evidence_policy: ledger_types::EvidencePolicy::Optional,
            },
        );
        let registry = Arc::new(Registry::new(entries));
        let key = Arc::new(ledger_crypto::load_private_key(&BASE64.encode([9u8; 32])).unwrap());
        let storage = Arc::new(InMemoryStoragePort::new());
        Coordinator::new(storage, registry, key)
    }

    fn s1_body() -> Value {
        json!({
            "event_type": "ASSET_CREATED",
            "evidence": {"policy": "REQUIRED", "evidence_hash": "sha256:aaaa"},
            "payload": {"name": "X"}
        })
    }

    #[tokio::test]
    async fn s1_first_append_creates_genesis_chained_event() {
        let coordinator = test_coordinator();
        let asset_id = AssetId::new();
        let envelope = coordinator
            .append(
                TenantId::new("t1"),
                asset_id,
                Role::Admin,
                "admin-1".to_string(),
                s1_body(),
                "0",
                "k1",
            )
            .await
            .unwrap();

        assert_eq!(envelope.aggregate_version, 1);
        assert_eq!(envelope.prev_event_hash, GENESIS_HASH);
        assert!(ledger_crypto::verify(
            &coordinator.signing_key.verifying_key(),
            envelope.event_hash.as_bytes(),
            &envelope.signature
        ));
    }

    #[tokio::test]
    async fn s2_idempotent_replay_returns_identical_envelope() {
        let coordinator = test_coordinator();
        let asset_id = AssetId::new();
        let first = coordinator
            .append(
                TenantId::new("t1"),
                asset_id,
                Role::Admin,
                "admin-1".to_string(),
                s1_body(),
                "0",
                "k1",
            )
            .await
            .unwrap();

        let second = coordinator
            .append(
                TenantId::new("t1"),
                asset_id,
                Role::Admin,
                "admin-1".to_string(),
                s1_body(),
                "0",
                "k1",
            )
            .await
            .unwrap();

        assert_eq!(first.event_hash, second.event_hash);
        assert_eq!(coordinator.storage.event_count().await, 1);
    }

    #[tokio::test]
    async fn s3_idempotency_key_collision_with_different_body() {
        let coordinator = test_coordinator();
        let asset_id = AssetId::new();
        coordinator
            .append(
                TenantId::new("t1"),
                asset_id,
                Role::Admin,
                "admin-1".to_string(),
                s1_body(),
                "0",
                "k1",
            )
            .await
            .unwrap();

        let mut different = s1_body();
        different["payload"]["name"] = json!("Y");

        let err = coordinator
            .append(
                TenantId::new("t1"),
                asset_id,
                Role::Admin,
                "admin-1".to_string(),
                different,
                "0",
                "k1",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::IdempotencyMismatch(_)));
        assert_eq!(coordinator.storage.event_count().await, 1);
    }

    #[tokio::test]
    async fn s4_stale_if_match_is_rejected() {
        let coordinator = test_coordinator();
        let asset_id = AssetId::new();
        coordinator
            .append(
                TenantId::new("t1"),
                asset_id,
                Role::Admin,
                "admin-1".to_string(),
                s1_body(),
                "0",
                "k1",
            )
            .await
            .unwrap();

        let err = coordinator
            .append(
                TenantId::new("t1"),
                asset_id,
                Role::Admin,
                "admin-1".to_string(),
                s1_body(),
                "0",
                "k2",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::PreconditionFailed { .. }));
        assert_eq!(coordinator.storage.event_count().await, 1);
    }

    #[tokio::test]
    async fn s5_happy_second_append_chains_correctly() {
        let coordinator = test_coordinator();
        let asset_id = AssetId::new();
        let first = coordinator
            .append(
                TenantId::new("t1"),
                asset_id,
                Role::Admin,
                "admin-1".to_string(),
                s1_body(),
                "0",
                "k1",
            )
            .await
            .unwrap();

        let second = coordinator
            .append(
                TenantId::new("t1"),
                asset_id,
                Role::Admin,
                "admin-1".to_string(),
                s1_body(),
                "1",
                "k2",
            )
            .await
            .unwrap();

        assert_eq!(second.aggregate_version, 2);
        assert_eq!(second.prev_event_hash, first.event_hash);
    }

    #[tokio::test]
    async fn s7_role_to_emitter_mismatch_is_permission_denied() {
        let coordinator = test_coordinator();
        let asset_id = AssetId::new();
        let body = json!({
            "event_type": "RECONCILIATION_RUN",
            "evidence": {"policy": "OPTIONAL"},
            "payload": {}
        });

        let err = coordinator
            .append(
                TenantId::new("t1"),
                asset_id,
                Role::User,
                "user-1".to_string(),
                body,
                "0",
                "k1",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::PermissionDenied { .. }));
        assert_eq!(coordinator.storage.event_count().await, 0);
    }

    #[tokio::test]
    async fn s6_concurrent_race_on_version_two_yields_one_winner() {
        let coordinator = Arc::new(test_coordinator());
        let asset_id = AssetId::new();
        coordinator
            .append(
                TenantId::new("t1"),
                asset_id,
                Role::Admin,
                "admin-1".to_string(),
                s1_body(),
                "0",
                "k1",
            )
            .await
            .unwrap();

        let first = {
            let coordinator = Arc::clone(&coordinator);
            let mut body = s1_body();
            body["payload"]["name"] = json!("A");
            tokio::spawn(async move {
                coordinator
                    .append(TenantId::new("t1"), asset_id, Role::Admin, "admin-1".to_string(), body, "1", "race-a")
                    .await
            })
        };
        let second = {
            let coordinator = Arc::clone(&coordinator);
            let mut body = s1_body();
            body["payload"]["name"] = json!("B");
            tokio::spawn(async move {
                coordinator
                    .append(TenantId::new("t1"), asset_id, Role::Admin, "admin-1".to_string(), body, "1", "race-b")
                    .await
            })
        };

        let (first, second) = (first.await.unwrap(), second.await.unwrap());
        let outcomes = [first, second];
        let successes = outcomes.iter().filter(|r| r.is_ok()).count();
        let failures = outcomes
            .iter()
            .filter(|r| matches!(r, Err(LedgerError::PreconditionFailed { .. })))
            .count();

        assert_eq!(successes, 1, "exactly one concurrent append must win");
        assert_eq!(failures, 1, "the loser must see PreconditionFailed");
        assert_eq!(coordinator.storage.event_count().await, 2);

        let winner = outcomes.into_iter().find_map(|r| r.ok()).unwrap();
        assert_eq!(winner.aggregate_version, 2);
    }
}
