//! Schema of outbox rows and topic derivation.
//!
//! Delivery to downstream consumers is an external dispatcher's
//! responsibility; this crate only defines the row shape written inside
//! the same transaction as the event, and the (trivial) topic mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledger_core::Envelope;
use ledger_types::{OutboxId, TenantId};

/// A pending downstream notification, durable in the same transaction as
/// the event it describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxRow {
    pub outbox_id: OutboxId,
    pub tenant_id: TenantId,
    pub topic: String,
    pub payload: Envelope,
    pub created_at: DateTime<Utc>,
}

/// Topic derivation is the identity function: `topic == event_type`. No
/// mapping table exists, matching the original source's behavior; a
/// future per-type mapping belongs outside this crate.
pub fn topic_for(envelope: &Envelope) -> String {
    envelope.event_type.clone()
}

/// Builds the outbox row for a freshly built envelope, ready to be
/// persisted in the same transaction.
pub fn outbox_row_for(tenant_id: TenantId, envelope: &Envelope, created_at: DateTime<Utc>) -> OutboxRow {
    OutboxRow {
        outbox_id: OutboxId::new(),
        tenant_id,
        topic: topic_for(envelope),
        payload: envelope.clone(),
        created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_types::{AssetId, EmitterClass, EventId, EvidencePolicy};
    use serde_json::Map;

    fn sample_envelope() -> Envelope {
        Envelope {
            event_id: EventId::new(),
            asset_id: AssetId::new(),
            tenant_id: TenantId::new("t1"),
            aggregate_version: 1,
            event_type: "ASSET_CREATED".to_string(),
            emitter_class: EmitterClass::Human,
            emitter_id: "user-1".to_string(),
            timestamp: "2026-01-01T00:00:00.000Z".to_string(),
            evidence_policy: EvidencePolicy::Required,
            evidence_hash: Some("sha256:aa".to_string()),
            waiver_reason: None,
            payload: Map::new(),
            evidence: Map::new(),
            prev_event_hash: ledger_types::GENESIS_HASH.to_string(),
            event_hash: "sha256:bb".to_string(),
            signature: "ed25519:cc".to_string(),
        }
    }

    #[test]
    fn topic_equals_event_type_verbatim() {
        let envelope = sample_envelope();
        assert_eq!(topic_for(&envelope), "ASSET_CREATED");
    }

    #[test]
    fn outbox_row_carries_full_envelope_as_payload() {
        let envelope = sample_envelope();
        let row = outbox_row_for(TenantId::new("t1"), &envelope, Utc::now());
        assert_eq!(row.payload.event_hash, envelope.event_hash);
        assert_eq!(row.topic, "ASSET_CREATED");
    }
}
