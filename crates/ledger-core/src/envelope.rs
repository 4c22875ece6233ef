//! Assembles a canonical event, chains it to the previous hash, and signs
//! it. Grounded on the shape of `CommitmentGate::create_commitment` in the
//! teacher's `openibank-core::commitment` module: validate inputs, hash the
//! object, build a signable form, sign, return.

use serde_json::{Map, Value};

use ledger_crypto::{canonical_bytes, sha256_prefixed, sign, PrivateKey};
use ledger_types::{AssetId, EmitterClass, EventId, EvidencePolicy, TenantId};

use crate::error::LedgerError;
use crate::model::Envelope;
use crate::parse::utc_now_iso;

#[allow(clippy::too_many_arguments)]
pub fn build_envelope(
    tenant_id: TenantId,
    asset_id: AssetId,
    event_type: String,
    evidence: Map<String, Value>,
    payload: Map<String, Value>,
    emitter_class: EmitterClass,
    emitter_id: String,
    aggregate_version: u64,
    prev_event_hash: String,
    evidence_policy: EvidencePolicy,
    private_key: &PrivateKey,
) -> Result<Envelope, LedgerError> {
    if aggregate_version < 1 {
        return Err(LedgerError::BadRequest("aggregate_version must be >= 1".into()));
    }
    if event_type.is_empty() {
        return Err(LedgerError::BadRequest("event_type must be non-empty".into()));
    }
    if prev_event_hash.is_empty() {
        return Err(LedgerError::BadRequest("prev_event_hash must be non-empty".into()));
    }
    let evidence_hash = match evidence.get("evidence_hash") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => return Err(LedgerError::BadRequest("evidence.evidence_hash must be a non-empty string".into())),
    };
    let waiver_reason = match evidence.get("waiver_reason") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    };

    let event_id = EventId::new();
    let timestamp = utc_now_iso();

    let mut canonical_object = Map::new();
    canonical_object.insert("event_id".to_string(), Value::String(event_id.to_string()));
    canonical_object.insert("event_type".to_string(), Value::String(event_type.clone()));
    canonical_object.insert("asset_id".to_string(), Value::String(asset_id.to_string()));
    canonical_object.insert(
        "aggregate_version".to_string(),
        Value::Number(aggregate_version.into()),
    );
    canonical_object.insert(
        "emitter_class".to_string(),
        Value::String(emitter_class.to_string()),
    );
    canonical_object.insert("emitter_id".to_string(), Value::String(emitter_id.clone()));
    canonical_object.insert("timestamp".to_string(), Value::String(timestamp.clone()));
    canonical_object.insert("evidence".to_string(), Value::Object(evidence.clone()));
    canonical_object.insert("payload".to_string(), Value::Object(payload.clone()));

    let mut hash_input = canonical_bytes(&Value::Object(canonical_object))?;
    hash_input.extend_from_slice(prev_event_hash.as_bytes());
    hash_input.extend_from_slice(evidence_hash.as_bytes());
    let event_hash = sha256_prefixed(&hash_input);

    // Sign the UTF-8 bytes of the hash *string*, not the raw hash bytes.
    let signature = sign(private_key, event_hash.as_bytes());

    Ok(Envelope {
        event_id,
        asset_id,
        tenant_id,
        aggregate_version,
        event_type,
        emitter_class,
        emitter_id,
        timestamp,
        evidence_policy,
        evidence_hash: Some(evidence_hash),
        waiver_reason,
        payload,
        evidence,
        prev_event_hash,
        event_hash,
        signature,
    })
}
