//! The persisted event record and the shape of a client submission.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use ledger_types::{AssetId, EmitterClass, EventId, EvidencePolicy, TenantId};

use crate::error::LedgerError;

/// Server-minted fields a client must never supply; injecting any of them
/// is rejected before a transaction is ever opened.
pub const FORBIDDEN_FIELDS: &[&str] = &[
    "event_id",
    "asset_id",
    "aggregate_version",
    "emitter_class",
    "emitter_id",
    "timestamp",
    "prev_event_hash",
    "event_hash",
    "signature",
    "tenant_id",
    "role",
];

/// A client's raw request body, shape-checked but not yet policy-checked.
#[derive(Debug, Clone)]
pub struct SubmittedEvent {
    pub event_type: String,
    pub evidence: Map<String, Value>,
    pub payload: Map<String, Value>,
}

impl SubmittedEvent {
    /// Rejects forbidden top-level fields, then validates the shape of
    /// `event_type` (non-empty string), `payload` (object), and `evidence`
    /// (object).
    pub fn from_value(value: Value) -> Result<Self, LedgerError> {
        let mut object = match value {
            Value::Object(map) => map,
            _ => return Err(LedgerError::BadRequest("body must be a JSON object".into())),
        };

        let injected: Vec<&str> = FORBIDDEN_FIELDS
            .iter()
            .copied()
            .filter(|f| object.contains_key(*f))
            .collect();
        if !injected.is_empty() {
            return Err(LedgerError::BadRequest(format!(
                "forbidden fields present: {}",
                injected.join(", ")
            )));
        }

        let event_type = match object.remove("event_type") {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(_) => return Err(LedgerError::BadRequest("event_type must be a non-empty string".into())),
            None => return Err(LedgerError::BadRequest("event_type is required".into())),
        };

        let payload = match object.remove("payload") {
            Some(Value::Object(map)) => map,
            Some(_) => return Err(LedgerError::BadRequest("payload must be an object".into())),
            None => return Err(LedgerError::BadRequest("payload is required".into())),
        };

        let evidence = match object.remove("evidence") {
            Some(Value::Object(map)) => map,
            Some(_) => return Err(LedgerError::BadRequest("evidence must be an object".into())),
            None => return Err(LedgerError::BadRequest("evidence is required".into())),
        };

        Ok(Self {
            event_type,
            evidence,
            payload,
        })
    }

    pub fn evidence_policy(&self) -> Result<EvidencePolicy, LedgerError> {
        match self.evidence.get("policy") {
            Some(Value::String(s)) => parse_evidence_policy(s),
            Some(_) => Err(LedgerError::BadRequest("evidence.policy must be a string".into())),
            None => Err(LedgerError::BadRequest("evidence.policy is required".into())),
        }
    }

    pub fn evidence_hash(&self) -> Option<&str> {
        match self.evidence.get("evidence_hash") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn waiver_reason(&self) -> Option<&str> {
        match self.evidence.get("waiver_reason") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }
}

fn parse_evidence_policy(s: &str) -> Result<EvidencePolicy, LedgerError> {
    match s {
        "REQUIRED" => Ok(EvidencePolicy::Required),
        "INHERIT_LAST" => Ok(EvidencePolicy::InheritLast),
        "OPTIONAL" => Ok(EvidencePolicy::Optional),
        "WAIVER" => Ok(EvidencePolicy::Waiver),
        other => Err(LedgerError::BadRequest(format!(
            "unrecognized evidence.policy: {other}"
        ))),
    }
}

/// The signed, hashed, persisted record returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub event_id: EventId,
    pub asset_id: AssetId,
    pub tenant_id: TenantId,
    pub aggregate_version: u64,
    pub event_type: String,
    pub emitter_class: EmitterClass,
    pub emitter_id: String,
    pub timestamp: String,
    pub evidence_policy: EvidencePolicy,
    pub evidence_hash: Option<String>,
    pub waiver_reason: Option<String>,
    pub payload: Map<String, Value>,
    pub evidence: Map<String, Value>,
    pub prev_event_hash: String,
    pub event_hash: String,
    pub signature: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_forbidden_fields() {
        let body = json!({
            "event_type": "X",
            "payload": {},
            "evidence": {},
            "event_id": "11111111-1111-4111-8111-111111111111"
        });
        let err = SubmittedEvent::from_value(body).unwrap_err();
        assert!(matches!(err, LedgerError::BadRequest(_)));
    }

    #[test]
    fn accepts_well_shaped_body() {
        let body = json!({
            "event_type": "ASSET_CREATED",
            "payload": {"name": "X"},
            "evidence": {"policy": "REQUIRED", "evidence_hash": "sha256:aa"}
        });
        let submitted = SubmittedEvent::from_value(body).unwrap();
        assert_eq!(submitted.event_type, "ASSET_CREATED");
        assert_eq!(submitted.evidence_hash(), Some("sha256:aa"));
    }

    #[test]
    fn rejects_empty_event_type() {
        let body = json!({"event_type": "", "payload": {}, "evidence": {}});
        assert!(SubmittedEvent::from_value(body).is_err());
    }

    #[test]
    fn rejects_non_object_payload() {
        let body = json!({"event_type": "X", "payload": [], "evidence": {}});
        assert!(SubmittedEvent::from_value(body).is_err());
    }
}
