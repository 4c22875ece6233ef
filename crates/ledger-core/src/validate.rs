//! Policy checks applied before the coordinator ever opens a transaction.
//!
//! Mirrors the sequence in the original `validators.py`, rebuilt as a
//! single typed entry point rather than a chain of ad hoc functions.

use ledger_registry::Registry;
use ledger_types::{EmitterClass, EvidencePolicy, Role};

use crate::error::LedgerError;
use crate::model::SubmittedEvent;

/// A submission that has passed every Validator check, carrying the
/// registry-assigned evidence policy (the value stored on the event,
/// per the data model — not the client's submitted policy).
#[derive(Debug, Clone)]
pub struct ValidatedSubmission {
    pub submitted: SubmittedEvent,
    pub emitter_class: EmitterClass,
    pub evidence_policy: EvidencePolicy,
}

pub struct Validator<'a> {
    registry: &'a Registry,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    pub fn validate(
        &self,
        body: serde_json::Value,
        role: Role,
    ) -> Result<ValidatedSubmission, LedgerError> {
        let submitted = SubmittedEvent::from_value(body)?;

        let entry = self.registry.get(&submitted.event_type)?;

        let emitter_class = role.emitter_class();
        if !entry.allowed_emitter_classes.contains(&emitter_class) {
            return Err(LedgerError::PermissionDenied {
                emitter_class: emitter_class.to_string(),
                event_type: submitted.event_type.clone(),
            });
        }

        let submitted_policy = submitted.evidence_policy()?;
        check_evidence_policy(entry.evidence_policy, submitted_policy)?;
        if submitted_policy == EvidencePolicy::Waiver && submitted.waiver_reason().is_none() {
            return Err(LedgerError::EvidencePolicyViolation {
                expected: "non-empty waiver_reason".to_string(),
                actual: "missing".to_string(),
            });
        }

        Ok(ValidatedSubmission {
            submitted,
            emitter_class,
            evidence_policy: entry.evidence_policy,
        })
    }
}

/// The nine `(registry_policy, submitted_policy)` combinations from the
/// evidence policy matrix.
fn check_evidence_policy(
    registry_policy: EvidencePolicy,
    submitted_policy: EvidencePolicy,
) -> Result<(), LedgerError> {
    let accepted = match registry_policy {
        EvidencePolicy::Required => submitted_policy == EvidencePolicy::Required,
        EvidencePolicy::InheritLast => matches!(
            submitted_policy,
            EvidencePolicy::InheritLast | EvidencePolicy::Required
        ),
        EvidencePolicy::Optional => matches!(
            submitted_policy,
            EvidencePolicy::Optional
                | EvidencePolicy::Required
                | EvidencePolicy::InheritLast
                | EvidencePolicy::Waiver
        ),
        // The registry itself never stores WAIVER.
        EvidencePolicy::Waiver => false,
    };

    if accepted {
        Ok(())
    } else {
        Err(LedgerError::EvidencePolicyViolation {
            expected: registry_policy.to_string(),
            actual: submitted_policy.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_registry::RegistryEntry;
    use serde_json::json;
    use std::collections::{HashMap, HashSet};

    fn registry_with(entry: RegistryEntry) -> Registry {
        let mut entries = HashMap::new();
        entries.insert("E".to_string(), entry);
        Registry::new(entries)
    }

    #[test]
    fn evidence_policy_matrix_all_nine_combinations() {
        use EvidencePolicy::*;
        let cases = [
            (Required, Required, true),
            (Required, InheritLast, false),
            (Required, Optional, false),
            (InheritLast, InheritLast, true),
            (InheritLast, Required, true),
            (InheritLast, Optional, false),
            (Optional, Optional, true),
            (Optional, Required, true),
            (Optional, InheritLast, true),
            (Optional, Waiver, true),
        ];
        for (registry_policy, submitted_policy, expect_ok) in cases {
            let result = check_evidence_policy(registry_policy, submitted_policy);
            assert_eq!(result.is_ok(), expect_ok, "{registry_policy:?} vs {submitted_policy:?}");
        }
    }

    #[test]
    fn permission_denied_for_disallowed_emitter_class() {
        let registry = registry_with(RegistryEntry {
            allowed_emitter_classes: HashSet::from([EmitterClass::System]),
            evidence_policy: EvidencePolicy::Optional,
        });
        let validator = Validator::new(&registry);
        let body = json!({
            "event_type": "E",
            "payload": {},
            "evidence": {"policy": "OPTIONAL"}
        });
        let err = validator.validate(body, Role::User).unwrap_err();
        assert!(matches!(err, LedgerError::PermissionDenied { .. }));
    }

    #[test]
    fn waiver_without_reason_is_rejected() {
        let registry = registry_with(RegistryEntry {
            allowed_emitter_classes: HashSet::from([EmitterClass::Human]),
            evidence_policy: EvidencePolicy::Optional,
        });
        let validator = Validator::new(&registry);
        let body = json!({
            "event_type": "E",
            "payload": {},
            "evidence": {"policy": "WAIVER"}
        });
        let err = validator.validate(body, Role::User).unwrap_err();
        assert!(matches!(err, LedgerError::EvidencePolicyViolation { .. }));
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let registry = registry_with(RegistryEntry {
            allowed_emitter_classes: HashSet::from([EmitterClass::Human]),
            evidence_policy: EvidencePolicy::Optional,
        });
        let validator = Validator::new(&registry);
        let body = json!({
            "event_type": "OTHER",
            "payload": {},
            "evidence": {"policy": "OPTIONAL"}
        });
        let err = validator.validate(body, Role::User).unwrap_err();
        assert!(matches!(err, LedgerError::UnknownEventType(_)));
    }
}
