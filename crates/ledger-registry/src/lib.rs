//! Per-event-type policy lookup.
//!
//! Loaded once at process startup from an embedded table or a JSON file
//! and treated as immutable thereafter; safe for unsynchronized
//! concurrent reads from every append in flight. Hot reload is
//! intentionally unsupported.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ledger_types::{EmitterClass, EvidencePolicy};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown event type: {0}")]
    NotFound(String),

    #[error("failed to load registry: {0}")]
    Load(#[from] serde_json::Error),
}

/// Policy attached to one event type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub allowed_emitter_classes: HashSet<EmitterClass>,
    pub evidence_policy: EvidencePolicy,
}

/// Read-only event-type policy table.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: HashMap<String, RegistryEntry>,
}

impl Registry {
    pub fn new(entries: HashMap<String, RegistryEntry>) -> Self {
        Self { entries }
    }

    /// Builds the registry from a JSON document shaped as
    /// `{"EVENT_TYPE": {"allowed_emitter_classes": [...], "evidence_policy": "..."}}`.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let entries: HashMap<String, RegistryEntry> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    pub fn get(&self, event_type: &str) -> Result<&RegistryEntry, RegistryError> {
        self.entries
            .get(event_type)
            .ok_or_else(|| RegistryError::NotFound(event_type.to_string()))
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.entries.contains_key(event_type)
    }

    /// A small built-in table covering the event types this repository's
    /// own tests and default deployment exercise. Production deployments
    /// are expected to supply their own table via [`Registry::from_json`];
    /// loading it from a file is an external collaborator's concern.
    pub fn embedded_default() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            "ASSET_CREATED".to_string(),
            RegistryEntry {
                allowed_emitter_classes: HashSet::from([EmitterClass::Human]),
                evidence_policy: EvidencePolicy::Required,
            },
        );
        entries.insert(
            "ASSET_UPDATED".to_string(),
            RegistryEntry {
                allowed_emitter_classes: HashSet::from([EmitterClass::Human]),
                evidence_policy: EvidencePolicy::InheritLast,
            },
        );
        entries.insert(
            "RECONCILIATION_RUN".to_string(),
            RegistryEntry {
                allowed_emitter_classes: HashSet::from([EmitterClass::System]),
                evidence_policy: EvidencePolicy::Optional,
            },
        );
        entries.insert(
            "EXTERNAL_SYNC".to_string(),
            RegistryEntry {
                allowed_emitter_classes: HashSet::from([EmitterClass::LedgerExternal]),
                evidence_policy: EvidencePolicy::InheritLast,
            },
        );
        Self::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registry() -> Registry {
        let mut entries = HashMap::new();
        entries.insert(
            "ASSET_CREATED".to_string(),
            RegistryEntry {
                allowed_emitter_classes: HashSet::from([EmitterClass::Human]),
                evidence_policy: EvidencePolicy::Required,
            },
        );
        entries.insert(
            "RECONCILIATION_RUN".to_string(),
            RegistryEntry {
                allowed_emitter_classes: HashSet::from([EmitterClass::System]),
                evidence_policy: EvidencePolicy::Optional,
            },
        );
        Registry::new(entries)
    }

    #[test]
    fn embedded_default_covers_asset_created() {
        let registry = Registry::embedded_default();
        let entry = registry.get("ASSET_CREATED").unwrap();
        assert_eq!(entry.evidence_policy, EvidencePolicy::Required);
        assert!(registry.contains("RECONCILIATION_RUN"));
    }

    #[test]
    fn get_returns_known_entry() {
        let registry = sample_registry();
        let entry = registry.get("ASSET_CREATED").unwrap();
        assert!(entry.allowed_emitter_classes.contains(&EmitterClass::Human));
    }

    #[test]
    fn get_fails_on_unknown_event_type() {
        let registry = sample_registry();
        assert!(registry.get("NOPE").is_err());
    }

    #[test]
    fn from_json_round_trips() {
        let json = r#"{
            "ASSET_CREATED": {
                "allowed_emitter_classes": ["HUMAN", "ADMIN_NEVER_MATCHES"],
                "evidence_policy": "REQUIRED"
            }
        }"#;
        // Intentionally malformed variant to prove deserialize failures surface.
        assert!(Registry::from_json(json).is_err());
    }
}
