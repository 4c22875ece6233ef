//! Shared identifiers and enums for the operational event ledger.
//!
//! Kept dependency-free of every other ledger crate, mirroring the
//! foundation role `openibank-types` plays in the wider workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque tenant scope. Never inspected beyond equality by the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

macro_rules! uuid_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(u: Uuid) -> Self {
                Self(u)
            }
        }
    };
}

uuid_newtype!(AssetId);
uuid_newtype!(EventId);
uuid_newtype!(OutboxId);

/// 1-based position of an event within its asset's chain.
pub type AggregateVersion = u64;

/// Coarse-grained origin category derived from the caller's authenticated role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmitterClass {
    Human,
    System,
    LedgerExternal,
}

impl fmt::Display for EmitterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EmitterClass::Human => "HUMAN",
            EmitterClass::System => "SYSTEM",
            EmitterClass::LedgerExternal => "LEDGER_EXTERNAL",
        };
        write!(f, "{s}")
    }
}

/// Authenticated caller role, resolved from session/auth context — never
/// from the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Manager,
    Admin,
    System,
    LedgerExternal,
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized role: {0}")]
pub struct InvalidRoleError(pub String);

impl FromStr for Role {
    type Err = InvalidRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "MANAGER" => Ok(Role::Manager),
            "ADMIN" => Ok(Role::Admin),
            "SYSTEM" => Ok(Role::System),
            "LEDGER_EXTERNAL" => Ok(Role::LedgerExternal),
            other => Err(InvalidRoleError(other.to_string())),
        }
    }
}

impl Role {
    /// Fixed role → emitter class mapping used by the validator.
    pub fn emitter_class(&self) -> EmitterClass {
        match self {
            Role::User | Role::Manager | Role::Admin => EmitterClass::Human,
            Role::System => EmitterClass::System,
            Role::LedgerExternal => EmitterClass::LedgerExternal,
        }
    }
}

/// Evidence handling rule. The registry only ever stores the first three
/// variants; `Waiver` is a submission-only value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidencePolicy {
    Required,
    InheritLast,
    Optional,
    Waiver,
}

impl fmt::Display for EvidencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EvidencePolicy::Required => "REQUIRED",
            EvidencePolicy::InheritLast => "INHERIT_LAST",
            EvidencePolicy::Optional => "OPTIONAL",
            EvidencePolicy::Waiver => "WAIVER",
        };
        write!(f, "{s}")
    }
}

/// The sentinel `prev_event_hash` for the first event of a chain.
pub const GENESIS_HASH: &str =
    "sha256:0000000000000000000000000000000000000000000000000000000000000000";
