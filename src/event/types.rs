//! Compliance event model
//!
//! Events are immutable once created; the interceptor validates required
//! fields before anything downstream sees them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::encoding;
use crate::error::{AuditError, Result};

/// String-keyed map of JSON-like values. `BTreeMap` keeps serialization
/// key order ASCII-lexicographic, which canonical hashing relies on.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Types of compliance-relevant events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "object.create")]
    ObjectCreate,
    #[serde(rename = "object.update")]
    ObjectUpdate,
    #[serde(rename = "object.delete")]
    ObjectDelete,
    #[serde(rename = "object.read")]
    ObjectRead,
    #[serde(rename = "policy.create")]
    PolicyCreate,
    #[serde(rename = "policy.update")]
    PolicyUpdate,
    #[serde(rename = "policy.delete")]
    PolicyDelete,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ObjectCreate => "object.create",
            Self::ObjectUpdate => "object.update",
            Self::ObjectDelete => "object.delete",
            Self::ObjectRead => "object.read",
            Self::PolicyCreate => "policy.create",
            Self::PolicyUpdate => "policy.update",
            Self::PolicyDelete => "policy.delete",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "object.create" => Ok(Self::ObjectCreate),
            "object.update" => Ok(Self::ObjectUpdate),
            "object.delete" => Ok(Self::ObjectDelete),
            "object.read" => Ok(Self::ObjectRead),
            "policy.create" => Ok(Self::PolicyCreate),
            "policy.update" => Ok(Self::PolicyUpdate),
            "policy.delete" => Ok(Self::PolicyDelete),
            other => Err(AuditError::InvalidInput(format!(
                "unknown event type: {}",
                other
            ))),
        }
    }
}

/// A compliance-relevant event from the storage control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceEvent {
    pub event_id: String,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub tenant_id: String,
    pub bucket: String,
    #[serde(default)]
    pub object_key: Option<String>,
    #[serde(default)]
    pub principal: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ComplianceEvent {
    pub fn new(
        event_id: impl Into<String>,
        event_type: EventType,
        timestamp: DateTime<Utc>,
        tenant_id: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type,
            timestamp,
            tenant_id: tenant_id.into(),
            bucket: bucket.into(),
            object_key: None,
            principal: None,
            metadata: Metadata::new(),
        }
    }

    /// Check the intercept-time invariant: identifying fields are non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.event_id.is_empty() {
            return Err(AuditError::missing_field("event", "event_id"));
        }
        if self.tenant_id.is_empty() {
            return Err(AuditError::missing_field("event", "tenant_id"));
        }
        if self.bucket.is_empty() {
            return Err(AuditError::missing_field("event", "bucket"));
        }
        Ok(())
    }

    /// Digest of the event's canonical JSON form, for producers that want
    /// a pre-ledger event fingerprint.
    pub fn compute_hash(&self) -> Result<String> {
        let canonical = encoding::canonical_json(self)?;
        Ok(encoding::sha256_hex(canonical.as_bytes()))
    }
}
