//! Audit records
//!
//! A record is mutable only inside the append transaction; the ledger sets
//! `previous_hash` and `record_hash` there, and the record is frozen after.
//!
//! The hash preimage is the record's canonical JSON: keys in a fixed order,
//! `null` for absent optionals, metadata keys ASCII-sorted recursively.
//! `record_hash` is excluded from its own preimage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::encoding;
use crate::error::Result;
use crate::event::{EventType, Metadata};

/// A single ledger record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub record_id: String,
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub tenant_id: String,
    pub bucket: String,
    #[serde(default)]
    pub object_key: Option<String>,
    #[serde(default)]
    pub policy_commitment: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    /// Set by the ledger on append: predecessor's hash, or genesis.
    #[serde(default)]
    pub previous_hash: Option<String>,
    /// Set by the ledger after hashing the canonical preimage.
    #[serde(default)]
    pub record_hash: Option<String>,
}

/// Canonical preimage layout. Field order is fixed and part of the
/// protocol; `record_hash` is deliberately absent.
#[derive(Serialize)]
struct RecordPreimage<'a> {
    record_id: &'a str,
    event_id: &'a str,
    timestamp: &'a DateTime<Utc>,
    event_type: EventType,
    tenant_id: &'a str,
    bucket: &'a str,
    object_key: &'a Option<String>,
    policy_commitment: &'a Option<String>,
    metadata: &'a Metadata,
    previous_hash: &'a Option<String>,
}

impl AuditRecord {
    pub fn new(
        record_id: impl Into<String>,
        event_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        event_type: EventType,
        tenant_id: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            event_id: event_id.into(),
            timestamp,
            event_type,
            tenant_id: tenant_id.into(),
            bucket: bucket.into(),
            object_key: None,
            policy_commitment: None,
            metadata: Metadata::new(),
            previous_hash: None,
            record_hash: None,
        }
    }

    /// Hash of the canonical preimage with the record's current fields.
    pub fn compute_hash(&self) -> Result<String> {
        let preimage = RecordPreimage {
            record_id: &self.record_id,
            event_id: &self.event_id,
            timestamp: &self.timestamp,
            event_type: self.event_type,
            tenant_id: &self.tenant_id,
            bucket: &self.bucket,
            object_key: &self.object_key,
            policy_commitment: &self.policy_commitment,
            metadata: &self.metadata,
            previous_hash: &self.previous_hash,
        };
        let canonical = encoding::canonical_json(&preimage)?;
        Ok(encoding::sha256_hex(canonical.as_bytes()))
    }

    /// True iff the stored hash matches a fresh recomputation.
    pub fn verify_hash(&self) -> bool {
        match (&self.record_hash, self.compute_hash()) {
            (Some(stored), Ok(computed)) => *stored == computed,
            _ => false,
        }
    }
}
