//! Proof bundle model
//!
//! A bundle is everything a third-party auditor needs: full records with
//! their chain links, the canonical forms behind referenced policy
//! commitments, inclusion proofs, and an optional external anchor blob.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::event::Metadata;
use crate::ledger::{AuditRecord, MerkleProof};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleType {
    #[serde(rename = "single")]
    Single,
    #[serde(rename = "batch")]
    Batch,
    #[serde(rename = "time_range")]
    TimeRange,
    #[serde(rename = "tenant")]
    Tenant,
}

/// A policy commitment embedded in a bundle. `canonical_form` is absent
/// when the compiler could not resolve the commitment; such entries are
/// keyed by the bare hash and can only be format-checked offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyCommitmentEntry {
    pub commitment_hash: String,
    #[serde(default)]
    pub canonical_form: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Self-contained compliance proof artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceProofBundle {
    pub bundle_id: String,
    pub bundle_type: BundleType,
    pub created_at: DateTime<Utc>,
    pub records: Vec<AuditRecord>,
    /// Keyed by policy id, or by the bare hash for unresolved commitments.
    pub policy_commitments: BTreeMap<String, PolicyCommitmentEntry>,
    /// Keyed by record id.
    pub merkle_proofs: BTreeMap<String, MerkleProof>,
    /// Opaque blob from an anchoring collaborator; carried, not interpreted.
    #[serde(default)]
    pub external_anchor: Option<serde_json::Value>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ComplianceProofBundle {
    pub fn with_external_anchor(mut self, anchor: serde_json::Value) -> Self {
        self.external_anchor = Some(anchor);
        self
    }

    /// Export form for handing the bundle to an auditor.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
