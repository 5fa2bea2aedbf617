//! Fidelity levels and selection
//!
//! Selection precedence, highest first: explicit per-event override,
//! bucket configuration, tenant configuration, policy criticality,
//! then the pipeline default.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};

/// How much cryptographic material a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FidelityLevel {
    #[serde(rename = "metadata_only")]
    MetadataOnly,
    #[serde(rename = "chained")]
    Chained,
    #[serde(rename = "policy_bound")]
    PolicyBound,
    #[serde(rename = "merkle_proof")]
    MerkleProof,
}

impl FidelityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MetadataOnly => "metadata_only",
            Self::Chained => "chained",
            Self::PolicyBound => "policy_bound",
            Self::MerkleProof => "merkle_proof",
        }
    }
}

impl fmt::Display for FidelityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FidelityLevel {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "metadata_only" => Ok(Self::MetadataOnly),
            "chained" => Ok(Self::Chained),
            "policy_bound" => Ok(Self::PolicyBound),
            "merkle_proof" => Ok(Self::MerkleProof),
            other => Err(AuditError::InvalidInput(format!(
                "unknown fidelity level: {}",
                other
            ))),
        }
    }
}

/// Criticality of the policy governing an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Criticality {
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "high")]
    High,
    #[serde(rename = "critical")]
    Critical,
}

/// Fidelity selection maps. Explicit maps keyed by tenant, bucket, and
/// criticality; no global state, instances are passed where needed.
#[derive(Debug, Clone)]
pub struct FidelityConfig {
    pub default_fidelity: FidelityLevel,
    by_tenant: HashMap<String, FidelityLevel>,
    by_bucket: HashMap<String, FidelityLevel>,
    by_criticality: HashMap<Criticality, FidelityLevel>,
}

impl Default for FidelityConfig {
    fn default() -> Self {
        Self::with_default(FidelityLevel::Chained)
    }
}

impl FidelityConfig {
    pub fn with_default(default_fidelity: FidelityLevel) -> Self {
        let by_criticality = HashMap::from([
            (Criticality::Low, FidelityLevel::MetadataOnly),
            (Criticality::Medium, FidelityLevel::Chained),
            (Criticality::High, FidelityLevel::PolicyBound),
            (Criticality::Critical, FidelityLevel::MerkleProof),
        ]);

        Self {
            default_fidelity,
            by_tenant: HashMap::new(),
            by_bucket: HashMap::new(),
            by_criticality,
        }
    }

    pub fn set_tenant_fidelity(&mut self, tenant_id: impl Into<String>, level: FidelityLevel) {
        self.by_tenant.insert(tenant_id.into(), level);
    }

    pub fn set_bucket_fidelity(&mut self, bucket: impl Into<String>, level: FidelityLevel) {
        self.by_bucket.insert(bucket.into(), level);
    }

    pub fn set_criticality_fidelity(&mut self, criticality: Criticality, level: FidelityLevel) {
        self.by_criticality.insert(criticality, level);
    }

    /// Resolve the fidelity for an event's context.
    pub fn select(
        &self,
        tenant_id: &str,
        bucket: &str,
        criticality: Option<Criticality>,
        override_level: Option<FidelityLevel>,
    ) -> FidelityLevel {
        if let Some(level) = override_level {
            return level;
        }
        if let Some(&level) = self.by_bucket.get(bucket) {
            return level;
        }
        if let Some(&level) = self.by_tenant.get(tenant_id) {
            return level;
        }
        if let Some(&level) = criticality.and_then(|c| self.by_criticality.get(&c)) {
            return level;
        }
        self.default_fidelity
    }
}
