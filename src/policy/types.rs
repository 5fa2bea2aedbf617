//! Policy model
//!
//! Input shape for the compiler. Ordering of actions, resources,
//! principals, and statements carries no meaning; canonicalization
//! normalizes all of it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};
use crate::event::Metadata;

/// Policy effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyEffect {
    Allow,
    Deny,
}

/// A single policy statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyStatement {
    pub sid: String,
    pub effect: PolicyEffect,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
    #[serde(default)]
    pub principals: Vec<String>,
    #[serde(default)]
    pub conditions: BTreeMap<String, serde_json::Value>,
}

impl PolicyStatement {
    pub fn new(
        sid: impl Into<String>,
        effect: PolicyEffect,
        actions: Vec<String>,
        resources: Vec<String>,
    ) -> Self {
        Self {
            sid: sid.into(),
            effect,
            actions,
            resources,
            principals: Vec::new(),
            conditions: BTreeMap::new(),
        }
    }
}

/// A compliance policy as supplied by the control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub policy_id: String,
    pub version: String,
    pub name: String,
    pub statements: Vec<PolicyStatement>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Policy {
    pub fn new(
        policy_id: impl Into<String>,
        version: impl Into<String>,
        name: impl Into<String>,
        statements: Vec<PolicyStatement>,
    ) -> Self {
        Self {
            policy_id: policy_id.into(),
            version: version.into(),
            name: name.into(),
            statements,
            metadata: Metadata::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.policy_id.is_empty() {
            return Err(AuditError::missing_field("policy", "policy_id"));
        }
        if self.version.is_empty() {
            return Err(AuditError::missing_field("policy", "version"));
        }
        if self.statements.is_empty() {
            return Err(AuditError::missing_field("policy", "statements"));
        }
        Ok(())
    }
}

/// Output of the compiler: the canonical byte form, its commitment hash,
/// and the originating policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPolicy {
    pub policy_id: String,
    pub version: String,
    pub canonical_form: String,
    pub commitment_hash: String,
    pub created_at: DateTime<Utc>,
    pub source: Policy,
}
