//! Policy canonicalization and commitment hashing
//!
//! Two semantically equal policies must produce byte-identical canonical
//! forms: actions, resources, and principals sort ASCII-lexicographically,
//! condition keys sort recursively, statements sort by `Sid`, and key order
//! is fixed. The serialized form is compact JSON; the whitespace policy is
//! part of the commitment and never changes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::encoding;
use crate::error::Result;
use crate::policy::types::{CanonicalPolicy, Policy, PolicyEffect};

/// Canonical statement layout. Field declaration order fixes key order;
/// `Principals` and `Conditions` are emitted only when non-empty.
#[derive(Serialize)]
struct CanonicalStatementForm {
    #[serde(rename = "Sid")]
    sid: String,
    #[serde(rename = "Effect")]
    effect: PolicyEffect,
    #[serde(rename = "Actions")]
    actions: Vec<String>,
    #[serde(rename = "Resources")]
    resources: Vec<String>,
    #[serde(rename = "Principals", skip_serializing_if = "Vec::is_empty")]
    principals: Vec<String>,
    #[serde(rename = "Conditions", skip_serializing_if = "BTreeMap::is_empty")]
    conditions: BTreeMap<String, serde_json::Value>,
}

#[derive(Serialize)]
struct CanonicalPolicyForm {
    #[serde(rename = "PolicyId")]
    policy_id: String,
    #[serde(rename = "Version")]
    version: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Statements")]
    statements: Vec<CanonicalStatementForm>,
}

#[derive(Default)]
struct CompilerState {
    // policy_id -> latest compile; version history kept separately
    policies: HashMap<String, CanonicalPolicy>,
    versions: HashMap<String, Vec<String>>,
}

/// Compiles policies into canonical form with cryptographic commitments.
#[derive(Clone, Default)]
pub struct PolicyCompiler {
    state: Arc<RwLock<CompilerState>>,
}

impl PolicyCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a policy: normalize, serialize, hash, store.
    ///
    /// Storage is keyed by `policy_id` and the latest compile wins;
    /// `versions` keeps the full compile-ordered history. Nothing is
    /// stored when validation fails.
    pub async fn compile(&self, policy: &Policy) -> Result<CanonicalPolicy> {
        policy.validate()?;

        let canonical_form = encoding::canonical_json(&Self::normalize(policy))?;
        let commitment_hash = encoding::sha256_hex(canonical_form.as_bytes());

        let canonical = CanonicalPolicy {
            policy_id: policy.policy_id.clone(),
            version: policy.version.clone(),
            canonical_form,
            commitment_hash,
            created_at: Utc::now(),
            source: policy.clone(),
        };

        let mut state = self.state.write().await;
        state
            .versions
            .entry(policy.policy_id.clone())
            .or_default()
            .push(policy.version.clone());
        state
            .policies
            .insert(policy.policy_id.clone(), canonical.clone());

        debug!(
            policy_id = %canonical.policy_id,
            version = %canonical.version,
            commitment = %canonical.commitment_hash,
            "compiled policy"
        );
        Ok(canonical)
    }

    fn normalize(policy: &Policy) -> CanonicalPolicyForm {
        let mut statements: Vec<CanonicalStatementForm> = policy
            .statements
            .iter()
            .map(|stmt| {
                let mut actions = stmt.actions.clone();
                actions.sort();
                let mut resources = stmt.resources.clone();
                resources.sort();
                let mut principals = stmt.principals.clone();
                principals.sort();

                CanonicalStatementForm {
                    sid: stmt.sid.clone(),
                    effect: stmt.effect,
                    actions,
                    resources,
                    principals,
                    conditions: stmt.conditions.clone(),
                }
            })
            .collect();

        statements.sort_by(|a, b| a.sid.cmp(&b.sid));

        CanonicalPolicyForm {
            policy_id: policy.policy_id.clone(),
            version: policy.version.clone(),
            name: policy.name.clone(),
            statements,
        }
    }

    /// Latest compile for a policy id.
    pub async fn get(&self, policy_id: &str) -> Option<CanonicalPolicy> {
        self.state.read().await.policies.get(policy_id).cloned()
    }

    /// Compile-ordered version history, duplicates included.
    pub async fn versions(&self, policy_id: &str) -> Vec<String> {
        self.state
            .read()
            .await
            .versions
            .get(policy_id)
            .cloned()
            .unwrap_or_default()
    }

    /// True iff a policy is stored under `policy_id` and its commitment
    /// equals `claimed_hash`.
    pub async fn verify_commitment(&self, policy_id: &str, claimed_hash: &str) -> bool {
        match self.get(policy_id).await {
            Some(policy) => policy.commitment_hash == claimed_hash,
            None => false,
        }
    }

    /// Reverse lookup by commitment hash, used to dereference the
    /// commitments embedded in audit records.
    pub async fn find_by_commitment(&self, commitment_hash: &str) -> Option<CanonicalPolicy> {
        self.state
            .read()
            .await
            .policies
            .values()
            .find(|p| p.commitment_hash == commitment_hash)
            .cloned()
    }
}
