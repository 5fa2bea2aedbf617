//! Bundle builders
//!
//! Each builder pulls records from the ledger, dereferences policy
//! commitments against the compiler, and attaches inclusion proofs where
//! they exist. The resulting bundle stands on its own.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AuditError, Result};
use crate::event::Metadata;
use crate::ledger::{AuditLedger, AuditRecord, MerkleProof};
use crate::policy::PolicyCompiler;
use crate::verification::bundle::{BundleType, ComplianceProofBundle, PolicyCommitmentEntry};

/// Builds compliance proof bundles from the live ledger and compiler.
#[derive(Clone)]
pub struct VerificationApi {
    ledger: AuditLedger,
    compiler: PolicyCompiler,
}

impl VerificationApi {
    pub fn new(ledger: AuditLedger, compiler: PolicyCompiler) -> Self {
        Self { ledger, compiler }
    }

    /// Bundle for one record. Fails with `NotFound` for an unknown id.
    pub async fn create_single_record_bundle(
        &self,
        record_id: &str,
        include_merkle_proof: bool,
    ) -> Result<ComplianceProofBundle> {
        let record = self
            .ledger
            .get(record_id)
            .await
            .ok_or_else(|| AuditError::record_not_found(record_id))?;

        let records = vec![record];
        let merkle_proofs = if include_merkle_proof {
            self.collect_proofs(&records).await
        } else {
            BTreeMap::new()
        };

        self.assemble(BundleType::Single, records, merkle_proofs, Metadata::new())
            .await
    }

    /// Bundle for an explicit set of records, preserving input order.
    /// Unknown ids are skipped and accounted for in the metadata.
    pub async fn create_batch_bundle(
        &self,
        record_ids: &[String],
        include_merkle_proofs: bool,
    ) -> Result<ComplianceProofBundle> {
        let mut records = Vec::with_capacity(record_ids.len());
        for record_id in record_ids {
            if let Some(record) = self.ledger.get(record_id).await {
                records.push(record);
            }
        }

        let merkle_proofs = if include_merkle_proofs {
            self.collect_proofs(&records).await
        } else {
            BTreeMap::new()
        };

        let mut metadata = Metadata::new();
        metadata.insert(
            "requested_count".to_string(),
            serde_json::json!(record_ids.len()),
        );

        self.assemble(BundleType::Batch, records, merkle_proofs, metadata)
            .await
    }

    /// Bundle over the half-open interval `[from, to)`, optionally
    /// filtered by tenant.
    pub async fn create_time_range_bundle(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        tenant_id: Option<&str>,
        include_merkle_proofs: bool,
    ) -> Result<ComplianceProofBundle> {
        let records: Vec<AuditRecord> = self
            .ledger
            .records_snapshot()
            .await
            .into_iter()
            .filter(|r| r.timestamp >= from && r.timestamp < to)
            .filter(|r| tenant_id.map_or(true, |t| r.tenant_id == t))
            .collect();

        let merkle_proofs = if include_merkle_proofs {
            self.collect_proofs(&records).await
        } else {
            BTreeMap::new()
        };

        let mut metadata = Metadata::new();
        metadata.insert("from".to_string(), serde_json::json!(from));
        metadata.insert("to".to_string(), serde_json::json!(to));
        if let Some(tenant) = tenant_id {
            metadata.insert("tenant_id".to_string(), serde_json::json!(tenant));
        }

        self.assemble(BundleType::TimeRange, records, merkle_proofs, metadata)
            .await
    }

    /// Bundle of one tenant's records. With a limit, the most recent
    /// records come first.
    pub async fn create_tenant_bundle(
        &self,
        tenant_id: &str,
        limit: Option<usize>,
        include_merkle_proofs: bool,
    ) -> Result<ComplianceProofBundle> {
        let mut records: Vec<AuditRecord> = self
            .ledger
            .records_snapshot()
            .await
            .into_iter()
            .filter(|r| r.tenant_id == tenant_id)
            .collect();

        if let Some(limit) = limit {
            records.reverse();
            records.truncate(limit);
        }

        let merkle_proofs = if include_merkle_proofs {
            self.collect_proofs(&records).await
        } else {
            BTreeMap::new()
        };

        let mut metadata = Metadata::new();
        metadata.insert("tenant_id".to_string(), serde_json::json!(tenant_id));

        self.assemble(BundleType::Tenant, records, merkle_proofs, metadata)
            .await
    }

    async fn collect_proofs(&self, records: &[AuditRecord]) -> BTreeMap<String, MerkleProof> {
        let mut proofs = BTreeMap::new();
        for record in records {
            if let Some(proof) = self.ledger.generate_inclusion_proof(&record.record_id).await {
                proofs.insert(record.record_id.clone(), proof);
            }
        }
        proofs
    }

    /// Dereference the commitment hashes carried by `records` against the
    /// compiler. Resolved entries embed the canonical form under the
    /// policy id; unresolved ones are recorded verbatim under the hash.
    async fn resolve_commitments(
        &self,
        records: &[AuditRecord],
    ) -> BTreeMap<String, PolicyCommitmentEntry> {
        let mut commitments = BTreeMap::new();
        for record in records {
            let Some(hash) = &record.policy_commitment else {
                continue;
            };
            match self.compiler.find_by_commitment(hash).await {
                Some(policy) => {
                    commitments.insert(
                        policy.policy_id.clone(),
                        PolicyCommitmentEntry {
                            commitment_hash: policy.commitment_hash,
                            canonical_form: Some(policy.canonical_form),
                            version: Some(policy.version),
                        },
                    );
                }
                None => {
                    commitments.insert(
                        hash.clone(),
                        PolicyCommitmentEntry {
                            commitment_hash: hash.clone(),
                            canonical_form: None,
                            version: None,
                        },
                    );
                }
            }
        }
        commitments
    }

    async fn assemble(
        &self,
        bundle_type: BundleType,
        records: Vec<AuditRecord>,
        merkle_proofs: BTreeMap<String, MerkleProof>,
        mut metadata: Metadata,
    ) -> Result<ComplianceProofBundle> {
        let policy_commitments = self.resolve_commitments(&records).await;
        metadata.insert("record_count".to_string(), serde_json::json!(records.len()));

        let bundle = ComplianceProofBundle {
            bundle_id: format!("bundle-{}", Uuid::new_v4()),
            bundle_type,
            created_at: Utc::now(),
            records,
            policy_commitments,
            merkle_proofs,
            external_anchor: None,
            metadata,
        };

        debug!(
            bundle_id = %bundle.bundle_id,
            record_count = bundle.records.len(),
            proof_count = bundle.merkle_proofs.len(),
            "assembled proof bundle"
        );
        Ok(bundle)
    }
}
