//! Offline bundle verification
//!
//! Pure over the bundle contents; no ledger access. Four sub-checks:
//! record integrity, chain links, Merkle proofs, policy commitments.
//! A vacuous sub-check passes. Offline, adjacency between embedded
//! records is only knowable from the `previous_hash` links the bundle
//! carries; consecutive pairs without a declared link are skipped by the
//! chain check.

use crate::encoding;
use crate::verification::bundle::ComplianceProofBundle;

/// Itemized verification outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleVerification {
    pub bundle_id: String,
    pub valid: bool,
    pub integrity_check: bool,
    pub chain_verification: bool,
    pub merkle_verification: bool,
    pub policy_verification: bool,
    pub errors: Vec<String>,
}

/// Verify a proof bundle offline.
pub fn verify_bundle(bundle: &ComplianceProofBundle) -> BundleVerification {
    let mut errors = Vec::new();

    // 1. Integrity: every embedded record's hash must recompute.
    let mut integrity_check = true;
    for record in &bundle.records {
        if !record.verify_hash() {
            integrity_check = false;
            errors.push(format!("record hash mismatch for {}", record.record_id));
        }
    }

    // 2. Chain: consecutive pairs that declare adjacency must link
    //    against the predecessor's recomputed hash.
    let mut chain_verification = true;
    for pair in bundle.records.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        let declared_adjacent =
            current.previous_hash.is_some() && current.previous_hash == previous.record_hash;
        if !declared_adjacent {
            continue;
        }

        let recomputed = match previous.compute_hash() {
            Ok(hash) => hash,
            Err(_) => {
                chain_verification = false;
                errors.push(format!("chain break at record {}", current.record_id));
                continue;
            }
        };
        if current.previous_hash.as_deref() != Some(recomputed.as_str()) {
            chain_verification = false;
            errors.push(format!("chain break at record {}", current.record_id));
        }
    }

    // 3. Merkle: re-walk every attached proof, and pin the leaf to the
    //    record it claims to cover.
    let mut merkle_verification = true;
    for (record_id, proof) in &bundle.merkle_proofs {
        if let Some(record) = bundle.records.iter().find(|r| r.record_id == *record_id) {
            if record.record_hash.as_deref() != Some(proof.leaf_hash.as_str()) {
                merkle_verification = false;
                errors.push(format!("merkle proof leaf does not match record {}", record_id));
                continue;
            }
        }
        if !proof.verify() {
            merkle_verification = false;
            errors.push(format!("merkle proof failed for record {}", record_id));
        }
    }

    // 4. Policy: recompute each embedded canonical form; bare commitments
    //    can only be format-checked.
    let mut policy_verification = true;
    for record in &bundle.records {
        let Some(commitment) = &record.policy_commitment else {
            continue;
        };

        let entry = bundle
            .policy_commitments
            .values()
            .find(|e| e.commitment_hash == *commitment);
        match entry {
            Some(entry) => match &entry.canonical_form {
                Some(form) => {
                    if encoding::sha256_hex(form.as_bytes()) != *commitment {
                        policy_verification = false;
                        errors.push(format!(
                            "policy commitment mismatch for record {}",
                            record.record_id
                        ));
                    }
                }
                None => {
                    if !encoding::is_hex_hash(commitment) {
                        policy_verification = false;
                        errors.push(format!(
                            "malformed policy commitment for record {}",
                            record.record_id
                        ));
                    }
                }
            },
            None => {
                policy_verification = false;
                errors.push(format!(
                    "policy commitment not embedded for record {}",
                    record.record_id
                ));
            }
        }
    }

    let valid =
        integrity_check && chain_verification && merkle_verification && policy_verification;

    BundleVerification {
        bundle_id: bundle.bundle_id.clone(),
        valid,
        integrity_check,
        chain_verification,
        merkle_verification,
        policy_verification,
        errors,
    }
}
