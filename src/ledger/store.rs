//! The append-only ledger
//!
//! One writer at a time: `append` takes the write lock and performs the
//! whole transaction (chain link, hash, index, batch close) before
//! releasing it. Readers share a read lock and never observe a partially
//! updated state. A failed append leaves no trace in the list or index.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::encoding::GENESIS_HASH;
use crate::error::{AuditError, Result};
use crate::ledger::merkle::{MerkleProof, MerkleTree};
use crate::ledger::record::AuditRecord;

const DEFAULT_BATCH_SIZE: usize = 100;

struct LedgerState {
    records: Vec<AuditRecord>,
    record_index: HashMap<String, usize>,
    merkle_trees: Vec<MerkleTree>,
    batch_size: usize,
}

/// Append-only audit ledger with hash chaining and batched Merkle trees.
#[derive(Clone)]
pub struct AuditLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl AuditLedger {
    pub fn new() -> Self {
        Self::with_batch_size(DEFAULT_BATCH_SIZE).expect("default batch size is non-zero")
    }

    pub fn with_batch_size(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(AuditError::InvalidInput(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            state: Arc::new(RwLock::new(LedgerState {
                records: Vec::new(),
                record_index: HashMap::new(),
                merkle_trees: Vec::new(),
                batch_size,
            })),
        })
    }

    /// Change the Merkle batch size. Only legal before the first append;
    /// changing it mid-stream would make batch boundaries ambiguous.
    pub async fn set_batch_size(&self, batch_size: usize) -> Result<()> {
        if batch_size == 0 {
            return Err(AuditError::InvalidInput(
                "batch size must be at least 1".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        if !state.records.is_empty() {
            return Err(AuditError::InvalidInput(format!(
                "batch size cannot change after {} records were appended",
                state.records.len()
            )));
        }
        state.batch_size = batch_size;
        Ok(())
    }

    pub async fn batch_size(&self) -> usize {
        self.state.read().await.batch_size
    }

    /// Append a record: link it to the chain head, hash it, index it, and
    /// close a Merkle batch when one fills up. Returns the record hash.
    pub async fn append(&self, mut record: AuditRecord) -> Result<String> {
        let mut state = self.state.write().await;

        if state.record_index.contains_key(&record.record_id) {
            return Err(AuditError::InvalidInput(format!(
                "record id '{}' already appended",
                record.record_id
            )));
        }

        record.previous_hash = Some(match state.records.last() {
            Some(last) => last
                .record_hash
                .clone()
                .ok_or_else(|| {
                    AuditError::InvariantViolation("chain head has no record hash".to_string())
                })?,
            None => GENESIS_HASH.to_string(),
        });

        let record_hash = record.compute_hash()?;
        record.record_hash = Some(record_hash.clone());

        let index = state.records.len();
        state.record_index.insert(record.record_id.clone(), index);
        debug!(
            record_id = %record.record_id,
            index,
            record_hash = %record_hash,
            "appended audit record"
        );
        state.records.push(record);

        if state.records.len() % state.batch_size == 0 {
            let start = state.merkle_trees.len() * state.batch_size;
            let end = start + state.batch_size;
            let leaf_hashes: Vec<String> = state.records[start..end]
                .iter()
                .filter_map(|r| r.record_hash.clone())
                .collect();

            let tree = MerkleTree::new(leaf_hashes);
            info!(
                batch = state.merkle_trees.len(),
                root = %tree.root_hash(),
                "closed merkle batch"
            );
            state.merkle_trees.push(tree);
        }

        Ok(record_hash)
    }

    pub async fn get(&self, record_id: &str) -> Option<AuditRecord> {
        let state = self.state.read().await;
        state
            .record_index
            .get(record_id)
            .map(|&idx| state.records[idx].clone())
    }

    pub async fn latest(&self) -> Option<AuditRecord> {
        self.state.read().await.records.last().cloned()
    }

    pub async fn count(&self) -> usize {
        self.state.read().await.records.len()
    }

    /// Number of closed Merkle batches.
    pub async fn tree_count(&self) -> usize {
        self.state.read().await.merkle_trees.len()
    }

    /// Root of a closed batch, for anchoring collaborators.
    pub async fn merkle_root(&self, batch_index: usize) -> Option<String> {
        self.state
            .read()
            .await
            .merkle_trees
            .get(batch_index)
            .map(|tree| tree.root_hash())
    }

    /// Clone-out of every record, in append order. Read-only view for
    /// bundle builders and persistence adapters.
    pub async fn records_snapshot(&self) -> Vec<AuditRecord> {
        self.state.read().await.records.clone()
    }

    /// Walk the whole ledger: recompute every record hash and check every
    /// chain link, including the genesis link at index 0. Returns false on
    /// any mismatch; never errors.
    pub async fn verify_chain_integrity(&self) -> bool {
        let state = self.state.read().await;
        verify_records(&state.records)
    }

    /// Inclusion proof for a record, or `None` when the record is unknown
    /// or its batch has not closed yet.
    pub async fn generate_inclusion_proof(&self, record_id: &str) -> Option<MerkleProof> {
        let state = self.state.read().await;
        let &idx = state.record_index.get(record_id)?;

        let tree_index = idx / state.batch_size;
        let tree = state.merkle_trees.get(tree_index)?;

        tree.generate_proof(idx % state.batch_size)
    }

    #[cfg(test)]
    pub(crate) async fn tamper_for_test<F>(&self, record_id: &str, mutate: F)
    where
        F: FnOnce(&mut AuditRecord),
    {
        let mut state = self.state.write().await;
        let idx = state.record_index[record_id];
        mutate(&mut state.records[idx]);
    }
}

impl Default for AuditLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Chain verification over a record slice. Usable offline against a
/// snapshot as well as by the ledger itself.
pub fn verify_records(records: &[AuditRecord]) -> bool {
    for (i, record) in records.iter().enumerate() {
        let computed = match record.compute_hash() {
            Ok(hash) => hash,
            Err(_) => return false,
        };
        if record.record_hash.as_deref() != Some(computed.as_str()) {
            return false;
        }

        let expected_previous = if i == 0 {
            GENESIS_HASH.to_string()
        } else {
            match &records[i - 1].record_hash {
                Some(hash) => hash.clone(),
                None => return false,
            }
        };
        if record.previous_hash.as_deref() != Some(expected_previous.as_str()) {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use chrono::{TimeZone, Utc};

    fn record(id: &str) -> AuditRecord {
        AuditRecord::new(
            id,
            format!("evt-{}", id),
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            EventType::ObjectCreate,
            "tenant-1",
            "test-bucket",
        )
    }

    #[tokio::test]
    async fn test_genesis_link() {
        let ledger = AuditLedger::new();
        ledger.append(record("rec-1")).await.unwrap();

        let first = ledger.get("rec-1").await.unwrap();
        assert_eq!(first.previous_hash.as_deref(), Some(GENESIS_HASH));
    }

    #[tokio::test]
    async fn test_two_record_chain() {
        let ledger = AuditLedger::new();
        let first_hash = ledger.append(record("rec-1")).await.unwrap();
        ledger.append(record("rec-2")).await.unwrap();

        let second = ledger.get("rec-2").await.unwrap();
        assert_eq!(second.previous_hash.as_deref(), Some(first_hash.as_str()));
        assert!(ledger.verify_chain_integrity().await);
    }

    #[tokio::test]
    async fn test_tamper_detection() {
        let ledger = AuditLedger::new();
        ledger.append(record("rec-1")).await.unwrap();
        ledger.append(record("rec-2")).await.unwrap();
        assert!(ledger.verify_chain_integrity().await);

        ledger
            .tamper_for_test("rec-1", |r| r.event_type = EventType::ObjectDelete)
            .await;
        assert!(!ledger.verify_chain_integrity().await);
    }

    #[tokio::test]
    async fn test_tamper_detection_on_any_field() {
        let ledger = AuditLedger::new();
        ledger.append(record("rec-1")).await.unwrap();
        ledger.append(record("rec-2")).await.unwrap();

        ledger
            .tamper_for_test("rec-2", |r| {
                r.metadata
                    .insert("injected".to_string(), serde_json::json!(true));
            })
            .await;
        assert!(!ledger.verify_chain_integrity().await);
    }

    #[tokio::test]
    async fn test_duplicate_record_id_rejected() {
        let ledger = AuditLedger::new();
        ledger.append(record("rec-1")).await.unwrap();

        let result = ledger.append(record("rec-1")).await;
        assert!(result.is_err());
        assert_eq!(ledger.count().await, 1);
        assert!(ledger.verify_chain_integrity().await);
    }

    #[tokio::test]
    async fn test_batch_close_and_proofs() {
        let ledger = AuditLedger::with_batch_size(4).unwrap();
        for i in 0..4 {
            ledger.append(record(&format!("rec-{}", i))).await.unwrap();
        }

        assert_eq!(ledger.tree_count().await, 1);
        let proof = ledger.generate_inclusion_proof("rec-2").await.unwrap();
        assert_eq!(proof.proof_path.len(), 2);
        assert!(proof.verify());
        assert_eq!(
            Some(proof.root_hash.clone()),
            ledger.merkle_root(0).await
        );

        let mut bad = proof.clone();
        bad.proof_path[1].sibling_hash = crate::encoding::sha256_hex(b"swapped");
        assert!(!bad.verify());
    }

    #[tokio::test]
    async fn test_open_tail_has_no_proof() {
        let ledger = AuditLedger::with_batch_size(4).unwrap();
        for i in 0..6 {
            ledger.append(record(&format!("rec-{}", i))).await.unwrap();
        }

        // rec-0..rec-3 are in the closed batch, rec-4 and rec-5 are not.
        assert!(ledger.generate_inclusion_proof("rec-3").await.is_some());
        assert!(ledger.generate_inclusion_proof("rec-4").await.is_none());
        assert!(ledger.generate_inclusion_proof("rec-5").await.is_none());
        assert!(ledger.generate_inclusion_proof("rec-9").await.is_none());
    }

    #[tokio::test]
    async fn test_proof_coverage_boundary() {
        let batch_size = 3;
        let ledger = AuditLedger::with_batch_size(batch_size).unwrap();
        let total = 8;
        for i in 0..total {
            ledger.append(record(&format!("rec-{}", i))).await.unwrap();
        }

        let covered = batch_size * (total / batch_size);
        for i in 0..total {
            let proof = ledger
                .generate_inclusion_proof(&format!("rec-{}", i))
                .await;
            assert_eq!(proof.is_some(), i < covered, "boundary wrong at {}", i);
            if let Some(proof) = proof {
                assert!(proof.verify());
            }
        }
    }

    #[tokio::test]
    async fn test_batch_size_locked_after_append() {
        let ledger = AuditLedger::new();
        ledger.set_batch_size(50).await.unwrap();
        assert_eq!(ledger.batch_size().await, 50);

        ledger.append(record("rec-1")).await.unwrap();
        assert!(ledger.set_batch_size(10).await.is_err());
        assert!(ledger.set_batch_size(0).await.is_err());
        assert_eq!(ledger.batch_size().await, 50);
    }

    #[tokio::test]
    async fn test_latest_and_count() {
        let ledger = AuditLedger::new();
        assert!(ledger.latest().await.is_none());
        assert_eq!(ledger.count().await, 0);

        ledger.append(record("rec-1")).await.unwrap();
        ledger.append(record("rec-2")).await.unwrap();

        assert_eq!(ledger.latest().await.unwrap().record_id, "rec-2");
        assert_eq!(ledger.count().await, 2);
    }

    #[tokio::test]
    async fn test_verify_records_on_snapshot() {
        let ledger = AuditLedger::new();
        ledger.append(record("rec-1")).await.unwrap();
        ledger.append(record("rec-2")).await.unwrap();

        let mut snapshot = ledger.records_snapshot().await;
        assert!(verify_records(&snapshot));

        snapshot[0].bucket = "other-bucket".to_string();
        assert!(!verify_records(&snapshot));
    }
}
