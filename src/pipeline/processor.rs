//! Event processing
//!
//! Builds one ledger record per event. Every fidelity level appends
//! through the same ledger (there is a single chain); `METADATA_ONLY`
//! differs only in the emitted artifact, whose chain context is
//! suppressed before the caller sees it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::encoding::GENESIS_HASH;
use crate::error::Result;
use crate::event::ComplianceEvent;
use crate::ledger::{AuditLedger, AuditRecord, MerkleProof};
use crate::pipeline::fidelity::{Criticality, FidelityConfig, FidelityLevel};
use crate::policy::CanonicalPolicy;

/// Callback invoked after a record is appended. Errors are logged and
/// never fail the processing call.
pub type ProcessedHandler = Box<dyn Fn(&ProcessedEvent) -> anyhow::Result<()> + Send + Sync>;

/// Result of running one event through the pipeline.
#[derive(Debug, Clone)]
pub struct ProcessedEvent {
    /// The emitted record. For `METADATA_ONLY` this copy carries the
    /// genesis value as `previous_hash`; the ledger's stored record keeps
    /// its real chain link.
    pub record: AuditRecord,
    pub fidelity: FidelityLevel,
    pub policy_commitment: Option<String>,
    /// Present only for `MERKLE_PROOF` once the containing batch closes.
    pub merkle_proof: Option<MerkleProof>,
}

/// Per-fidelity processing totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStatistics {
    pub total_processed: u64,
    pub fidelity_distribution: HashMap<FidelityLevel, u64>,
    pub ledger_record_count: usize,
}

/// Routes events into the ledger at the configured fidelity.
#[derive(Clone)]
pub struct AdaptiveAuditPipeline {
    ledger: AuditLedger,
    config: Arc<RwLock<FidelityConfig>>,
    handlers: Arc<RwLock<Vec<ProcessedHandler>>>,
    fidelity_counts: Arc<Mutex<HashMap<FidelityLevel, u64>>>,
}

impl AdaptiveAuditPipeline {
    pub fn new(ledger: AuditLedger) -> Self {
        Self::with_config(ledger, FidelityConfig::default())
    }

    pub fn with_config(ledger: AuditLedger, config: FidelityConfig) -> Self {
        Self {
            ledger,
            config: Arc::new(RwLock::new(config)),
            handlers: Arc::new(RwLock::new(Vec::new())),
            fidelity_counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn ledger(&self) -> &AuditLedger {
        &self.ledger
    }

    pub async fn register_handler(&self, handler: ProcessedHandler) {
        self.handlers.write().await.push(handler);
    }

    pub async fn set_tenant_fidelity(&self, tenant_id: impl Into<String>, level: FidelityLevel) {
        self.config.write().await.set_tenant_fidelity(tenant_id, level);
    }

    pub async fn set_bucket_fidelity(&self, bucket: impl Into<String>, level: FidelityLevel) {
        self.config.write().await.set_bucket_fidelity(bucket, level);
    }

    pub async fn set_criticality_fidelity(&self, criticality: Criticality, level: FidelityLevel) {
        self.config
            .write()
            .await
            .set_criticality_fidelity(criticality, level);
    }

    /// Process one event: select fidelity, build the record, append it,
    /// and for `MERKLE_PROOF` attempt to fetch the inclusion proof (which
    /// stays `None` while the batch is open).
    pub async fn process_event(
        &self,
        event: &ComplianceEvent,
        policy: Option<&CanonicalPolicy>,
        criticality: Option<Criticality>,
        override_level: Option<FidelityLevel>,
    ) -> Result<ProcessedEvent> {
        event.validate()?;

        let fidelity = self
            .config
            .read()
            .await
            .select(&event.tenant_id, &event.bucket, criticality, override_level);

        let policy_commitment = match fidelity {
            FidelityLevel::PolicyBound | FidelityLevel::MerkleProof => {
                policy.map(|p| p.commitment_hash.clone())
            }
            _ => None,
        };

        let record = self.build_record(event, fidelity, policy_commitment.clone());
        let record_id = record.record_id.clone();
        self.ledger.append(record).await?;

        // Re-read the stored record to pick up the chain fields the
        // append transaction filled in.
        let mut emitted = self
            .ledger
            .get(&record_id)
            .await
            .expect("record visible immediately after append");

        if fidelity == FidelityLevel::MetadataOnly {
            emitted.previous_hash = Some(GENESIS_HASH.to_string());
        }

        let merkle_proof = if fidelity == FidelityLevel::MerkleProof {
            self.ledger.generate_inclusion_proof(&record_id).await
        } else {
            None
        };

        {
            let mut counts = self.fidelity_counts.lock().await;
            *counts.entry(fidelity).or_insert(0) += 1;
        }

        let processed = ProcessedEvent {
            record: emitted,
            fidelity,
            policy_commitment,
            merkle_proof,
        };

        let handlers = self.handlers.read().await;
        for handler in handlers.iter() {
            if let Err(e) = handler(&processed) {
                warn!(event_id = %event.event_id, "processed-event handler failed: {}", e);
            }
        }

        debug!(
            event_id = %event.event_id,
            fidelity = %fidelity,
            record_id = %record_id,
            "processed event"
        );
        Ok(processed)
    }

    fn build_record(
        &self,
        event: &ComplianceEvent,
        fidelity: FidelityLevel,
        policy_commitment: Option<String>,
    ) -> AuditRecord {
        let mut record = AuditRecord::new(
            Uuid::new_v4().to_string(),
            event.event_id.clone(),
            event.timestamp,
            event.event_type,
            event.tenant_id.clone(),
            event.bucket.clone(),
        );
        record.object_key = event.object_key.clone();
        record.policy_commitment = policy_commitment;

        record
            .metadata
            .insert("fidelity".to_string(), serde_json::json!(fidelity.as_str()));
        record
            .metadata
            .insert("principal".to_string(), serde_json::json!(event.principal));
        if fidelity != FidelityLevel::MetadataOnly {
            record.metadata.insert(
                "event_metadata".to_string(),
                serde_json::Value::Object(event.metadata.clone().into_iter().collect()),
            );
        }

        record
    }

    pub async fn statistics(&self) -> PipelineStatistics {
        let fidelity_distribution = self.fidelity_counts.lock().await.clone();
        PipelineStatistics {
            total_processed: fidelity_distribution.values().sum(),
            fidelity_distribution,
            ledger_record_count: self.ledger.count().await,
        }
    }
}
