//! End-to-end: policy compile, event ingest, proof bundle, offline verify
//!
//! The full path a compliance artifact travels: a policy becomes a
//! commitment, events become chained records bound to it, a batch closes,
//! and the resulting bundle verifies with no access to the live service.

mod common;

use caas_audit::config::AuditConfig;
use caas_audit::pipeline::{Criticality, FidelityLevel};
use caas_audit::service::AuditService;
use caas_audit::verification::verify_bundle;

use common::{base_time, init_tracing, object_event, read_only_policy};

fn small_batch_config() -> AuditConfig {
    AuditConfig {
        queue_capacity: 100,
        batch_size: 4,
        default_fidelity: FidelityLevel::Chained,
    }
}

#[tokio::test]
async fn test_policy_bound_bundle_round_trip() {
    init_tracing();

    let service = AuditService::new(small_batch_config()).unwrap();
    let canonical = service
        .compiler()
        .compile(&read_only_policy("policy-1", "1.0"))
        .await
        .unwrap();

    // Fill one Merkle batch with policy-bound events.
    let mut record_ids = Vec::new();
    for i in 0..4 {
        let mut event = object_event(&format!("evt-{}", i), "tenant-1", "bucket-a");
        event
            .metadata
            .insert("policy_id".to_string(), serde_json::json!("policy-1"));
        service.ingest(event).await.unwrap();

        let processed = service
            .process_next(None, None, Some(FidelityLevel::MerkleProof))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            processed.record.policy_commitment.as_deref(),
            Some(canonical.commitment_hash.as_str())
        );
        record_ids.push(processed.record.record_id.clone());
    }

    // Batch closed: a single-record bundle with proof and policy verifies
    // offline, all four sub-checks green.
    let bundle = service
        .verification()
        .create_single_record_bundle(&record_ids[2], true)
        .await
        .unwrap();
    assert!(bundle.merkle_proofs.contains_key(&record_ids[2]));
    assert!(bundle.policy_commitments.contains_key("policy-1"));

    let result = verify_bundle(&bundle);
    assert!(result.valid, "errors: {:?}", result.errors);
    assert!(result.integrity_check);
    assert!(result.chain_verification);
    assert!(result.merkle_verification);
    assert!(result.policy_verification);
}

#[tokio::test]
async fn test_bundle_survives_serialization() {
    init_tracing();

    let service = AuditService::new(small_batch_config()).unwrap();
    service
        .compiler()
        .compile(&read_only_policy("policy-1", "1.0"))
        .await
        .unwrap();

    let mut record_ids = Vec::new();
    for i in 0..4 {
        let mut event = object_event(&format!("evt-{}", i), "tenant-1", "bucket-a");
        event
            .metadata
            .insert("policy_id".to_string(), serde_json::json!("policy-1"));
        service.ingest(event).await.unwrap();
        let processed = service
            .process_next(None, Some(Criticality::Critical), None)
            .await
            .unwrap()
            .unwrap();
        record_ids.push(processed.record.record_id.clone());
    }

    let bundle = service
        .verification()
        .create_batch_bundle(&record_ids, true)
        .await
        .unwrap()
        .with_external_anchor(serde_json::json!({
            "anchor_type": "timestamp_service",
            "anchor_id": "tsa-0042"
        }));

    // An auditor receives JSON, parses it, and verifies with nothing else.
    let exported = bundle.to_json().unwrap();
    let received: caas_audit::verification::ComplianceProofBundle =
        serde_json::from_str(&exported).unwrap();

    let result = verify_bundle(&received);
    assert!(result.valid, "errors: {:?}", result.errors);
    assert_eq!(
        received.external_anchor.as_ref().unwrap()["anchor_id"],
        serde_json::json!("tsa-0042")
    );
}

#[tokio::test]
async fn test_tenant_and_time_range_bundles() {
    init_tracing();

    let service = AuditService::new(small_batch_config()).unwrap();

    for (i, tenant) in ["tenant-a", "tenant-b", "tenant-a", "tenant-a"]
        .iter()
        .enumerate()
    {
        service
            .ingest(object_event(&format!("evt-{}", i), tenant, "bucket-a"))
            .await
            .unwrap();
        service.process_next(None, None, None).await.unwrap().unwrap();
    }

    let tenant_bundle = service
        .verification()
        .create_tenant_bundle("tenant-a", None, false)
        .await
        .unwrap();
    assert_eq!(tenant_bundle.records.len(), 3);
    let result = verify_bundle(&tenant_bundle);
    assert!(result.valid, "errors: {:?}", result.errors);

    // All fixture events share one timestamp; [t, t+1h) includes them,
    // [t+1h, t+2h) is empty.
    let from = base_time();
    let to = from + chrono::Duration::hours(1);
    let in_range = service
        .verification()
        .create_time_range_bundle(from, to, Some("tenant-b"), false)
        .await
        .unwrap();
    assert_eq!(in_range.records.len(), 1);

    let empty = service
        .verification()
        .create_time_range_bundle(to, to + chrono::Duration::hours(1), None, false)
        .await
        .unwrap();
    assert!(empty.records.is_empty());
    assert!(verify_bundle(&empty).valid);
}

#[tokio::test]
async fn test_recompiled_policy_changes_commitment() {
    init_tracing();

    let service = AuditService::new(small_batch_config()).unwrap();

    let v1 = service
        .compiler()
        .compile(&read_only_policy("policy-1", "1.0"))
        .await
        .unwrap();

    let mut widened = read_only_policy("policy-1", "2.0");
    widened.statements[0]
        .actions
        .push("s3:PutObject".to_string());
    let v2 = service.compiler().compile(&widened).await.unwrap();

    assert_ne!(v1.commitment_hash, v2.commitment_hash);
    assert_eq!(
        service.compiler().versions("policy-1").await,
        vec!["1.0", "2.0"]
    );

    // New bindings pick up the latest compile.
    let mut event = object_event("evt-0", "tenant-1", "bucket-a");
    event
        .metadata
        .insert("policy_id".to_string(), serde_json::json!("policy-1"));
    service.ingest(event).await.unwrap();
    let processed = service
        .process_next(None, None, Some(FidelityLevel::PolicyBound))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        processed.record.policy_commitment.as_deref(),
        Some(v2.commitment_hash.as_str())
    );

    let bundle = service
        .verification()
        .create_single_record_bundle(&processed.record.record_id, false)
        .await
        .unwrap();
    let result = verify_bundle(&bundle);
    assert!(result.valid, "errors: {:?}", result.errors);
}
