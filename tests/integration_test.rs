//! Interceptor-to-ledger integration
//!
//! Events flow through the interceptor and pipeline into the ledger;
//! the counter, the chain, and the batch boundaries all hold up together.

mod common;

use std::time::Duration;

use caas_audit::event::{EventFilter, EventInterceptor, EventType};
use caas_audit::ledger::{verify_records, AuditLedger};
use caas_audit::pipeline::{AdaptiveAuditPipeline, FidelityLevel};

use common::{init_tracing, object_event};

#[tokio::test]
async fn test_completeness_counter_through_pipeline() {
    init_tracing();

    let interceptor = EventInterceptor::new();
    let ledger = AuditLedger::new();
    let pipeline = AdaptiveAuditPipeline::new(ledger.clone());

    let total = 25;
    for i in 0..total {
        interceptor
            .intercept(object_event(&format!("evt-{}", i), "tenant-1", "bucket-a"))
            .await
            .unwrap();
    }

    assert_eq!(interceptor.count().await, total);
    assert!(interceptor.verify_completeness(total).await);

    while let Some(event) = interceptor.next(None).await {
        pipeline.process_event(&event, None, None, None).await.unwrap();
    }

    assert_eq!(ledger.count().await, total as usize);
    assert!(ledger.verify_chain_integrity().await);
}

#[tokio::test]
async fn test_drops_are_counted_but_not_processed() {
    init_tracing();

    let interceptor = EventInterceptor::with_capacity(3);

    for i in 0..5 {
        interceptor
            .intercept(object_event(&format!("evt-{}", i), "tenant-1", "bucket-a"))
            .await
            .unwrap();
    }

    // All five counted; only three pullable.
    assert!(interceptor.verify_completeness(5).await);
    let mut pulled = 0;
    while interceptor.next(None).await.is_some() {
        pulled += 1;
    }
    assert_eq!(pulled, 3);
}

#[tokio::test]
async fn test_timed_wait_delivers_late_event() {
    init_tracing();

    let interceptor = EventInterceptor::new();
    let producer = interceptor.clone();

    let waiter = tokio::spawn(async move {
        interceptor.next(Some(Duration::from_secs(2))).await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    producer
        .intercept(object_event("evt-late", "tenant-1", "bucket-a"))
        .await
        .unwrap();

    let got = waiter.await.unwrap();
    assert_eq!(got.unwrap().event_id, "evt-late");
}

#[tokio::test]
async fn test_filtered_routing_into_pipeline() {
    init_tracing();

    let interceptor = EventInterceptor::new();
    let ledger = AuditLedger::new();
    let pipeline = AdaptiveAuditPipeline::new(ledger.clone());

    let mut filter = EventFilter::new();
    filter.add_tenant_filter("tenant-audited");
    filter.add_event_type_filter(EventType::ObjectCreate);

    for (i, tenant) in ["tenant-audited", "tenant-other", "tenant-audited"]
        .iter()
        .enumerate()
    {
        interceptor
            .intercept(object_event(&format!("evt-{}", i), tenant, "bucket-a"))
            .await
            .unwrap();
    }

    while let Some(event) = interceptor.next(None).await {
        if filter.matches(&event) {
            pipeline.process_event(&event, None, None, None).await.unwrap();
        }
    }

    assert_eq!(ledger.count().await, 2);
}

#[tokio::test]
async fn test_batch_boundaries_across_fidelities() {
    init_tracing();

    let ledger = AuditLedger::with_batch_size(4).unwrap();
    let pipeline = AdaptiveAuditPipeline::new(ledger.clone());

    let levels = [
        FidelityLevel::MetadataOnly,
        FidelityLevel::Chained,
        FidelityLevel::PolicyBound,
        FidelityLevel::MerkleProof,
        FidelityLevel::Chained,
    ];

    let mut record_ids = Vec::new();
    for (i, level) in levels.iter().enumerate() {
        let processed = pipeline
            .process_event(
                &object_event(&format!("evt-{}", i), "tenant-1", "bucket-a"),
                None,
                None,
                Some(*level),
            )
            .await
            .unwrap();
        record_ids.push(processed.record.record_id.clone());
    }

    // One chain regardless of fidelity; first batch of four closed.
    assert!(ledger.verify_chain_integrity().await);
    assert_eq!(ledger.tree_count().await, 1);
    for id in &record_ids[..4] {
        let proof = ledger.generate_inclusion_proof(id).await.unwrap();
        assert!(proof.verify());
    }
    assert!(ledger.generate_inclusion_proof(&record_ids[4]).await.is_none());
}

#[tokio::test]
async fn test_snapshot_tamper_detection() {
    init_tracing();

    let ledger = AuditLedger::new();
    let pipeline = AdaptiveAuditPipeline::new(ledger.clone());

    for i in 0..3 {
        pipeline
            .process_event(
                &object_event(&format!("evt-{}", i), "tenant-1", "bucket-a"),
                None,
                None,
                None,
            )
            .await
            .unwrap();
    }

    let mut snapshot = ledger.records_snapshot().await;
    assert!(verify_records(&snapshot));

    snapshot[1].event_type = EventType::ObjectDelete;
    assert!(!verify_records(&snapshot));
}
