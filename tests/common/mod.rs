//! Shared fixtures for integration tests

use chrono::{DateTime, TimeZone, Utc};

use caas_audit::event::{ComplianceEvent, EventType};
use caas_audit::policy::{Policy, PolicyEffect, PolicyStatement};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caas_audit=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn object_event(id: &str, tenant: &str, bucket: &str) -> ComplianceEvent {
    let mut event = ComplianceEvent::new(id, EventType::ObjectCreate, base_time(), tenant, bucket);
    event.object_key = Some(format!("objects/{}.bin", id));
    event.principal = Some("svc-ingest".to_string());
    event
        .metadata
        .insert("region".to_string(), serde_json::json!("eu-west-1"));
    event
}

pub fn read_only_policy(policy_id: &str, version: &str) -> Policy {
    Policy::new(
        policy_id,
        version,
        "Read Only Access",
        vec![PolicyStatement::new(
            "stmt-read",
            PolicyEffect::Allow,
            vec!["s3:GetObject".to_string(), "s3:ListBucket".to_string()],
            vec!["bucket-a/*".to_string()],
        )],
    )
}
