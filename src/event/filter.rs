//! Event filtering
//!
//! Additive allow-lists over tenant, bucket, and event type. An empty list
//! matches everything; `matches` is the conjunction of the non-empty lists.

use crate::event::types::{ComplianceEvent, EventType};

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    tenant_filters: Vec<String>,
    bucket_filters: Vec<String>,
    event_type_filters: Vec<EventType>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tenant_filter(&mut self, tenant_id: impl Into<String>) {
        self.tenant_filters.push(tenant_id.into());
    }

    pub fn add_bucket_filter(&mut self, bucket: impl Into<String>) {
        self.bucket_filters.push(bucket.into());
    }

    pub fn add_event_type_filter(&mut self, event_type: EventType) {
        self.event_type_filters.push(event_type);
    }

    pub fn matches(&self, event: &ComplianceEvent) -> bool {
        if !self.tenant_filters.is_empty() && !self.tenant_filters.contains(&event.tenant_id) {
            return false;
        }

        if !self.bucket_filters.is_empty() && !self.bucket_filters.contains(&event.bucket) {
            return false;
        }

        if !self.event_type_filters.is_empty()
            && !self.event_type_filters.contains(&event.event_type)
        {
            return false;
        }

        true
    }
}
