//! Composition root
//!
//! Wires the interceptor, compiler, ledger, pipeline, and verification
//! API together from one configuration, the way a host process embeds
//! the audit core. Events flow intercept -> pull -> pipeline -> ledger;
//! bundles come out of the verification API on demand.

use std::time::Duration;

use tracing::info;

use crate::config::AuditConfig;
use crate::error::Result;
use crate::event::{ComplianceEvent, EventInterceptor, InterceptOutcome};
use crate::ledger::AuditLedger;
use crate::pipeline::{AdaptiveAuditPipeline, Criticality, FidelityConfig, FidelityLevel, ProcessedEvent};
use crate::policy::PolicyCompiler;
use crate::verification::VerificationApi;

/// The assembled audit core.
#[derive(Clone)]
pub struct AuditService {
    interceptor: EventInterceptor,
    compiler: PolicyCompiler,
    ledger: AuditLedger,
    pipeline: AdaptiveAuditPipeline,
    verification: VerificationApi,
}

impl AuditService {
    pub fn new(config: AuditConfig) -> Result<Self> {
        let interceptor = EventInterceptor::with_capacity(config.queue_capacity);
        let compiler = PolicyCompiler::new();
        let ledger = AuditLedger::with_batch_size(config.batch_size)?;
        let pipeline = AdaptiveAuditPipeline::with_config(
            ledger.clone(),
            FidelityConfig::with_default(config.default_fidelity),
        );
        let verification = VerificationApi::new(ledger.clone(), compiler.clone());

        info!(
            queue_capacity = config.queue_capacity,
            batch_size = config.batch_size,
            default_fidelity = %config.default_fidelity,
            "audit service assembled"
        );

        Ok(Self {
            interceptor,
            compiler,
            ledger,
            pipeline,
            verification,
        })
    }

    /// Feed an event into the intercept path.
    pub async fn ingest(&self, event: ComplianceEvent) -> Result<InterceptOutcome> {
        self.interceptor.intercept(event).await
    }

    /// Pull the next intercepted event and run it through the pipeline.
    /// Returns `None` when no event arrives within the timeout.
    pub async fn process_next(
        &self,
        timeout: Option<Duration>,
        criticality: Option<Criticality>,
        override_level: Option<FidelityLevel>,
    ) -> Result<Option<ProcessedEvent>> {
        let Some(event) = self.interceptor.next(timeout).await else {
            return Ok(None);
        };

        // Policy-governed events bind to the latest compile for the
        // event's tenant-agnostic policy id carried in metadata, when the
        // producer supplied one.
        let policy = match event.metadata.get("policy_id").and_then(|v| v.as_str()) {
            Some(policy_id) => self.compiler.get(policy_id).await,
            None => None,
        };

        let processed = self
            .pipeline
            .process_event(&event, policy.as_ref(), criticality, override_level)
            .await?;
        Ok(Some(processed))
    }

    pub fn interceptor(&self) -> &EventInterceptor {
        &self.interceptor
    }

    pub fn compiler(&self) -> &PolicyCompiler {
        &self.compiler
    }

    pub fn ledger(&self) -> &AuditLedger {
        &self.ledger
    }

    pub fn pipeline(&self) -> &AdaptiveAuditPipeline {
        &self.pipeline
    }

    pub fn verification(&self) -> &VerificationApi {
        &self.verification
    }
}
