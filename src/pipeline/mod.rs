//! Adaptive Audit Pipeline
//!
//! Maps each event to a fidelity level and emits a ledger record carrying
//! the cryptographic material that level calls for.

pub mod fidelity;
pub mod processor;

pub use fidelity::{Criticality, FidelityConfig, FidelityLevel};
pub use processor::{AdaptiveAuditPipeline, PipelineStatistics, ProcessedEvent};
