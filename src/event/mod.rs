//! Compliance Event Interceptor
//!
//! Captures mutation events from the object-storage control plane before
//! they reach the audit pipeline.

pub mod filter;
pub mod interceptor;
pub mod types;

pub use filter::EventFilter;
pub use interceptor::{EventInterceptor, InterceptOutcome};
pub use types::{ComplianceEvent, EventType, Metadata};
