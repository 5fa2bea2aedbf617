use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};
use crate::pipeline::FidelityLevel;

/// Runtime configuration for the audit core.
///
/// Loaded from environment variables with sensible defaults so the library
/// can be embedded without any configuration at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Bounded capacity of the interceptor's pull queue.
    pub queue_capacity: usize,
    /// Number of records per closed Merkle batch.
    pub batch_size: usize,
    /// Fidelity applied when no override, bucket, tenant, or criticality
    /// configuration matches.
    pub default_fidelity: FidelityLevel,
}

impl AuditConfig {
    pub fn load() -> Result<Self> {
        let queue_capacity = env::var("CAAS_QUEUE_CAPACITY")
            .unwrap_or_else(|_| "10000".to_string())
            .parse()
            .map_err(|e| AuditError::ConfigError(format!("CAAS_QUEUE_CAPACITY: {}", e)))?;

        let batch_size = env::var("CAAS_BATCH_SIZE")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .map_err(|e| AuditError::ConfigError(format!("CAAS_BATCH_SIZE: {}", e)))?;

        let default_fidelity = env::var("CAAS_DEFAULT_FIDELITY")
            .unwrap_or_else(|_| "chained".to_string())
            .parse()
            .map_err(|e: AuditError| AuditError::ConfigError(format!("CAAS_DEFAULT_FIDELITY: {}", e)))?;

        Ok(AuditConfig {
            queue_capacity,
            batch_size,
            default_fidelity,
        })
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            batch_size: 100,
            default_fidelity: FidelityLevel::Chained,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuditConfig::default();
        assert_eq!(config.queue_capacity, 10_000);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.default_fidelity, FidelityLevel::Chained);
    }
}
