use thiserror::Error;

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        Self::CryptoError(format!("JSON serialization error: {}", err))
    }
}

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Queue full: {0}")]
    QueueFull(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Cryptographic error: {0}")]
    CryptoError(String),
}

impl AuditError {
    pub fn record_not_found(record_id: &str) -> Self {
        Self::NotFound(format!("record '{}' is not in the ledger", record_id))
    }

    pub fn policy_not_found(policy_id: &str) -> Self {
        Self::NotFound(format!("policy '{}' has not been compiled", policy_id))
    }

    pub fn missing_field(entity: &str, field: &str) -> Self {
        Self::InvalidInput(format!("{} requires a non-empty {}", entity, field))
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
