use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmlRiskError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Malformed row {index}: {reason}")]
    MalformedRow { index: usize, reason: String },

    #[error("Configuration error for fraction '{fraction}': {reason}")]
    Configuration { fraction: String, reason: String },

    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for AmlRiskError {
    fn from(e: serde_json::Error) -> Self {
        AmlRiskError::SerializationError(e.to_string())
    }
}
