pub mod classification;
pub mod config;
pub mod engine;
pub mod error;
pub mod regulatory;
pub mod types;

pub use config::EngineConfig;
pub use engine::{BatchAssessment, RiskEngine, TransactionAssessment};
pub use error::AmlRiskError;
pub use regulatory::profile::{RegulatoryConfig, RegulatoryProfile};
pub use types::*;

/// Standard result type for all aml-risk operations
pub type AmlRiskResult<T> = Result<T, AmlRiskError>;
