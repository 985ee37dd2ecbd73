pub mod classifier;
pub mod explanation;
pub mod features;
pub mod fusion;
pub mod guardrail;
#[cfg(feature = "linear_classifier")]
pub mod linear;
pub mod risk_level;
pub mod scoring;
pub mod strategy;
pub mod triggers;
