pub mod classify;
pub mod strategy;
pub mod thresholds;

use aml_risk_core::{EngineConfig, RegulatoryConfig, RegulatoryProfile};

use crate::input;

/// Engine configuration from `--config`, or the built-in defaults.
pub fn load_engine_config(
    path: Option<&str>,
) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(p) => input::file::read_config::<EngineConfig>(p)?,
        None => EngineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

pub fn load_regulatory_profile(
    path: &str,
) -> Result<RegulatoryProfile, Box<dyn std::error::Error>> {
    let config: RegulatoryConfig = input::file::read_config(path)?;
    Ok(RegulatoryProfile::from_config(&config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_engine_yaml_matches_defaults() {
        let yaml = include_str!("../../../../config/engine.yaml");
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config, EngineConfig::default());
    }
}
