//! Volume-adaptive strategy selection.
//!
//! Small batches lack the statistical footing for a population-trained
//! classifier and run on deterministic rules only. Guardrails override in
//! every mode.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::StrategyParams;
use crate::types::clamp_unit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyMode {
    RuleBased,
    Hybrid,
    ModelDriven,
}

impl StrategyMode {
    pub fn consults_classifier(&self) -> bool {
        !matches!(self, StrategyMode::RuleBased)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyMode::RuleBased => "rule_based",
            StrategyMode::Hybrid => "hybrid",
            StrategyMode::ModelDriven => "model_driven",
        }
    }
}

impl fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySelection {
    pub mode: StrategyMode,
    pub batch_size: usize,
    /// Informational only; fusion never weights by it.
    pub blend_weight: Decimal,
}

/// Pure function of the batch size.
pub fn select_strategy(batch_size: usize, params: &StrategyParams) -> StrategySelection {
    let mode = if batch_size < params.hybrid_min_batch {
        StrategyMode::RuleBased
    } else if batch_size < params.model_driven_min_batch {
        StrategyMode::Hybrid
    } else {
        StrategyMode::ModelDriven
    };

    let span = params
        .model_driven_min_batch
        .saturating_sub(params.hybrid_min_batch);
    let blend_weight = if span == 0 {
        Decimal::ONE
    } else {
        let offset = Decimal::from(batch_size) - Decimal::from(params.hybrid_min_batch);
        clamp_unit(offset / Decimal::from(span))
    };

    StrategySelection {
        mode,
        batch_size,
        blend_weight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn mode(n: usize) -> StrategyMode {
        select_strategy(n, &StrategyParams::default()).mode
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(mode(0), StrategyMode::RuleBased);
        assert_eq!(mode(99), StrategyMode::RuleBased);
        assert_eq!(mode(100), StrategyMode::Hybrid);
        assert_eq!(mode(999), StrategyMode::Hybrid);
        assert_eq!(mode(1000), StrategyMode::ModelDriven);
        assert_eq!(mode(1_000_000), StrategyMode::ModelDriven);
    }

    #[test]
    fn test_blend_weight() {
        let params = StrategyParams::default();
        assert_eq!(select_strategy(50, &params).blend_weight, dec!(0));
        assert_eq!(select_strategy(100, &params).blend_weight, dec!(0));
        assert_eq!(select_strategy(550, &params).blend_weight, dec!(0.5));
        assert_eq!(select_strategy(1000, &params).blend_weight, dec!(1));
        assert_eq!(select_strategy(5000, &params).blend_weight, dec!(1));
    }

    #[test]
    fn test_selection_is_pure() {
        let params = StrategyParams::default();
        assert_eq!(select_strategy(420, &params), select_strategy(420, &params));
    }

    #[test]
    fn test_custom_cutoffs() {
        let params = StrategyParams {
            hybrid_min_batch: 10,
            model_driven_min_batch: 20,
        };
        assert_eq!(select_strategy(9, &params).mode, StrategyMode::RuleBased);
        assert_eq!(select_strategy(15, &params).blend_weight, dec!(0.5));
    }

    #[test]
    fn test_mode_serde() {
        assert_eq!(
            serde_json::to_string(&StrategyMode::ModelDriven).unwrap(),
            "\"model_driven\""
        );
        assert!(!StrategyMode::RuleBased.consults_classifier());
        assert!(StrategyMode::Hybrid.consults_classifier());
    }
}
