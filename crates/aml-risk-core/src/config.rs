//! Versioned engine configuration.
//!
//! Every tunable of the scorer, fusion resolver, strategy selector and
//! consolidator lives here as data. Compliance teams replace the whole
//! object at runtime (see `RiskEngine::reconfigure`); the code never
//! branches on a version string.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Probability, Score, Weight};
use crate::{AmlRiskError, AmlRiskResult};

/// Tolerance allowed when checking that factor weights sum to one.
const WEIGHT_SUM_TOLERANCE: Decimal = dec!(0.0001);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub amount: Weight,
    pub operation_type: Weight,
    pub temporal: Weight,
    pub historical: Weight,
    pub context: Weight,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        ScoringWeights {
            amount: dec!(0.25),
            operation_type: dec!(0.25),
            temporal: dec!(0.10),
            historical: dec!(0.25),
            context: dec!(0.15),
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> Weight {
        self.amount + self.operation_type + self.temporal + self.historical + self.context
    }
}

/// Probability cut-offs that turn a classifier probability vector into a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierThresholds {
    pub reportable: Probability,
    pub unusual: Probability,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        ClassifierThresholds {
            reportable: dec!(0.60),
            unusual: dec!(0.50),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionParams {
    /// Classifier max-class confidence strictly above this adopts its label.
    pub classifier_override_confidence: Probability,
}

impl Default for FusionParams {
    fn default() -> Self {
        FusionParams {
            classifier_override_confidence: dec!(0.8),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    /// Smallest batch evaluated in hybrid mode.
    pub hybrid_min_batch: usize,
    /// Smallest batch evaluated in model_driven mode.
    pub model_driven_min_batch: usize,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            hybrid_min_batch: 100,
            model_driven_min_batch: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationParams {
    pub medium_score_threshold: Score,
    pub low_confidence_threshold: Probability,
    /// Maximum points added for a classifier confidence shortfall.
    pub max_confidence_penalty: Decimal,
    /// Maximum points contributed by the weighted score.
    pub max_score_points: Decimal,
    pub guardrail_floor: Decimal,
}

impl Default for ConsolidationParams {
    fn default() -> Self {
        ConsolidationParams {
            medium_score_threshold: dec!(0.35),
            low_confidence_threshold: dec!(0.70),
            max_confidence_penalty: dec!(7),
            max_score_points: dec!(20),
            guardrail_floor: dec!(95),
        }
    }
}

/// Cut-offs for heuristic trigger detection and scorer sub-signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicParams {
    /// Amount above which a single operation counts as significant.
    pub large_amount: Money,
    /// Amount above which a round cash operation is suspicious.
    pub round_cash_amount: Money,
    pub high_monthly_frequency: u32,
    pub deviation_ratio: Decimal,
    pub high_variability_cv: Decimal,
    /// Share of the notice threshold at which accumulation counts as "near".
    pub accumulation_near_ratio: Decimal,
    pub guardrail_score_floor: Score,
    pub multi_trigger_bonus: Score,
    pub dual_trigger_bonus: Score,
}

impl Default for HeuristicParams {
    fn default() -> Self {
        HeuristicParams {
            large_amount: dec!(100_000),
            round_cash_amount: dec!(50_000),
            high_monthly_frequency: 10,
            deviation_ratio: dec!(3),
            high_variability_cv: dec!(1),
            accumulation_near_ratio: dec!(0.8),
            guardrail_score_floor: dec!(0.9),
            multi_trigger_bonus: dec!(0.10),
            dual_trigger_bonus: dec!(0.05),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub version: String,
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default)]
    pub classifier_thresholds: ClassifierThresholds,
    #[serde(default)]
    pub fusion: FusionParams,
    #[serde(default)]
    pub strategy: StrategyParams,
    #[serde(default)]
    pub consolidation: ConsolidationParams,
    #[serde(default)]
    pub heuristics: HeuristicParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            version: "v1".to_string(),
            weights: ScoringWeights::default(),
            classifier_thresholds: ClassifierThresholds::default(),
            fusion: FusionParams::default(),
            strategy: StrategyParams::default(),
            consolidation: ConsolidationParams::default(),
            heuristics: HeuristicParams::default(),
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> AmlRiskError {
    AmlRiskError::InvalidInput {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn check_unit(field: &str, value: Decimal) -> AmlRiskResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(invalid(field, format!("must be within [0, 1], got {}", value)));
    }
    Ok(())
}

impl EngineConfig {
    pub fn from_json(json: &str) -> AmlRiskResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AmlRiskResult<()> {
        if self.version.trim().is_empty() {
            return Err(invalid("version", "must not be empty"));
        }

        let w = &self.weights;
        for (name, value) in [
            ("weights.amount", w.amount),
            ("weights.operation_type", w.operation_type),
            ("weights.temporal", w.temporal),
            ("weights.historical", w.historical),
            ("weights.context", w.context),
        ] {
            check_unit(name, value)?;
        }
        if (w.sum() - Decimal::ONE).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(invalid(
                "weights",
                format!("must sum to 1.0, got {}", w.sum()),
            ));
        }

        check_unit(
            "classifier_thresholds.reportable",
            self.classifier_thresholds.reportable,
        )?;
        check_unit(
            "classifier_thresholds.unusual",
            self.classifier_thresholds.unusual,
        )?;
        check_unit(
            "fusion.classifier_override_confidence",
            self.fusion.classifier_override_confidence,
        )?;

        if self.strategy.hybrid_min_batch >= self.strategy.model_driven_min_batch {
            return Err(invalid(
                "strategy",
                "hybrid_min_batch must be below model_driven_min_batch",
            ));
        }

        let c = &self.consolidation;
        check_unit("consolidation.medium_score_threshold", c.medium_score_threshold)?;
        check_unit(
            "consolidation.low_confidence_threshold",
            c.low_confidence_threshold,
        )?;
        if c.max_confidence_penalty < Decimal::ZERO || c.max_score_points < Decimal::ZERO {
            return Err(invalid("consolidation", "point caps must be non-negative"));
        }
        if c.guardrail_floor < Decimal::ZERO || c.guardrail_floor > dec!(100) {
            return Err(invalid("consolidation.guardrail_floor", "must be within [0, 100]"));
        }

        let h = &self.heuristics;
        check_unit("heuristics.guardrail_score_floor", h.guardrail_score_floor)?;
        check_unit("heuristics.multi_trigger_bonus", h.multi_trigger_bonus)?;
        check_unit("heuristics.dual_trigger_bonus", h.dual_trigger_bonus)?;
        if h.large_amount < Decimal::ZERO || h.round_cash_amount < Decimal::ZERO {
            return Err(invalid("heuristics", "amount cut-offs must be non-negative"));
        }
        if h.accumulation_near_ratio <= Decimal::ZERO || h.accumulation_near_ratio > Decimal::ONE {
            return Err(invalid(
                "heuristics.accumulation_near_ratio",
                "must be within (0, 1]",
            ));
        }

        Ok(())
    }
}
