//! Weighted risk scoring (EBR).
//!
//! Five factors, each clamped to [0, 1] and weighted by `ScoringWeights`.
//! Within a factor the worst sub-signal wins (max); across factors the
//! weighted sum keeps any single dimension from dominating.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

use crate::config::{EngineConfig, HeuristicParams};
use crate::regulatory::profile::{ResolvedThresholds, Threshold};
use crate::types::{clamp_unit, Score, Weight};
use crate::AmlRiskError;

use super::features::TransactionFeatures;
use super::triggers::TriggerList;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    Amount,
    OperationType,
    Temporal,
    Historical,
    Context,
}

impl RiskFactor {
    pub fn label(&self) -> &'static str {
        match self {
            RiskFactor::Amount => "amount relative to the notice threshold",
            RiskFactor::OperationType => "operation type (cash / international)",
            RiskFactor::Temporal => "off-hours timing of a cash or international operation",
            RiskFactor::Historical => "deviation from the customer's historical behaviour",
            RiskFactor::Context => "sector and accumulation context",
        }
    }
}

impl fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    pub factor: RiskFactor,
    pub raw: Score,
    pub weight: Weight,
    pub contribution: Score,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreAdjustment {
    None,
    GuardrailFloor { floor: Score },
    TriggerBonus { unusual_triggers: usize, bonus: Score },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    /// Weighted sum before post-adjustment.
    pub base: Score,
    pub adjustment: ScoreAdjustment,
    /// Final score in [0, 1].
    pub value: Score,
    pub factors: Vec<FactorScore>,
}

impl RiskScore {
    /// Factors with a non-zero contribution, largest first. Ties keep factor order.
    pub fn ranked_factors(&self) -> Vec<&FactorScore> {
        let mut ranked: Vec<&FactorScore> = self
            .factors
            .iter()
            .filter(|f| f.contribution > Decimal::ZERO)
            .collect();
        ranked.sort_by(|a, b| b.contribution.cmp(&a.contribution));
        ranked
    }
}

// ---------------------------------------------------------------------------
// Factor functions
// ---------------------------------------------------------------------------

const ROUND_CASH_BONUS: Decimal = dec!(0.2);

/// Graduated amount steps relative to the notice threshold.
fn score_amount(
    features: &TransactionFeatures,
    thresholds: &ResolvedThresholds,
    params: &HeuristicParams,
) -> Score {
    let amount = features.amount;
    let ratio = thresholds.notice.ratio_of(amount);

    let base = if ratio >= Decimal::ONE {
        dec!(1.0)
    } else if ratio >= dec!(0.7) {
        dec!(0.8)
    } else if ratio >= dec!(0.4) {
        dec!(0.5)
    } else if ratio >= dec!(0.2) {
        dec!(0.3)
    } else if amount > Decimal::ZERO {
        dec!(0.1)
    } else {
        Decimal::ZERO
    };

    if features.is_cash && features.is_round_amount && amount > params.round_cash_amount {
        (base + ROUND_CASH_BONUS).min(Decimal::ONE)
    } else {
        base
    }
}

fn score_operation_type(features: &TransactionFeatures) -> Score {
    match (features.is_cash, features.is_international) {
        (true, true) => dec!(1.0),
        (true, false) => dec!(0.8),
        (false, true) => dec!(0.7),
        (false, false) => dec!(0.2),
    }
}

/// Off-hours only matters alongside cash or international movement; an
/// isolated nocturnal/weekend flag is mostly payroll and batch noise.
fn score_temporal(features: &TransactionFeatures) -> Score {
    if !features.is_off_hours() {
        return Decimal::ZERO;
    }
    if features.is_cash || features.is_international {
        if features.is_nocturnal && features.is_weekend {
            dec!(1.0)
        } else {
            dec!(0.6)
        }
    } else {
        dec!(0.1)
    }
}

fn score_historical(features: &TransactionFeatures, params: &HeuristicParams) -> Score {
    let agg = &features.six_month;

    let mut score = match features.monthly_frequency {
        0..=1 => Decimal::ZERO,
        2..=5 => dec!(0.3),
        6..=10 => dec!(0.6),
        _ => dec!(0.9),
    };

    let deviation = if agg.ratio_vs_average > dec!(5) {
        dec!(1.0)
    } else if agg.ratio_vs_average > dec!(3) {
        dec!(0.8)
    } else if agg.ratio_vs_average > dec!(2) {
        dec!(0.5)
    } else {
        Decimal::ZERO
    };
    score = score.max(deviation);

    if agg.count == 1 && features.amount > params.large_amount {
        score = score.max(dec!(0.7));
    }

    if let Some(cv) = agg.coefficient_of_variation() {
        if cv > params.high_variability_cv {
            score = score.max(dec!(0.5));
        }
    }

    score.min(Decimal::ONE)
}

fn score_context(
    features: &TransactionFeatures,
    thresholds: &ResolvedThresholds,
    params: &HeuristicParams,
) -> Score {
    let mut score = Decimal::ZERO;

    if features.sector_risk {
        score = if features.amount > params.large_amount {
            dec!(1.0)
        } else {
            dec!(0.7)
        };
    }

    if let Threshold::Limit(threshold) = thresholds.notice {
        let accumulated = features.six_month.sum;
        if accumulated >= threshold {
            score = score.max(dec!(1.0));
        } else if accumulated >= threshold * params.accumulation_near_ratio {
            score = score.max(dec!(0.8));
        }
    }

    if features.is_burst {
        score = score.max(dec!(0.7));
    }

    score.min(Decimal::ONE)
}

/// Clamp into [0, 1]; an out-of-range value here is a programming error.
fn enforce_unit(value: Score, context: &str) -> Score {
    if value < Decimal::ZERO || value > Decimal::ONE {
        let violation = AmlRiskError::InvariantViolation(format!(
            "{} produced score {} outside [0, 1]",
            context, value
        ));
        error!(%violation, "clamping score");
        debug_assert!(false, "{}", violation);
    }
    clamp_unit(value)
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Compute the weighted risk score for a row given the triggers raised so far.
pub fn score_transaction(
    features: &TransactionFeatures,
    thresholds: &ResolvedThresholds,
    triggers: &TriggerList,
    config: &EngineConfig,
) -> RiskScore {
    let w = &config.weights;
    let params = &config.heuristics;

    let factors: Vec<FactorScore> = [
        (RiskFactor::Amount, score_amount(features, thresholds, params), w.amount),
        (RiskFactor::OperationType, score_operation_type(features), w.operation_type),
        (RiskFactor::Temporal, score_temporal(features), w.temporal),
        (RiskFactor::Historical, score_historical(features, params), w.historical),
        (RiskFactor::Context, score_context(features, thresholds, params), w.context),
    ]
    .into_iter()
    .map(|(factor, raw, weight)| {
        let raw = clamp_unit(raw);
        FactorScore {
            factor,
            raw,
            weight,
            contribution: raw * weight,
        }
    })
    .collect();

    let base = enforce_unit(
        factors.iter().map(|f| f.contribution).sum(),
        "weighted factor sum",
    );

    let (adjusted, adjustment) = if triggers.has_guardrail() {
        let floor = params.guardrail_score_floor;
        (base.max(floor), ScoreAdjustment::GuardrailFloor { floor })
    } else {
        let unusual = triggers.unusual_count();
        let bonus = match unusual {
            0 | 1 => Decimal::ZERO,
            2 => params.dual_trigger_bonus,
            _ => params.multi_trigger_bonus,
        };
        if bonus > Decimal::ZERO {
            (
                base + bonus,
                ScoreAdjustment::TriggerBonus {
                    unusual_triggers: unusual,
                    bonus,
                },
            )
        } else {
            (base, ScoreAdjustment::None)
        }
    };

    RiskScore {
        base,
        adjustment,
        value: clamp_unit(adjusted),
        factors,
    }
}
