use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::HeuristicParams;
use crate::regulatory::profile::{ResolvedThresholds, Threshold};
use crate::types::Money;

use super::features::TransactionFeatures;

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Compliance label. The derived ordering is the severity order
/// routine < unusual < reportable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLabel {
    Routine,
    Unusual,
    Reportable,
}

impl RiskLabel {
    pub const ALL: [RiskLabel; 3] = [RiskLabel::Routine, RiskLabel::Unusual, RiskLabel::Reportable];

    pub fn most_severe(self, other: RiskLabel) -> RiskLabel {
        self.max(other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Routine => "routine",
            RiskLabel::Unusual => "unusual",
            RiskLabel::Reportable => "reportable",
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Trigger kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum GuardrailRule {
    /// R1: amount at or above the fraction's notice threshold.
    NoticeThreshold { amount: Money, threshold: Money },
    /// R2: cash operation at or above the fraction's cash limit.
    CashLimit { amount: Money, limit: Money },
    /// R3: below the threshold individually, but six-month accumulation reaches it.
    Accumulation {
        amount: Money,
        accumulated: Money,
        threshold: Money,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum UnusualSignal {
    LargeCashOperation { amount: Money },
    RoundCashAmount { amount: Money },
    LargeInternationalTransfer { amount: Money },
    OffHoursOperation { nocturnal: bool, weekend: bool },
    HighFrequency { monthly_operations: u32 },
    AmountDeviation { ratio: Decimal },
    FirstSignificantOperation { amount: Money },
    HighVariability { coefficient: Decimal },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum ContextSignal {
    HighRiskSector,
    AccumulationNearThreshold { accumulated: Money, threshold: Money },
    BurstPattern,
}

/// Closed set of trigger kinds raised while evaluating one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", content = "detail", rename_all = "snake_case")]
pub enum Trigger {
    Guardrail(GuardrailRule),
    Unusual(UnusualSignal),
    Contextual(ContextSignal),
}

fn money(amount: Money) -> String {
    amount.round_dp(2).normalize().to_string()
}

impl Trigger {
    pub fn is_guardrail(&self) -> bool {
        matches!(self, Trigger::Guardrail(_))
    }

    pub fn is_unusual(&self) -> bool {
        matches!(self, Trigger::Unusual(_))
    }

    /// Stable machine code for audit trails.
    pub fn code(&self) -> &'static str {
        match self {
            Trigger::Guardrail(rule) => match rule {
                GuardrailRule::NoticeThreshold { .. } => "R1_NOTICE_THRESHOLD",
                GuardrailRule::CashLimit { .. } => "R2_CASH_LIMIT",
                GuardrailRule::Accumulation { .. } => "R3_ACCUMULATION",
            },
            Trigger::Unusual(signal) => match signal {
                UnusualSignal::LargeCashOperation { .. } => "LARGE_CASH_OPERATION",
                UnusualSignal::RoundCashAmount { .. } => "ROUND_CASH_AMOUNT",
                UnusualSignal::LargeInternationalTransfer { .. } => "LARGE_INTERNATIONAL_TRANSFER",
                UnusualSignal::OffHoursOperation { .. } => "OFF_HOURS_OPERATION",
                UnusualSignal::HighFrequency { .. } => "HIGH_FREQUENCY",
                UnusualSignal::AmountDeviation { .. } => "AMOUNT_DEVIATION",
                UnusualSignal::FirstSignificantOperation { .. } => "FIRST_SIGNIFICANT_OPERATION",
                UnusualSignal::HighVariability { .. } => "HIGH_VARIABILITY",
            },
            Trigger::Contextual(signal) => match signal {
                ContextSignal::HighRiskSector => "HIGH_RISK_SECTOR",
                ContextSignal::AccumulationNearThreshold { .. } => "ACCUMULATION_NEAR_THRESHOLD",
                ContextSignal::BurstPattern => "BURST_PATTERN",
            },
        }
    }

    /// Human-readable sentence for explanations.
    pub fn describe(&self) -> String {
        match self {
            Trigger::Guardrail(rule) => match rule {
                GuardrailRule::NoticeThreshold { amount, threshold } => format!(
                    "Amount {} reaches the regulatory notice threshold of {}",
                    money(*amount),
                    money(*threshold)
                ),
                GuardrailRule::CashLimit { amount, limit } => format!(
                    "Cash operation of {} reaches the legal cash limit of {}",
                    money(*amount),
                    money(*limit)
                ),
                GuardrailRule::Accumulation {
                    amount,
                    accumulated,
                    threshold,
                } => format!(
                    "Operation of {} is below the notice threshold, but six-month accumulation of {} reaches {}",
                    money(*amount),
                    money(*accumulated),
                    money(*threshold)
                ),
            },
            Trigger::Unusual(signal) => match signal {
                UnusualSignal::LargeCashOperation { amount } => {
                    format!("Large cash operation of {}", money(*amount))
                }
                UnusualSignal::RoundCashAmount { amount } => {
                    format!("Round cash amount of {}", money(*amount))
                }
                UnusualSignal::LargeInternationalTransfer { amount } => {
                    format!("Large international transfer of {}", money(*amount))
                }
                UnusualSignal::OffHoursOperation { nocturnal, weekend } => {
                    let when = match (nocturnal, weekend) {
                        (true, true) => "at night on a weekend",
                        (true, false) => "at night",
                        _ => "on a weekend",
                    };
                    format!("Cash or international operation executed {}", when)
                }
                UnusualSignal::HighFrequency { monthly_operations } => format!(
                    "High operating frequency: {} operations this month",
                    monthly_operations
                ),
                UnusualSignal::AmountDeviation { ratio } => format!(
                    "Amount is {}x the customer's six-month average",
                    ratio.round_dp(1).normalize()
                ),
                UnusualSignal::FirstSignificantOperation { amount } => format!(
                    "First operation in six months is a significant amount of {}",
                    money(*amount)
                ),
                UnusualSignal::HighVariability { coefficient } => format!(
                    "Highly variable six-month amounts (coefficient of variation {})",
                    coefficient.round_dp(2).normalize()
                ),
            },
            Trigger::Contextual(signal) => match signal {
                ContextSignal::HighRiskSector => {
                    "Customer operates in a high-risk sector".to_string()
                }
                ContextSignal::AccumulationNearThreshold {
                    accumulated,
                    threshold,
                } => format!(
                    "Six-month accumulation of {} is close to the notice threshold of {}",
                    money(*accumulated),
                    money(*threshold)
                ),
                ContextSignal::BurstPattern => {
                    "Burst of operations in a short time window".to_string()
                }
            },
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// Append-only trigger list
// ---------------------------------------------------------------------------

/// Ordered triggers of one evaluation. Only ever appended to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerList(Vec<Trigger>);

impl TriggerList {
    pub fn new() -> Self {
        TriggerList(Vec::new())
    }

    pub fn push(&mut self, trigger: Trigger) {
        self.0.push(trigger);
    }

    pub fn extend(&mut self, triggers: impl IntoIterator<Item = Trigger>) {
        self.0.extend(triggers);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trigger> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_guardrail(&self) -> bool {
        self.0.iter().any(Trigger::is_guardrail)
    }

    pub fn unusual_count(&self) -> usize {
        self.0.iter().filter(|t| t.is_unusual()).count()
    }

    /// Unusual and contextual triggers, i.e. everything except guardrails.
    pub fn heuristic_count(&self) -> usize {
        self.0.iter().filter(|t| !t.is_guardrail()).count()
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.0.iter().map(Trigger::code).collect()
    }
}

// ---------------------------------------------------------------------------
// Heuristic detection
// ---------------------------------------------------------------------------

/// Raise the non-guardrail signals for a row, in a fixed order.
pub fn detect_heuristic_triggers(
    features: &TransactionFeatures,
    thresholds: &ResolvedThresholds,
    params: &HeuristicParams,
) -> Vec<Trigger> {
    let mut triggers = Vec::new();
    let amount = features.amount;
    let agg = &features.six_month;

    if features.is_cash && amount >= params.large_amount {
        triggers.push(Trigger::Unusual(UnusualSignal::LargeCashOperation { amount }));
    }
    if features.is_cash && features.is_round_amount && amount > params.round_cash_amount {
        triggers.push(Trigger::Unusual(UnusualSignal::RoundCashAmount { amount }));
    }
    if features.is_international && amount >= params.large_amount {
        triggers.push(Trigger::Unusual(UnusualSignal::LargeInternationalTransfer { amount }));
    }
    if features.is_off_hours() && (features.is_cash || features.is_international) {
        triggers.push(Trigger::Unusual(UnusualSignal::OffHoursOperation {
            nocturnal: features.is_nocturnal,
            weekend: features.is_weekend,
        }));
    }
    if features.monthly_frequency > params.high_monthly_frequency {
        triggers.push(Trigger::Unusual(UnusualSignal::HighFrequency {
            monthly_operations: features.monthly_frequency,
        }));
    }
    if agg.ratio_vs_average > params.deviation_ratio {
        triggers.push(Trigger::Unusual(UnusualSignal::AmountDeviation {
            ratio: agg.ratio_vs_average,
        }));
    }
    if agg.count == 1 && amount > params.large_amount {
        triggers.push(Trigger::Unusual(UnusualSignal::FirstSignificantOperation { amount }));
    }
    if let Some(cv) = agg.coefficient_of_variation() {
        if cv > params.high_variability_cv {
            triggers.push(Trigger::Unusual(UnusualSignal::HighVariability { coefficient: cv }));
        }
    }

    if features.sector_risk {
        triggers.push(Trigger::Contextual(ContextSignal::HighRiskSector));
    }
    if let Threshold::Limit(threshold) = thresholds.notice {
        let near = threshold * params.accumulation_near_ratio;
        if agg.sum >= near && agg.sum < threshold {
            triggers.push(Trigger::Contextual(ContextSignal::AccumulationNearThreshold {
                accumulated: agg.sum,
                threshold,
            }));
        }
    }
    if features.is_burst {
        triggers.push(Trigger::Contextual(ContextSignal::BurstPattern));
    }

    triggers
}
