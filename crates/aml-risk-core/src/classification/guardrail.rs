//! Guardrail rule evaluation: deterministic regulatory threshold checks.
//!
//! Rules are OR-combined. Any hit mandates a reportable classification that
//! no other subsystem may downgrade.

use serde::{Deserialize, Serialize};

use crate::regulatory::profile::{ResolvedThresholds, Threshold};

use super::features::TransactionFeatures;
use super::triggers::{GuardrailRule, Trigger};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailOutcome {
    pub triggered: bool,
    /// Rule hits in R1, R2, R3 order.
    pub triggers: Vec<Trigger>,
}

/// Evaluate R1-R3 against the thresholds resolved for the row's fraction.
///
/// A fraction that resolved to "no limit" can never trigger.
pub fn evaluate_guardrails(
    features: &TransactionFeatures,
    thresholds: &ResolvedThresholds,
) -> GuardrailOutcome {
    let amount = features.amount;
    let mut triggers = Vec::new();

    if let Threshold::Limit(threshold) = thresholds.notice {
        if amount >= threshold {
            triggers.push(Trigger::Guardrail(GuardrailRule::NoticeThreshold {
                amount,
                threshold,
            }));
        }
    }

    if features.is_cash {
        if let Threshold::Limit(limit) = thresholds.cash_limit {
            if amount >= limit {
                triggers.push(Trigger::Guardrail(GuardrailRule::CashLimit { amount, limit }));
            }
        }
    }

    if let Threshold::Limit(threshold) = thresholds.notice {
        let accumulated = features.six_month.sum;
        if amount < threshold && accumulated >= threshold {
            triggers.push(Trigger::Guardrail(GuardrailRule::Accumulation {
                amount,
                accumulated,
                threshold,
            }));
        }
    }

    GuardrailOutcome {
        triggered: !triggers.is_empty(),
        triggers,
    }
}
