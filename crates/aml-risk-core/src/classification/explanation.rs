//! Audit-ready justification for a classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::regulatory::legal_basis::LegalBasisCatalog;
use crate::regulatory::profile::{ResolvedThresholds, Threshold};
use crate::types::{Money, Score};

use super::classifier::{ClassProbabilities, ClassifierOutput};
use super::features::TransactionFeatures;
use super::fusion::{FusionDecision, FusionPath};
use super::scoring::{FactorScore, RiskScore, ScoreAdjustment};
use super::strategy::StrategyMode;
use super::triggers::{RiskLabel, Trigger, TriggerList};

const FALLBACK_REASONS: [&str; 3] = [
    "No regulatory threshold was reached by this operation",
    "No further unusual patterns were detected in the customer's history",
    "Classification reflects the consolidated weighted risk score",
];

/// Factor lines leave room for at least one trigger sentence.
const MAX_FACTOR_REASONS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalAppendix {
    pub raw_score: Score,
    pub base_score: Score,
    pub adjustment: ScoreAdjustment,
    pub factors: Vec<FactorScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<ClassProbabilities>,
    pub triggers: TriggerList,
    pub strategy: StrategyMode,
    pub fusion_path: FusionPath,
    pub config_version: String,
    pub evaluated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// Ranked, most important first.
    pub reasons: [String; 3],
    pub legal_basis: String,
    /// True when a guardrail forced the classification.
    pub forced_by_law: bool,
    pub override_disclaimer: String,
    pub appendix: TechnicalAppendix,
}

pub struct ExplanationInput<'a> {
    pub features: &'a TransactionFeatures,
    pub thresholds: &'a ResolvedThresholds,
    pub label: RiskLabel,
    pub triggers: &'a TriggerList,
    pub score: &'a RiskScore,
    pub classifier: Option<&'a ClassifierOutput>,
    pub fusion: &'a FusionDecision,
    pub strategy: StrategyMode,
    pub config_version: &'a str,
}

fn money(amount: Money) -> String {
    amount.round_dp(2).normalize().to_string()
}

fn factor_reason(f: &FactorScore) -> String {
    format!(
        "Elevated {}: factor {} weighted {} contributes {} to the risk score",
        f.factor.label(),
        f.raw.normalize(),
        f.weight.normalize(),
        f.contribution.round_dp(4).normalize()
    )
}

fn rank_reasons(input: &ExplanationInput<'_>) -> [String; 3] {
    let mut reasons: Vec<String> = Vec::new();

    reasons.extend(
        input
            .triggers
            .iter()
            .filter(|t| t.is_guardrail())
            .map(Trigger::describe),
    );
    reasons.extend(
        input
            .score
            .ranked_factors()
            .into_iter()
            .take(MAX_FACTOR_REASONS)
            .map(factor_reason),
    );
    reasons.extend(
        input
            .triggers
            .iter()
            .filter(|t| !t.is_guardrail())
            .map(Trigger::describe),
    );
    if let Some(c) = input.classifier {
        reasons.push(format!(
            "Statistical model assigned '{}' with confidence {}",
            c.label,
            c.confidence.round_dp(2).normalize()
        ));
    }

    let mut fallbacks = FALLBACK_REASONS.iter().map(|s| s.to_string());
    let mut take = || {
        if reasons.is_empty() {
            fallbacks.next().unwrap_or_default()
        } else {
            reasons.remove(0)
        }
    };
    [take(), take(), take()]
}

fn legal_narrative(input: &ExplanationInput<'_>, catalog: &LegalBasisCatalog) -> String {
    let guardrail = input.triggers.has_guardrail();
    let threshold_clause = match input.thresholds.notice {
        Threshold::Limit(t) if guardrail => format!(
            "Reaching the notice threshold of {} obliges the reporting entity to file a notice with the authority.",
            money(t)
        ),
        Threshold::Limit(t) => format!(
            "Operations are monitored against the notice threshold of {}.",
            money(t)
        ),
        Threshold::NoLimit => "No notice threshold is configured for this activity.".to_string(),
    };

    match catalog.resolve(input.features.sector.as_deref(), &input.features.fraction) {
        Some(basis) => format!(
            "Activity '{}' is a vulnerable activity under {}. {}",
            basis.activity, basis.citation, threshold_clause
        ),
        None => format!(
            "Activity fraction '{}' has no mapped legal basis; it is treated as general activity, exempt from threshold notices and assessed on risk indicators only. {}",
            input.thresholds.fraction, threshold_clause
        ),
    }
}

fn disclaimer(input: &ExplanationInput<'_>) -> String {
    if input.fusion.path == FusionPath::Guardrail {
        return "Forced by law: a regulatory threshold was reached. The classification is mandatory and was not inferred by the model or the risk score.".to_string();
    }
    let source = if input.classifier.is_some() {
        "the weighted risk score and the statistical model"
    } else {
        "the weighted risk score and deterministic rules"
    };
    format!(
        "Inferred by {}: this '{}' classification is a risk assessment subject to analyst review, not a legal determination.",
        source, input.label
    )
}

pub fn build_explanation(
    input: &ExplanationInput<'_>,
    catalog: &LegalBasisCatalog,
    evaluated_at: DateTime<Utc>,
) -> Explanation {
    Explanation {
        reasons: rank_reasons(input),
        legal_basis: legal_narrative(input, catalog),
        forced_by_law: input.fusion.path == FusionPath::Guardrail,
        override_disclaimer: disclaimer(input),
        appendix: TechnicalAppendix {
            raw_score: input.score.value,
            base_score: input.score.base,
            adjustment: input.score.adjustment.clone(),
            factors: input.score.factors.clone(),
            probabilities: input.classifier.map(|c| c.probabilities.clone()),
            triggers: input.triggers.clone(),
            strategy: input.strategy,
            fusion_path: input.fusion.path,
            config_version: input.config_version.to_string(),
            evaluated_at,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::features::test_support::routine_row;
    use crate::classification::fusion::fuse;
    use crate::classification::scoring::score_transaction;
    use crate::classification::triggers::{GuardrailRule, UnusualSignal};
    use crate::config::{EngineConfig, FusionParams};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn limits() -> ResolvedThresholds {
        ResolvedThresholds {
            fraction: "V".into(),
            notice: Threshold::Limit(dec!(300_000)),
            cash_limit: Threshold::Limit(dec!(300_000)),
            mapped: true,
            description: None,
        }
    }

    fn explain(
        row: &TransactionFeatures,
        t: &ResolvedThresholds,
        triggers: &TriggerList,
        label: RiskLabel,
    ) -> Explanation {
        let score = score_transaction(row, t, triggers, &EngineConfig::default());
        let fusion = fuse(triggers.has_guardrail(), label, None, &FusionParams::default());
        let input = ExplanationInput {
            features: row,
            thresholds: t,
            label: fusion.label,
            triggers,
            score: &score,
            classifier: None,
            fusion: &fusion,
            strategy: StrategyMode::RuleBased,
            config_version: "v1",
        };
        build_explanation(
            &input,
            &LegalBasisCatalog::default(),
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_guardrail_reason_ranked_first() {
        let mut row = routine_row("t1");
        row.amount = dec!(500_000);
        row.sector = Some("real_estate".into());
        let mut triggers = TriggerList::new();
        triggers.push(Trigger::Guardrail(GuardrailRule::NoticeThreshold {
            amount: dec!(500_000),
            threshold: dec!(300_000),
        }));
        let e = explain(&row, &limits(), &triggers, RiskLabel::Reportable);
        assert!(e.reasons[0].contains("notice threshold of 300000"));
        assert!(e.forced_by_law);
        assert!(e.override_disclaimer.starts_with("Forced by law"));
        assert!(e.legal_basis.contains("Art. 17, fraction V"));
        assert!(e.legal_basis.contains("obliges"));
    }

    #[test]
    fn test_factor_reasons_follow() {
        let mut row = routine_row("t1");
        row.is_cash = true;
        row.monthly_frequency = 12;
        let e = explain(&row, &limits(), &TriggerList::new(), RiskLabel::Routine);
        assert!(e.reasons[0].contains("historical behaviour"));
        assert!(e.reasons[1].contains("operation type"));
        assert!(!e.forced_by_law);
        assert!(e.override_disclaimer.starts_with("Inferred by"));
    }

    #[test]
    fn test_remaining_triggers_after_factors() {
        let mut row = routine_row("t1");
        row.amount = dec!(0);
        row.six_month.ratio_vs_average = dec!(0);
        let mut triggers = TriggerList::new();
        triggers.push(Trigger::Unusual(UnusualSignal::HighFrequency {
            monthly_operations: 15,
        }));
        let e = explain(&row, &limits(), &triggers, RiskLabel::Routine);
        // only operation type contributes for a zero-amount, non-cash row
        assert!(e.reasons[0].contains("operation type"));
        assert_eq!(e.reasons[1], "High operating frequency: 15 operations this month");
        assert_eq!(e.reasons[2], FALLBACK_REASONS[0]);
    }

    #[test]
    fn test_trigger_sentence_reaches_reasons_when_factors_abound() {
        let mut row = routine_row("t1");
        row.amount = dec!(250_000);
        row.is_cash = true;
        row.is_international = true;
        row.is_nocturnal = true;
        row.monthly_frequency = 15;
        let mut triggers = TriggerList::new();
        triggers.push(Trigger::Unusual(UnusualSignal::HighFrequency {
            monthly_operations: 15,
        }));
        triggers.push(Trigger::Unusual(UnusualSignal::OffHoursOperation {
            nocturnal: true,
            weekend: false,
        }));
        triggers.push(Trigger::Unusual(UnusualSignal::LargeCashOperation {
            amount: dec!(250_000),
        }));
        let e = explain(&row, &limits(), &triggers, RiskLabel::Unusual);
        assert!(e.reasons[0].starts_with("Elevated"));
        assert!(e.reasons[1].starts_with("Elevated"));
        assert_eq!(e.reasons[2], "High operating frequency: 15 operations this month");
    }

    #[test]
    fn test_always_three_reasons() {
        let row = routine_row("t1");
        let e = explain(&row, &limits(), &TriggerList::new(), RiskLabel::Routine);
        assert_eq!(e.reasons.len(), 3);
        assert!(e.reasons.iter().all(|r| !r.is_empty()));
    }

    #[test]
    fn test_unmapped_fraction_narrative() {
        let mut row = routine_row("t1");
        row.fraction = "GENERAL".into();
        let e = explain(
            &row,
            &ResolvedThresholds::unlimited("GENERAL"),
            &TriggerList::new(),
            RiskLabel::Routine,
        );
        assert!(e.legal_basis.contains("no mapped legal basis"));
        assert!(e.legal_basis.contains("No notice threshold"));
    }

    #[test]
    fn test_appendix_carries_audit_fields() {
        let row = routine_row("t1");
        let e = explain(&row, &limits(), &TriggerList::new(), RiskLabel::Routine);
        assert_eq!(e.appendix.raw_score, dec!(0.075));
        assert_eq!(e.appendix.factors.len(), 5);
        assert_eq!(e.appendix.config_version, "v1");
        assert!(e.appendix.probabilities.is_none());
    }
}
