use serde::{Deserialize, Serialize};

use crate::config::{FusionParams, HeuristicParams};
use crate::types::Money;

use super::classifier::ClassifierOutput;
use super::triggers::{RiskLabel, TriggerList};

/// Which priority rule produced the final label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionPath {
    /// A guardrail fired; reportable by law.
    Guardrail,
    /// No classifier output was available or consulted.
    RuleOnly,
    /// Classifier confidence cleared the override bar.
    ClassifierConfident,
    /// Rule and classifier agreed.
    Agreement,
    /// Rule and classifier disagreed; the more severe label won.
    ConservativeTieBreak,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionDecision {
    pub label: RiskLabel,
    pub path: FusionPath,
    pub rule_label: RiskLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier_label: Option<RiskLabel>,
    /// True when rule and classifier labels differ.
    pub discrepancy: bool,
}

/// Deterministic label from guardrails plus aggregated heuristic trigger counts.
pub fn rule_based_label(
    triggers: &TriggerList,
    amount: Money,
    params: &HeuristicParams,
) -> RiskLabel {
    if triggers.has_guardrail() {
        return RiskLabel::Reportable;
    }
    match triggers.heuristic_count() {
        0 => RiskLabel::Routine,
        1 if amount >= params.large_amount => RiskLabel::Unusual,
        1 => RiskLabel::Routine,
        _ => RiskLabel::Unusual,
    }
}

/// Combine guardrail, rule and classifier outputs, highest priority first:
/// guardrail, confident classifier, then the more severe of the two labels.
pub fn fuse(
    guardrail_triggered: bool,
    rule_label: RiskLabel,
    classifier: Option<&ClassifierOutput>,
    params: &FusionParams,
) -> FusionDecision {
    let classifier_label = classifier.map(|c| c.label);
    let discrepancy = classifier_label.is_some_and(|l| l != rule_label);

    let (label, path) = if guardrail_triggered {
        (RiskLabel::Reportable, FusionPath::Guardrail)
    } else {
        match classifier {
            None => (rule_label, FusionPath::RuleOnly),
            Some(c) if c.confidence > params.classifier_override_confidence => {
                (c.label, FusionPath::ClassifierConfident)
            }
            Some(c) if c.label == rule_label => (rule_label, FusionPath::Agreement),
            Some(c) => (
                rule_label.most_severe(c.label),
                FusionPath::ConservativeTieBreak,
            ),
        }
    };

    FusionDecision {
        label,
        path,
        rule_label,
        classifier_label,
        discrepancy,
    }
}
