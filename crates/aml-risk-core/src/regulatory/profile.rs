use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::types::Money;
use crate::{AmlRiskError, AmlRiskResult};

// ---------------------------------------------------------------------------
// Configuration document
// ---------------------------------------------------------------------------

/// Thresholds for a single activity fraction, in reference units.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FractionThresholdsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice_threshold_units: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_limit_units: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Regulatory configuration document as loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulatoryConfig {
    /// Currency value of one reference unit.
    pub reference_unit_rate: Decimal,
    #[serde(default = "default_reference_unit")]
    pub reference_unit: String,
    #[serde(default)]
    pub fractions: BTreeMap<String, FractionThresholdsConfig>,
}

fn default_reference_unit() -> String {
    "UMA".to_string()
}

// ---------------------------------------------------------------------------
// Resolved thresholds
// ---------------------------------------------------------------------------

/// A monetary threshold in currency, or the "no limit" sentinel that never triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum Threshold {
    Limit(Money),
    NoLimit,
}

impl Threshold {
    /// Boundary inclusive: an amount equal to the limit reaches it.
    pub fn is_reached_by(&self, amount: Money) -> bool {
        match self {
            Threshold::Limit(t) => amount >= *t,
            Threshold::NoLimit => false,
        }
    }

    /// Amount as a fraction of the limit. Zero when there is no limit.
    pub fn ratio_of(&self, amount: Money) -> Decimal {
        match self {
            Threshold::Limit(t) if *t > Decimal::ZERO => {
                amount.checked_div(*t).unwrap_or(Decimal::MAX)
            }
            _ => Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedThresholds {
    pub fraction: String,
    pub notice: Threshold,
    pub cash_limit: Threshold,
    /// False when the fraction is absent from the configuration.
    pub mapped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResolvedThresholds {
    pub fn unlimited(fraction: &str) -> Self {
        ResolvedThresholds {
            fraction: fraction.to_string(),
            notice: Threshold::NoLimit,
            cash_limit: Threshold::NoLimit,
            mapped: false,
            description: None,
        }
    }
}

/// A configuration entry that degraded to "no limit".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigIssue {
    pub fraction: String,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Immutable regulatory profile: every fraction pre-resolved to currency thresholds.
#[derive(Debug, Clone, Serialize)]
pub struct RegulatoryProfile {
    pub reference_unit: String,
    pub reference_unit_rate: Decimal,
    fractions: BTreeMap<String, ResolvedThresholds>,
    issues: Vec<ConfigIssue>,
}

pub fn normalize_fraction(code: &str) -> String {
    code.trim().to_uppercase()
}

fn resolve_units(
    fraction: &str,
    field: &str,
    units: Option<Decimal>,
    rate: Decimal,
    issues: &mut Vec<ConfigIssue>,
) -> Threshold {
    let reason = match units {
        None => format!("{} missing", field),
        Some(u) if u <= Decimal::ZERO => format!("{} must be positive, got {}", field, u),
        Some(_) if rate <= Decimal::ZERO => "reference unit rate is not positive".to_string(),
        Some(u) => match u.checked_mul(rate) {
            Some(limit) => return Threshold::Limit(limit),
            None => format!("{} overflows when converted to currency", field),
        },
    };
    let issue = AmlRiskError::Configuration {
        fraction: fraction.to_string(),
        reason: reason.clone(),
    };
    info!(%issue, "threshold degraded to no limit");
    issues.push(ConfigIssue {
        fraction: fraction.to_string(),
        reason,
    });
    Threshold::NoLimit
}

impl RegulatoryProfile {
    /// Resolve a configuration document. Never fails: invalid entries degrade
    /// to [`Threshold::NoLimit`] and are listed in [`RegulatoryProfile::issues`].
    pub fn from_config(config: &RegulatoryConfig) -> Self {
        let rate = config.reference_unit_rate;
        let mut issues = Vec::new();
        let mut fractions = BTreeMap::new();

        for (code, entry) in &config.fractions {
            let key = normalize_fraction(code);
            let notice = resolve_units(
                &key,
                "notice_threshold_units",
                entry.notice_threshold_units,
                rate,
                &mut issues,
            );
            let cash_limit = resolve_units(
                &key,
                "cash_limit_units",
                entry.cash_limit_units,
                rate,
                &mut issues,
            );
            fractions.insert(
                key.clone(),
                ResolvedThresholds {
                    fraction: key,
                    notice,
                    cash_limit,
                    mapped: true,
                    description: entry.description.clone(),
                },
            );
        }

        info!(
            fractions = fractions.len(),
            degraded = issues.len(),
            reference_unit = %config.reference_unit,
            rate = %rate,
            "regulatory profile loaded"
        );

        RegulatoryProfile {
            reference_unit: config.reference_unit.clone(),
            reference_unit_rate: rate,
            fractions,
            issues,
        }
    }

    pub fn from_json(json: &str) -> AmlRiskResult<Self> {
        let config: RegulatoryConfig = serde_json::from_str(json)?;
        Ok(Self::from_config(&config))
    }

    /// Thresholds for a fraction code. Unknown codes resolve to "no limit".
    pub fn resolve(&self, fraction: &str) -> ResolvedThresholds {
        let key = normalize_fraction(fraction);
        match self.fractions.get(&key) {
            Some(t) => t.clone(),
            None => ResolvedThresholds::unlimited(&key),
        }
    }

    pub fn fractions(&self) -> impl Iterator<Item = &ResolvedThresholds> {
        self.fractions.values()
    }

    pub fn issues(&self) -> &[ConfigIssue] {
        &self.issues
    }
}
