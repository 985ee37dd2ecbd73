//! Classifier adapter.
//!
//! The statistical model is an external oracle with the contract
//! "feature vector -> probability vector over (routine, unusual, reportable)".
//! This module owns schema alignment, sanitisation, thresholding and the
//! degrade-not-fail behaviour when the oracle is missing or misbehaves.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ClassifierThresholds;
use crate::regulatory::profile::normalize_fraction;
use crate::types::Probability;
use crate::{AmlRiskError, AmlRiskResult};

use super::features::TransactionFeatures;
use super::triggers::RiskLabel;

/// Digits kept when converting oracle probabilities into decimals.
const PROBABILITY_DP: u32 = 6;

/// Raw numeric columns every row exposes, before fraction one-hot columns.
pub const NUMERIC_COLUMNS: [&str; 15] = [
    "amount",
    "is_cash",
    "is_international",
    "is_round_amount",
    "sector_risk",
    "is_nocturnal",
    "is_weekend",
    "is_burst",
    "monthly_frequency",
    "six_month_count",
    "six_month_sum",
    "six_month_max",
    "six_month_std_dev",
    "six_month_ratio_vs_average",
    "six_month_cv",
];

// ---------------------------------------------------------------------------
// Schema alignment
// ---------------------------------------------------------------------------

/// Ordered training-time column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        FeatureSchema { columns }
    }

    /// Numeric columns followed by one `fraction_<CODE>` column per fraction.
    pub fn with_fractions(fractions: &[&str]) -> Self {
        let mut columns: Vec<String> = NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.extend(fractions.iter().map(|f| fraction_column(f)));
        FeatureSchema { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Project named values onto the schema. Unknown names are dropped,
    /// missing columns are zero-filled and NaN/infinite values become zero.
    pub fn align(&self, named: &HashMap<String, f64>) -> Vec<f64> {
        self.columns
            .iter()
            .map(|c| named.get(c).copied().map(sanitize).unwrap_or(0.0))
            .collect()
    }
}

fn fraction_column(fraction: &str) -> String {
    format!("fraction_{}", normalize_fraction(fraction))
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(f64::NAN)
}

/// Named feature values for a row, including the one-hot fraction column.
pub fn named_features(features: &TransactionFeatures) -> HashMap<String, f64> {
    let agg = &features.six_month;
    let values = [
        to_f64(features.amount),
        flag(features.is_cash),
        flag(features.is_international),
        flag(features.is_round_amount),
        flag(features.sector_risk),
        flag(features.is_nocturnal),
        flag(features.is_weekend),
        flag(features.is_burst),
        f64::from(features.monthly_frequency),
        f64::from(agg.count),
        to_f64(agg.sum),
        to_f64(agg.max),
        to_f64(agg.std_dev),
        to_f64(agg.ratio_vs_average),
        agg.coefficient_of_variation().map(to_f64).unwrap_or(f64::NAN),
    ];

    let mut named: HashMap<String, f64> = NUMERIC_COLUMNS
        .iter()
        .zip(values)
        .map(|(c, v)| (c.to_string(), v))
        .collect();
    if !features.fraction.trim().is_empty() {
        named.insert(fraction_column(&features.fraction), 1.0);
    }
    named
}

// ---------------------------------------------------------------------------
// Oracle contract
// ---------------------------------------------------------------------------

/// External probabilistic classifier.
pub trait RiskClassifier: Send + Sync {
    fn name(&self) -> &str;

    fn schema(&self) -> &FeatureSchema;

    /// One probability vector per input row, ordered routine, unusual, reportable.
    fn predict_proba(&self, rows: &[Vec<f64>]) -> AmlRiskResult<Vec<[f64; 3]>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub routine: Probability,
    pub unusual: Probability,
    pub reportable: Probability,
}

impl ClassProbabilities {
    pub fn get(&self, label: RiskLabel) -> Probability {
        match label {
            RiskLabel::Routine => self.routine,
            RiskLabel::Unusual => self.unusual,
            RiskLabel::Reportable => self.reportable,
        }
    }

    /// Most probable class; ties resolve to the more severe label.
    pub fn max_class(&self) -> (RiskLabel, Probability) {
        RiskLabel::ALL
            .iter()
            .map(|&l| (l, self.get(l)))
            .fold((RiskLabel::Routine, self.routine), |best, cur| {
                if cur.1 >= best.1 {
                    cur
                } else {
                    best
                }
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierOutput {
    pub probabilities: ClassProbabilities,
    pub label: RiskLabel,
    /// Max-class probability.
    pub confidence: Probability,
}

/// Threshold the probability vector: reportable, then unusual, else routine.
pub fn label_from_probabilities(
    p: &ClassProbabilities,
    thresholds: &ClassifierThresholds,
) -> RiskLabel {
    if p.reportable >= thresholds.reportable {
        RiskLabel::Reportable
    } else if p.unusual >= thresholds.unusual {
        RiskLabel::Unusual
    } else {
        RiskLabel::Routine
    }
}

fn unavailable(reason: impl Into<String>) -> AmlRiskError {
    AmlRiskError::ClassifierUnavailable(reason.into())
}

/// Validate and normalise one raw probability vector.
fn to_probabilities(raw: [f64; 3], row: usize) -> AmlRiskResult<ClassProbabilities> {
    if raw.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(unavailable(format!(
            "invalid probability vector {:?} for row {}",
            raw, row
        )));
    }
    let total: f64 = raw.iter().sum();
    if total <= 0.0 {
        return Err(unavailable(format!("all-zero probability vector for row {}", row)));
    }
    let convert = |p: f64| -> AmlRiskResult<Probability> {
        Decimal::from_f64(p / total)
            .map(|d| d.round_dp(PROBABILITY_DP))
            .ok_or_else(|| {
                unavailable(format!("unrepresentable probability {} for row {}", p, row))
            })
    };
    Ok(ClassProbabilities {
        routine: convert(raw[0])?,
        unusual: convert(raw[1])?,
        reportable: convert(raw[2])?,
    })
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Wraps an optional oracle. The only component allowed to call one.
#[derive(Clone, Default)]
pub struct ClassifierAdapter {
    classifier: Option<Arc<dyn RiskClassifier>>,
}

impl std::fmt::Debug for ClassifierAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierAdapter")
            .field("classifier", &self.name())
            .finish()
    }
}

impl ClassifierAdapter {
    pub fn new(classifier: Arc<dyn RiskClassifier>) -> Self {
        ClassifierAdapter {
            classifier: Some(classifier),
        }
    }

    /// An adapter with no oracle: every batch runs rule/score-only.
    pub fn disabled() -> Self {
        ClassifierAdapter { classifier: None }
    }

    pub fn is_available(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn name(&self) -> Option<&str> {
        self.classifier.as_deref().map(|c| c.name())
    }

    /// Score all rows with a single vectorised oracle call.
    ///
    /// Any oracle failure, including a wrong number of outputs or a malformed
    /// probability vector, is reported as `ClassifierUnavailable` for the
    /// whole batch.
    pub fn score_batch(
        &self,
        rows: &[&TransactionFeatures],
        thresholds: &ClassifierThresholds,
    ) -> AmlRiskResult<Vec<ClassifierOutput>> {
        let classifier = self
            .classifier
            .as_deref()
            .ok_or_else(|| unavailable("no classifier configured"))?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let schema = classifier.schema();
        let matrix: Vec<Vec<f64>> = rows
            .iter()
            .map(|r| schema.align(&named_features(r)))
            .collect();

        let raw = classifier.predict_proba(&matrix).map_err(|e| match e {
            AmlRiskError::ClassifierUnavailable(reason) => unavailable(reason),
            other => unavailable(other.to_string()),
        })?;
        if raw.len() != rows.len() {
            return Err(unavailable(format!(
                "classifier returned {} outputs for {} rows",
                raw.len(),
                rows.len()
            )));
        }

        raw.into_iter()
            .enumerate()
            .map(|(i, vector)| {
                let probabilities = to_probabilities(vector, i)?;
                let label = label_from_probabilities(&probabilities, thresholds);
                let (_, confidence) = probabilities.max_class();
                Ok(ClassifierOutput {
                    probabilities,
                    label,
                    confidence,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------
