//! Multinomial logistic (softmax) classifier over a named feature schema.
//!
//! Weights are produced offline and shipped as JSON; this type only scores.

use serde::{Deserialize, Serialize};

use crate::{AmlRiskError, AmlRiskResult};

use super::classifier::{FeatureSchema, RiskClassifier};

fn default_name() -> String {
    "softmax".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxClassifier {
    #[serde(default = "default_name")]
    pub name: String,
    pub schema: FeatureSchema,
    /// Coefficient rows in routine, unusual, reportable order.
    pub coefficients: [Vec<f64>; 3],
    pub intercepts: [f64; 3],
    /// Optional standardisation applied before the linear step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub means: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scales: Option<Vec<f64>>,
}

fn invalid(field: &str, reason: impl Into<String>) -> AmlRiskError {
    AmlRiskError::InvalidInput {
        field: field.to_string(),
        reason: reason.into(),
    }
}

impl SoftmaxClassifier {
    pub fn from_json(json: &str) -> AmlRiskResult<Self> {
        let model: SoftmaxClassifier = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> AmlRiskResult<()> {
        let n = self.schema.len();
        if n == 0 {
            return Err(invalid("schema", "must name at least one column"));
        }
        for (i, row) in self.coefficients.iter().enumerate() {
            if row.len() != n {
                return Err(invalid(
                    "coefficients",
                    format!("class {} has {} coefficients, schema has {}", i, row.len(), n),
                ));
            }
            if row.iter().any(|c| !c.is_finite()) {
                return Err(invalid("coefficients", format!("class {} has non-finite values", i)));
            }
        }
        if self.intercepts.iter().any(|c| !c.is_finite()) {
            return Err(invalid("intercepts", "must be finite"));
        }
        if let Some(means) = &self.means {
            if means.len() != n {
                return Err(invalid("means", "length must match schema"));
            }
        }
        if let Some(scales) = &self.scales {
            if scales.len() != n {
                return Err(invalid("scales", "length must match schema"));
            }
            if scales.iter().any(|s| *s == 0.0 || !s.is_finite()) {
                return Err(invalid("scales", "must be finite and non-zero"));
            }
        }
        Ok(())
    }

    fn standardize(&self, i: usize, x: f64) -> f64 {
        let centred = match &self.means {
            Some(m) => x - m[i],
            None => x,
        };
        match &self.scales {
            Some(s) => centred / s[i],
            None => centred,
        }
    }

    fn predict_row(&self, row: &[f64]) -> [f64; 3] {
        let mut logits = self.intercepts;
        for (k, coefs) in self.coefficients.iter().enumerate() {
            logits[k] += coefs
                .iter()
                .zip(row)
                .enumerate()
                .map(|(i, (c, x))| c * self.standardize(i, *x))
                .sum::<f64>();
        }
        softmax(logits)
    }
}

fn softmax(logits: [f64; 3]) -> [f64; 3] {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp = logits.map(|l| (l - max).exp());
    let total: f64 = exp.iter().sum();
    exp.map(|e| e / total)
}

impl RiskClassifier for SoftmaxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn predict_proba(&self, rows: &[Vec<f64>]) -> AmlRiskResult<Vec<[f64; 3]>> {
        let n = self.schema.len();
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                if row.len() != n {
                    return Err(AmlRiskError::ClassifierUnavailable(format!(
                        "row {} has {} features, model expects {}",
                        i,
                        row.len(),
                        n
                    )));
                }
                Ok(self.predict_row(row))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> SoftmaxClassifier {
        SoftmaxClassifier {
            name: "test".into(),
            schema: FeatureSchema::new(vec!["is_cash".into(), "amount".into()]),
            coefficients: [vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 0.00001]],
            intercepts: [0.0, 0.0, 0.0],
            means: None,
            scales: None,
        }
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax([1.0, 2.0, 3.0]);
        let total: f64 = p.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn test_softmax_stable_for_large_logits() {
        let p = softmax([1000.0, 1000.0, 0.0]);
        assert!((p[0] - 0.5).abs() < 1e-12);
        assert!(p.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_zero_features_uniform() {
        let out = model().predict_proba(&[vec![0.0, 0.0]]).unwrap();
        for p in out[0] {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_large_amount_pushes_reportable() {
        let out = model().predict_proba(&[vec![0.0, 1_000_000.0]]).unwrap();
        assert!(out[0][2] > 0.99);
    }

    #[test]
    fn test_wrong_width_is_unavailable() {
        let err = model().predict_proba(&[vec![1.0]]).unwrap_err();
        assert!(matches!(err, AmlRiskError::ClassifierUnavailable(_)));
    }

    #[test]
    fn test_validate_rejects_mismatched_coefficients() {
        let mut m = model();
        m.coefficients[1] = vec![1.0];
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_standardization() {
        let mut m = model();
        m.means = Some(vec![1.0, 0.0]);
        m.scales = Some(vec![2.0, 1.0]);
        assert_eq!(m.standardize(0, 3.0), 1.0);
        assert!(m.validate().is_ok());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "schema": { "columns": ["is_cash"] },
            "coefficients": [[0.0], [0.5], [1.0]],
            "intercepts": [0.0, 0.0, 0.0]
        }"#;
        let m = SoftmaxClassifier::from_json(json).unwrap();
        assert_eq!(m.name(), "softmax");
    }
}
