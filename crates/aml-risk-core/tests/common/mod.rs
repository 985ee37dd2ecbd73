#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use aml_risk_core::classification::classifier::{FeatureSchema, RiskClassifier};
use aml_risk_core::classification::features::{SixMonthAggregates, TransactionFeatures};
use aml_risk_core::regulatory::profile::{
    FractionThresholdsConfig, RegulatoryConfig, RegulatoryProfile,
};
use aml_risk_core::{AmlRiskError, AmlRiskResult, EngineConfig, RiskEngine};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal_macros::dec;

/// Fraction VIII: notice at 300,000 and cash limit at 200,000 (rate 100).
/// Fraction V: notice only, at 160,500.
pub fn sample_profile() -> RegulatoryProfile {
    let mut fractions = BTreeMap::new();
    fractions.insert(
        "VIII".to_string(),
        FractionThresholdsConfig {
            notice_threshold_units: Some(dec!(3_000)),
            cash_limit_units: Some(dec!(2_000)),
            description: Some("Vehicles".into()),
        },
    );
    fractions.insert(
        "V".to_string(),
        FractionThresholdsConfig {
            notice_threshold_units: Some(dec!(1_605)),
            cash_limit_units: None,
            description: Some("Real estate".into()),
        },
    );
    RegulatoryProfile::from_config(&RegulatoryConfig {
        reference_unit_rate: dec!(100),
        reference_unit: "UMA".into(),
        fractions,
    })
}

pub fn engine() -> RiskEngine {
    RiskEngine::new(sample_profile(), EngineConfig::default()).unwrap()
}

pub fn evaluated_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap()
}

pub fn quiet_row(id: &str) -> TransactionFeatures {
    TransactionFeatures {
        transaction_id: id.to_string(),
        amount: dec!(1_500),
        is_cash: false,
        is_international: false,
        is_round_amount: false,
        sector_risk: false,
        is_nocturnal: false,
        is_weekend: false,
        monthly_frequency: 1,
        six_month: SixMonthAggregates {
            count: 6,
            sum: dec!(9_000),
            max: dec!(2_000),
            std_dev: dec!(300),
            ratio_vs_average: dec!(1),
        },
        is_burst: false,
        fraction: "VIII".to_string(),
        sector: None,
    }
}

pub fn quiet_batch(n: usize) -> Vec<TransactionFeatures> {
    (0..n).map(|i| quiet_row(&format!("tx-{:04}", i))).collect()
}

/// Fixed-output oracle that counts how often it is invoked.
pub struct StubClassifier {
    schema: FeatureSchema,
    output: [f64; 3],
    fail: bool,
    calls: AtomicUsize,
}

impl StubClassifier {
    pub fn returning(output: [f64; 3]) -> Self {
        StubClassifier {
            schema: FeatureSchema::with_fractions(&["V", "VIII"]),
            output,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn offline() -> Self {
        StubClassifier {
            fail: true,
            ..Self::returning([1.0, 0.0, 0.0])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RiskClassifier for StubClassifier {
    fn name(&self) -> &str {
        "stub"
    }

    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn predict_proba(&self, rows: &[Vec<f64>]) -> AmlRiskResult<Vec<[f64; 3]>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AmlRiskError::ClassifierUnavailable("connection refused".into()));
        }
        Ok(vec![self.output; rows.len()])
    }
}
