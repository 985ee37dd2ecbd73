use aml_risk_core::classification::linear::SoftmaxClassifier;
use aml_risk_core::classification::classifier::RiskClassifier;
use aml_risk_core::regulatory::profile::Threshold;
use aml_risk_core::{RegulatoryProfile, RiskEngine};
use rust_decimal_macros::dec;
use std::sync::Arc;

const PROFILE: &str = include_str!("../../../config/regulatory_profile.json");
const MODEL: &str = include_str!("../../../config/classifier.json");
const SAMPLE: &str = include_str!("../../../config/transactions.sample.json");

#[test]
fn test_shipped_profile_resolves_to_currency() {
    let profile = RegulatoryProfile::from_json(PROFILE).unwrap();
    let degraded: Vec<&str> = profile
        .issues()
        .iter()
        .map(|issue| issue.fraction.as_str())
        .collect();
    assert_eq!(degraded, vec!["I", "II", "IV", "XVI"]);
    assert!(profile
        .issues()
        .iter()
        .all(|issue| issue.reason == "cash_limit_units missing"));

    let vehicles = profile.resolve("viii");
    assert!(vehicles.mapped);
    assert_eq!(vehicles.notice, Threshold::Limit(dec!(3210) * dec!(113.14)));

    let virtual_assets = profile.resolve("XVI");
    assert_eq!(virtual_assets.cash_limit, Threshold::NoLimit);
}

#[test]
fn test_shipped_model_is_valid() {
    let model = SoftmaxClassifier::from_json(MODEL).unwrap();
    assert_eq!(model.schema().len(), 17);
}

#[test]
fn test_sample_batch_end_to_end() {
    let profile = RegulatoryProfile::from_json(PROFILE).unwrap();
    let model = SoftmaxClassifier::from_json(MODEL).unwrap();
    let engine = RiskEngine::new(profile, Default::default())
        .unwrap()
        .with_classifier(Arc::new(model));

    let doc: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
    let rows = doc["transactions"].as_array().unwrap();
    let out = engine.classify_json_rows(rows);
    let batch = &out.result;

    assert_eq!(batch.results.len(), 4);
    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.errors[0].index, 3);
    // 412,000 >= 3,210 UMA x 113.14 = 363,179.40
    let first = batch.results[0].as_ref().unwrap();
    assert!(first.explanation.forced_by_law);
    assert!(out.warnings.iter().any(|w| w.contains("rejected")));
    assert!(out.warnings.iter().any(|w| w.contains("no configured regulatory thresholds")));
}
