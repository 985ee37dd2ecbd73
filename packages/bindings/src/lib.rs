use napi::Result as NapiResult;
use napi_derive::napi;
use std::sync::Arc;
use std::time::Instant;

use aml_risk_core::classification::linear::SoftmaxClassifier;
use aml_risk_core::classification::strategy::select_strategy;
use aml_risk_core::regulatory::profile::ResolvedThresholds;
use aml_risk_core::{with_metadata, EngineConfig, RegulatoryProfile, RiskEngine};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn engine_config(config_json: Option<String>) -> NapiResult<EngineConfig> {
    match config_json {
        Some(json) => EngineConfig::from_json(&json).map_err(to_napi_error),
        None => Ok(EngineConfig::default()),
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify a JSON array of enriched transaction rows.
///
/// Malformed rows come back in `result.errors`; only unusable configuration
/// raises.
#[napi]
pub fn classify_transactions(
    rows_json: String,
    regulatory_json: String,
    config_json: Option<String>,
    model_json: Option<String>,
) -> NapiResult<String> {
    let rows: Vec<serde_json::Value> = serde_json::from_str(&rows_json).map_err(to_napi_error)?;
    let profile = RegulatoryProfile::from_json(&regulatory_json).map_err(to_napi_error)?;
    let mut engine =
        RiskEngine::new(profile, engine_config(config_json)?).map_err(to_napi_error)?;

    if let Some(json) = model_json {
        let model = SoftmaxClassifier::from_json(&json).map_err(to_napi_error)?;
        engine = engine.with_classifier(Arc::new(model));
    }

    let output = engine.classify_json_rows(&rows);
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Inspection
// ---------------------------------------------------------------------------

#[napi(js_name = "selectStrategy")]
pub fn select_batch_strategy(batch_size: u32, config_json: Option<String>) -> NapiResult<String> {
    let start = Instant::now();
    let config = engine_config(config_json)?;
    let selection = select_strategy(batch_size as usize, &config.strategy);
    let output = with_metadata(
        "Volume-adaptive strategy selection by batch size",
        &config.strategy,
        Vec::new(),
        start.elapsed().as_micros() as u64,
        selection,
    );
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn resolve_thresholds(regulatory_json: String) -> NapiResult<String> {
    let start = Instant::now();
    let profile = RegulatoryProfile::from_json(&regulatory_json).map_err(to_napi_error)?;
    let resolved: Vec<ResolvedThresholds> = profile.fractions().cloned().collect();
    let warnings = profile
        .issues()
        .iter()
        .map(|i| format!("Fraction {}: {}; treated as no limit", i.fraction, i.reason))
        .collect();
    let assumptions = serde_json::json!({
        "reference_unit": profile.reference_unit,
        "reference_unit_rate": profile.reference_unit_rate,
    });
    let output = with_metadata(
        "Regulatory thresholds resolved to currency from reference units",
        &assumptions,
        warnings,
        start.elapsed().as_micros() as u64,
        resolved,
    );
    serde_json::to_string(&output).map_err(to_napi_error)
}
