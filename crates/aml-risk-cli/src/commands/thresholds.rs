use clap::Args;
use serde_json::Value;
use std::time::Instant;

use aml_risk_core::regulatory::profile::ResolvedThresholds;
use aml_risk_core::with_metadata;

use super::load_regulatory_profile;

/// Arguments for threshold inspection
#[derive(Args)]
pub struct ThresholdsArgs {
    /// Path to the regulatory threshold profile (JSON or YAML)
    #[arg(long)]
    pub regulatory: String,

    /// Resolve a single fraction code instead of listing all of them
    #[arg(long)]
    pub fraction: Option<String>,
}

pub fn run_thresholds(args: ThresholdsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let profile = load_regulatory_profile(&args.regulatory)?;

    let resolved: Vec<ResolvedThresholds> = match args.fraction {
        Some(ref code) => vec![profile.resolve(code)],
        None => profile.fractions().cloned().collect(),
    };

    let mut warnings: Vec<String> = profile
        .issues()
        .iter()
        .map(|i| format!("Fraction {}: {}; treated as no limit", i.fraction, i.reason))
        .collect();
    warnings.extend(
        resolved
            .iter()
            .filter(|t| !t.mapped)
            .map(|t| format!("Fraction {} is not configured; no guardrails apply", t.fraction)),
    );

    let assumptions = serde_json::json!({
        "reference_unit": profile.reference_unit,
        "reference_unit_rate": profile.reference_unit_rate,
    });

    let result = with_metadata(
        "Regulatory thresholds resolved to currency from reference units",
        &assumptions,
        warnings,
        start.elapsed().as_micros() as u64,
        resolved,
    );
    Ok(serde_json::to_value(result)?)
}
