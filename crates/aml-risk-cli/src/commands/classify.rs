use clap::Args;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use aml_risk_core::classification::linear::SoftmaxClassifier;
use aml_risk_core::RiskEngine;

use super::{load_engine_config, load_regulatory_profile};
use crate::input;

/// Arguments for batch classification
#[derive(Args)]
pub struct ClassifyArgs {
    /// Path to JSON file of enriched transaction rows (array, or object with `transactions`)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to the regulatory threshold profile (JSON or YAML)
    #[arg(long)]
    pub regulatory: String,

    /// Path to engine configuration (JSON or YAML); defaults are used when omitted
    #[arg(long)]
    pub config: Option<String>,

    /// Path to a softmax classifier model (JSON)
    #[arg(long)]
    pub model: Option<String>,
}

pub fn run_classify(args: ClassifyArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let document = if let Some(ref path) = args.input {
        input::file::read_json_value(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <file.json> or stdin required for classification".into());
    };
    let rows = input::transaction_rows(document)?;

    let profile = load_regulatory_profile(&args.regulatory)?;
    let config = load_engine_config(args.config.as_deref())?;
    let mut engine = RiskEngine::new(profile, config)?;

    if let Some(ref path) = args.model {
        let model: SoftmaxClassifier = input::file::read_json(path)?;
        model.validate()?;
        engine = engine.with_classifier(Arc::new(model));
    }

    info!(rows = rows.len(), "classifying batch");
    let result = engine.classify_json_rows(&rows);
    Ok(serde_json::to_value(result)?)
}
