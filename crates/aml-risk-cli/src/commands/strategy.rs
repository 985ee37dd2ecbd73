use clap::Args;
use serde_json::Value;
use std::time::Instant;

use aml_risk_core::classification::strategy::select_strategy;
use aml_risk_core::with_metadata;

use super::load_engine_config;

/// Arguments for strategy selection
#[derive(Args)]
pub struct StrategyArgs {
    /// Number of rows in the batch
    #[arg(long)]
    pub batch_size: usize,

    /// Path to engine configuration (JSON or YAML)
    #[arg(long)]
    pub config: Option<String>,
}

pub fn run_strategy(args: StrategyArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let config = load_engine_config(args.config.as_deref())?;
    let selection = select_strategy(args.batch_size, &config.strategy);

    let mut warnings = Vec::new();
    if args.batch_size == 0 {
        warnings.push("Empty batch: nothing would be evaluated".to_string());
    }

    let result = with_metadata(
        "Volume-adaptive strategy selection by batch size",
        &config.strategy,
        warnings,
        start.elapsed().as_micros() as u64,
        selection,
    );
    Ok(serde_json::to_value(result)?)
}
