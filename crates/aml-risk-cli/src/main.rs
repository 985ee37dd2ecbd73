mod commands;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::classify::ClassifyArgs;
use commands::strategy::StrategyArgs;
use commands::thresholds::ThresholdsArgs;

/// Adaptive AML transaction risk classification
#[derive(Parser)]
#[command(
    name = "amlr",
    version,
    about = "Adaptive AML transaction risk classification",
    long_about = "Classifies enriched transactions as routine, unusual or reportable. \
                  Combines regulatory threshold guardrails, a weighted risk score and an \
                  optional pre-trained classifier, and explains every decision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log at debug level (overridden by RUST_LOG / AMLR_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a batch of enriched transactions
    Classify(ClassifyArgs),
    /// Show which strategy a batch size would run under
    Strategy(StrategyArgs),
    /// Show resolved regulatory thresholds per activity fraction
    Thresholds(ThresholdsArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Classify(args) => commands::classify::run_classify(args),
        Commands::Strategy(args) => commands::strategy::run_strategy(args),
        Commands::Thresholds(args) => commands::thresholds::run_thresholds(args),
        Commands::Version => {
            println!("amlr {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
