use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use build_features::config::Config;
use build_features::constants::median_column;
use build_features::pipeline::processing::features::FeatureSet;

/// Validate a config file and print the composite table it resolves to.
#[derive(Parser, Debug)]
#[command(name = "validate-composites", version, about = "Validate composite definitions")]
struct Cli {
    /// TOML config file; the built-in composites are shown when omitted
    path: Option<PathBuf>,

    /// Print the resolved definitions as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let config = match Config::load_or_default(args.path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid: {}", e);
            std::process::exit(1)
        }
    };
    let features = FeatureSet::from_config(&config).context("Failed to resolve composites")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(features.definitions())?);
        return Ok(());
    }

    println!("valid: {} composite(s)", features.len());
    for definition in features.definitions() {
        let total: f64 = definition.weights.iter().sum();
        println!("{} ({})", definition.name, definition.label);
        for (input, weight) in definition.inputs.iter().zip(&definition.weights) {
            let share = if total > 0.0 { weight / total * 100.0 } else { 0.0 };
            println!("  {:<24} {:>6.3}  {:>5.1}%", median_column(input), weight, share);
        }
    }
    Ok(())
}
