use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use build_features::app::features_use_case::FeaturesUseCase;
use build_features::app::prepare_use_case::PrepareUseCase;
use build_features::app::run_use_case::RunUseCase;
use build_features::config::Config;
use build_features::infra::fs_artifact_sink::FsArtifactSink;
use build_features::logging;
use build_features::observability::metrics;

#[derive(Parser)]
#[command(name = "build_features")]
#[command(about = "Canonicalize build attribute tables and compute composite features")]
#[command(version)]
struct Cli {
    /// Directory for daily-rolling JSON logs
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Write Prometheus exposition text here when the run ends
    #[arg(long, global = true)]
    metrics_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Output directory for artifacts
    #[arg(long, short)]
    output: PathBuf,

    /// Overwrite artifacts that already exist
    #[arg(long)]
    force: bool,

    /// TOML config with columns, unit thresholds and composites
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse raw CSV tables into the canonical table
    Prepare {
        /// Directory holding the raw *.csv tables
        #[arg(long, short)]
        input: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Compute composites, roles and percentiles from a canonical table
    Features {
        /// Canonical table (.csv or .json)
        #[arg(long, short)]
        input: PathBuf,

        /// Skip percentile computation
        #[arg(long)]
        skip_percentiles: bool,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Run prepare and features back to back
    Run {
        /// Directory holding the raw *.csv tables
        #[arg(long, short)]
        input: PathBuf,

        /// Skip percentile computation
        #[arg(long)]
        skip_percentiles: bool,

        #[command(flatten)]
        common: CommonArgs,
    },
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = Config::load_or_default(path)?;
    if let Some(path) = path {
        info!(path = %path.display(), "loaded config");
    }
    Ok(config)
}

fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::Prepare { input, common } => {
            let config = load_config(common.config.as_deref())?;
            let sink = FsArtifactSink::new(&common.output)?;
            let output = PrepareUseCase::new(&config).run(&input, &sink, common.force)?;
            println!("✅ Prepared {} rows into {}", output.report.rows_processed, sink.dir().display());
            println!("   Parsing warnings: {}", output.report.parsing_warnings_count);
        }
        Commands::Features {
            input,
            skip_percentiles,
            common,
        } => {
            let config = load_config(common.config.as_deref())?;
            let sink = FsArtifactSink::new(&common.output)?;
            let output = FeaturesUseCase::new(&config)?.run(&input, &sink, common.force, skip_percentiles)?;
            println!("✅ Computed features for {} rows into {}", output.table.len(), sink.dir().display());
            println!(
                "   Rows missing a composite input: {}",
                output.report.builds_with_missing_stat_used_for_composites
            );
        }
        Commands::Run {
            input,
            skip_percentiles,
            common,
        } => {
            let config = load_config(common.config.as_deref())?;
            let sink = FsArtifactSink::new(&common.output)?;
            let output = RunUseCase::new(&config)?.run(&input, &sink, common.force, skip_percentiles)?;
            println!("✅ Full pipeline completed into {}", sink.dir().display());
            println!("   Rows: {}", output.prepare.report.rows_processed);
            println!("   Parsing warnings: {}", output.prepare.report.parsing_warnings_count);
            println!(
                "   Rows missing a composite input: {}",
                output.features.report.builds_with_missing_stat_used_for_composites
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init_logging(cli.log_dir.as_deref())?;

    let metrics_handle = match &cli.metrics_file {
        Some(_) => Some(metrics::install_recorder()?),
        None => None,
    };

    let result = execute(cli.command);
    if let Err(e) = &result {
        error!("Run failed: {:#}", e);
    }

    if let (Some(handle), Some(path)) = (&metrics_handle, &cli.metrics_file) {
        metrics::write_snapshot(handle, path)?;
    }
    result
}
