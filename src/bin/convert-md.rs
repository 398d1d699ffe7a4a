use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use build_features::logging;
use build_features::pipeline::ingestion::csv::{parse_records, CsvWriter};
use build_features::pipeline::ingestion::markdown;

/// Convert pasted/markdown build tables into CSV files.
#[derive(Parser, Debug)]
#[command(name = "convert-md", version, about = "Convert markdown or pasted tables to CSV")]
struct Cli {
    /// Source table files (.md or .txt)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for the CSV files (defaults to each source's directory)
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

struct Conversion {
    destination: PathBuf,
    source_rows: usize,
    csv_rows: usize,
    rows_written: usize,
}

fn destination_for(source: &Path, out_dir: Option<&Path>) -> PathBuf {
    let file_name = source.with_extension("csv");
    match (out_dir, file_name.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => file_name,
    }
}

fn convert_file(source: &Path, destination: &Path) -> Result<Conversion> {
    let text = fs::read_to_string(source)
        .with_context(|| format!("Failed to read {}", source.display()))?;
    let Some(table) = markdown::convert(&text) else {
        bail!("Empty source: {}", source.display());
    };

    let mut writer = CsvWriter::new();
    writer.write_record(&table.headers);
    for row in &table.rows {
        writer.write_record(row);
    }
    let rows_written = writer.rows() - 1;

    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(destination, writer.finish())
        .with_context(|| format!("Failed to write {}", destination.display()))?;

    // re-read what landed on disk
    let written = fs::read_to_string(destination)
        .with_context(|| format!("Failed to re-read {}", destination.display()))?;
    let csv_rows = parse_records(&written, destination)?.len().saturating_sub(1);

    Ok(Conversion {
        destination: destination.to_path_buf(),
        source_rows: markdown::count_source_rows(&text),
        csv_rows,
        rows_written,
    })
}

fn main() -> Result<()> {
    let _guard = logging::init_logging(None)?;
    let args = Cli::parse();

    let mut failures = 0;
    let mut results = Vec::with_capacity(args.inputs.len());
    for source in &args.inputs {
        let destination = destination_for(source, args.out_dir.as_deref());
        let conversion = convert_file(source, &destination)?;
        if conversion.source_rows != conversion.csv_rows
            || conversion.source_rows != conversion.rows_written
        {
            error!(
                source = %source.display(),
                destination = %destination.display(),
                source_rows = conversion.source_rows,
                csv_rows = conversion.csv_rows,
                rows_written = conversion.rows_written,
                "row count verification failed"
            );
            failures += 1;
        } else {
            info!(source = %source.display(), rows = conversion.rows_written, "converted");
        }
        results.push(conversion);
    }

    for conversion in &results {
        println!(
            "{}\t{}\t{}",
            conversion.destination.display(),
            conversion.source_rows,
            conversion.csv_rows
        );
    }
    println!("TOTAL\t{}", results.len());

    if failures > 0 {
        bail!("{} file(s) failed row count verification", failures);
    }
    Ok(())
}
