//! Metrics for the build feature pipeline
//!
//! Recording goes through the `metrics` facade; without an installed recorder every
//! call is a no-op. The CLI can install a Prometheus recorder and dump the rendered
//! exposition text to a file when the run ends.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Ingestion metrics
    IngestTablesRead,
    IngestRowsRead,
    IngestBytesRead,

    // Canonicalization metrics
    RowsCanonicalized,
    ParseWarnings,

    // Feature metrics
    RecordsScored,
    CompositesMissing,
    RecordsWithMissingInputs,

    // Storage metrics
    ArtifactsWritten,
    ArtifactBytes,

    // Run metrics
    StageDuration,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::IngestTablesRead => "bf_ingest_tables_read_total",
            MetricName::IngestRowsRead => "bf_ingest_rows_read_total",
            MetricName::IngestBytesRead => "bf_ingest_bytes_read",

            MetricName::RowsCanonicalized => "bf_rows_canonicalized_total",
            MetricName::ParseWarnings => "bf_parse_warnings_total",

            MetricName::RecordsScored => "bf_records_scored_total",
            MetricName::CompositesMissing => "bf_composites_missing_total",
            MetricName::RecordsWithMissingInputs => "bf_records_with_missing_inputs",

            MetricName::ArtifactsWritten => "bf_artifacts_written_total",
            MetricName::ArtifactBytes => "bf_artifact_bytes",

            MetricName::StageDuration => "bf_stage_duration_seconds",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            IngestTablesRead,
            IngestRowsRead,
            IngestBytesRead,
            RowsCanonicalized,
            ParseWarnings,
            RecordsScored,
            CompositesMissing,
            RecordsWithMissingInputs,
            ArtifactsWritten,
            ArtifactBytes,
            StageDuration,
        ]
        .into_iter()
    }

    /// (phase, description, unit)
    pub fn metadata(&self) -> (&'static str, &'static str, Option<&'static str>) {
        match self {
            MetricName::IngestTablesRead => ("ingestion", "Input tables read", None),
            MetricName::IngestRowsRead => ("ingestion", "Data rows read from input tables", None),
            MetricName::IngestBytesRead => ("ingestion", "Input table size", Some("bytes")),

            MetricName::RowsCanonicalized => ("canonicalize", "Rows turned into canonical records", None),
            MetricName::ParseWarnings => ("canonicalize", "Field parse warnings", None),

            MetricName::RecordsScored => ("features", "Records given composite scores", None),
            MetricName::CompositesMissing => ("features", "Composite scores left missing", None),
            MetricName::RecordsWithMissingInputs => {
                ("features", "Records missing a composite input", None)
            }

            MetricName::ArtifactsWritten => ("storage", "Artifacts written", None),
            MetricName::ArtifactBytes => ("storage", "Artifact size", Some("bytes")),

            MetricName::StageDuration => ("run", "Stage duration", Some("s")),
        }
    }
}

/// Installs the Prometheus recorder as the global `metrics` recorder.
pub fn install_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    describe_all();
    info!("Metrics recorder installed");
    Ok(handle)
}

fn describe_all() {
    for metric in MetricName::all_metrics() {
        let (phase, description, unit) = metric.metadata();
        let help = match unit {
            Some(unit) => format!("[{}] {} ({})", phase, description, unit),
            None => format!("[{}] {}", phase, description),
        };
        match metric {
            MetricName::IngestBytesRead | MetricName::ArtifactBytes | MetricName::StageDuration => {
                ::metrics::describe_histogram!(metric.as_str(), help)
            }
            MetricName::RecordsWithMissingInputs => ::metrics::describe_gauge!(metric.as_str(), help),
            _ => ::metrics::describe_counter!(metric.as_str(), help),
        }
    }
}

/// Writes the current exposition text to `path`.
pub fn write_snapshot(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, handle.render())
        .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    info!(path = %path.display(), "Metrics snapshot written");
    Ok(())
}

// ============================================================================
// Ingestion Metrics
// ============================================================================

pub mod ingestion {
    use super::MetricName;

    /// Record one input table read
    pub fn table_read(bytes: usize, rows: usize) {
        ::metrics::counter!(MetricName::IngestTablesRead.as_str()).increment(1);
        ::metrics::counter!(MetricName::IngestRowsRead.as_str()).increment(rows as u64);
        ::metrics::histogram!(MetricName::IngestBytesRead.as_str()).record(bytes as f64);
    }
}

// ============================================================================
// Canonicalization Metrics
// ============================================================================

pub mod canonicalize {
    use super::MetricName;

    pub fn rows_canonicalized(rows: usize) {
        ::metrics::counter!(MetricName::RowsCanonicalized.as_str()).increment(rows as u64);
    }

    pub fn parse_warnings(count: usize) {
        ::metrics::counter!(MetricName::ParseWarnings.as_str()).increment(count as u64);
    }
}

// ============================================================================
// Feature Metrics
// ============================================================================

pub mod features {
    use super::MetricName;

    pub fn records_scored(rows: usize) {
        ::metrics::counter!(MetricName::RecordsScored.as_str()).increment(rows as u64);
    }

    /// Record how many records have no score for `composite`
    pub fn composite_missing(composite: &str, missing: usize) {
        ::metrics::counter!(
            MetricName::CompositesMissing.as_str(),
            "composite" => composite.to_string()
        )
        .increment(missing as u64);
    }

    pub fn records_with_missing_inputs(count: usize) {
        ::metrics::gauge!(MetricName::RecordsWithMissingInputs.as_str()).set(count as f64);
    }
}

// ============================================================================
// Storage Metrics
// ============================================================================

pub mod storage {
    use super::MetricName;

    pub fn artifact_written(bytes: usize) {
        ::metrics::counter!(MetricName::ArtifactsWritten.as_str()).increment(1);
        ::metrics::histogram!(MetricName::ArtifactBytes.as_str()).record(bytes as f64);
    }
}

// ============================================================================
// Run Metrics
// ============================================================================

pub mod run {
    use super::MetricName;

    pub fn stage_duration(stage: &'static str, secs: f64) {
        ::metrics::histogram!(MetricName::StageDuration.as_str(), "stage" => stage).record(secs);
    }
}
