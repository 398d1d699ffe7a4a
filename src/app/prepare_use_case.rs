use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::app::ports::ArtifactSink;
use crate::config::Config;
use crate::constants::{CANONICAL_CSV, CANONICAL_JSON, PARSING_REPORT_JSON};
use crate::idempotency::compute_input_digest;
use crate::pipeline::ingestion;
use crate::pipeline::processing::diagnostics::{DiagnosticsReporter, ParsingReport};
use crate::pipeline::processing::normalize::TableCanonicalizer;
use crate::pipeline::storage::tables::{canonical_to_csv, to_json};
use crate::pipeline::storage::{Artifact, ArtifactSet};
use crate::types::{CanonicalTable, RawTable};

/// Result of the prepare stage, with its serialized artifacts.
#[derive(Debug, Clone)]
pub struct PrepareOutput {
    pub canonical: CanonicalTable,
    pub report: ParsingReport,
    pub artifacts: ArtifactSet,
}

/// Use case for turning raw input tables into the canonical table
pub struct PrepareUseCase {
    canonicalizer: TableCanonicalizer,
    reporter: DiagnosticsReporter,
}

impl PrepareUseCase {
    pub fn new(config: &Config) -> Self {
        Self {
            canonicalizer: TableCanonicalizer::new(config),
            reporter: DiagnosticsReporter::new(config.diagnostics),
        }
    }

    /// Canonicalizes already-read tables and serializes the stage artifacts.
    pub fn prepare(&self, tables: &[RawTable]) -> Result<PrepareOutput> {
        let started = Instant::now();
        let outcome = self.canonicalizer.canonicalize(tables)?;
        let report = self.reporter.parsing_report(
            tables.iter().map(|t| t.source_id.clone()).collect(),
            compute_input_digest(tables),
            &outcome.table,
            &outcome.warnings,
        );

        let mut artifacts = ArtifactSet::new();
        artifacts.push(Artifact::new(CANONICAL_CSV, canonical_to_csv(&outcome.table)));
        artifacts.push(Artifact::new(CANONICAL_JSON, to_json(&outcome.table)?));
        artifacts.push(Artifact::new(PARSING_REPORT_JSON, to_json(&report)?));

        crate::observability::metrics::run::stage_duration("prepare", started.elapsed().as_secs_f64());
        info!(
            rows = report.rows_processed,
            warnings = report.parsing_warnings_count,
            "prepare finished"
        );
        Ok(PrepareOutput {
            canonical: outcome.table,
            report,
            artifacts,
        })
    }

    /// Reads every CSV table in `input_dir`, canonicalizes it and publishes the artifacts.
    pub fn run(&self, input_dir: &Path, sink: &dyn ArtifactSink, force: bool) -> Result<PrepareOutput> {
        let tables = ingestion::load_tables(input_dir)
            .with_context(|| format!("Failed to load input tables from {}", input_dir.display()))?;
        let output = self.prepare(&tables)?;
        output.artifacts.publish(sink, force)?;
        Ok(output)
    }
}
