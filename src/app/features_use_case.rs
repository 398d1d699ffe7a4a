use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::app::ports::ArtifactSink;
use crate::config::{ColumnConfig, Config};
use crate::constants::{FEATURES_CSV, FEATURES_JSON, FEATURE_DEFINITIONS_JSON, FEATURE_REPORT_JSON};
use crate::pipeline::processing::diagnostics::{DiagnosticsReporter, FeatureReport};
use crate::pipeline::processing::features::{
    CompositeTable, FeatureDefinitionsPayload, FeatureEngine, FeatureSet,
};
use crate::pipeline::storage::tables::{composite_to_csv, load_canonical, to_json};
use crate::pipeline::storage::{Artifact, ArtifactSet};
use crate::types::CanonicalTable;

/// Result of the features stage, with its serialized artifacts.
#[derive(Debug, Clone)]
pub struct FeaturesOutput {
    pub table: CompositeTable,
    pub report: FeatureReport,
    pub artifacts: ArtifactSet,
}

/// Use case for scoring and ranking a canonical table
pub struct FeaturesUseCase {
    columns: ColumnConfig,
    engine: FeatureEngine,
    reporter: DiagnosticsReporter,
}

impl FeaturesUseCase {
    pub fn new(config: &Config) -> Result<Self> {
        let features = FeatureSet::from_config(config).context("Invalid composite definitions")?;
        Ok(Self {
            columns: config.columns.clone(),
            engine: FeatureEngine::new(features),
            reporter: DiagnosticsReporter::new(config.diagnostics),
        })
    }

    pub fn features(&self) -> &FeatureSet {
        self.engine.features()
    }

    /// Scores an in-memory canonical table and serializes the stage artifacts.
    pub fn compute(&self, canonical: &CanonicalTable, skip_percentiles: bool) -> Result<FeaturesOutput> {
        let started = Instant::now();
        let table = self.engine.compute(canonical, skip_percentiles);
        let report = self.reporter.feature_report(&table, self.features());
        let definitions = FeatureDefinitionsPayload::build(
            self.features(),
            &canonical.group_column,
            !skip_percentiles,
        );

        let mut artifacts = ArtifactSet::new();
        artifacts.push(Artifact::new(FEATURES_CSV, composite_to_csv(&table)));
        artifacts.push(Artifact::new(FEATURES_JSON, to_json(&table)?));
        artifacts.push(Artifact::new(FEATURE_DEFINITIONS_JSON, to_json(&definitions)?));
        artifacts.push(Artifact::new(FEATURE_REPORT_JSON, to_json(&report)?));

        crate::observability::metrics::run::stage_duration("features", started.elapsed().as_secs_f64());
        info!(
            rows = table.len(),
            with_missing = report.builds_with_missing_stat_used_for_composites,
            "features finished"
        );
        Ok(FeaturesOutput {
            table,
            report,
            artifacts,
        })
    }

    /// Loads the canonical table at `input`, scores it and publishes the artifacts.
    pub fn run(
        &self,
        input: &Path,
        sink: &dyn ArtifactSink,
        force: bool,
        skip_percentiles: bool,
    ) -> Result<FeaturesOutput> {
        if !input.exists() {
            anyhow::bail!("Input file does not exist: {}", input.display());
        }
        let canonical = load_canonical(input, &self.columns)
            .with_context(|| format!("Failed to load canonical table {}", input.display()))?;
        let output = self.compute(&canonical, skip_percentiles)?;
        output.artifacts.publish(sink, force)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::storage::in_memory::InMemoryArtifactSink;
    use crate::types::{CanonicalRecord, Interval};

    fn canonical() -> CanonicalTable {
        let record = |name: &str, group: &str, speed: Option<f64>| CanonicalRecord {
            name: name.to_string(),
            group: group.to_string(),
            height: Interval::EMPTY,
            weight: Interval::EMPTY,
            attributes: [("speed".to_string(), speed)].into_iter().collect(),
        };
        CanonicalTable {
            name_column: "build_name".to_string(),
            group_column: "position".to_string(),
            attributes: vec!["speed".into()],
            records: vec![
                record("a", "PG", Some(90.0)),
                record("b", "PG", Some(70.0)),
                record("c", "C", None),
            ],
        }
    }

    #[test]
    fn test_compute_produces_four_artifacts() {
        let use_case = FeaturesUseCase::new(&Config::default()).unwrap();
        let output = use_case.compute(&canonical(), false).unwrap();
        assert_eq!(
            output.artifacts.names(),
            vec![FEATURES_CSV, FEATURES_JSON, FEATURE_DEFINITIONS_JSON, FEATURE_REPORT_JSON]
        );
        let athleticism = output.table.composites.iter().position(|c| c == "athleticism").unwrap();
        assert_eq!(output.table.records[0].scores[athleticism], Some(90.0));
        assert_eq!(output.table.records[0].primary_role, "Athleticism");
        assert_eq!(output.table.records[0].percentiles[athleticism].global, Some(100.0));
        assert_eq!(output.table.records[1].percentiles[athleticism].group, Some(50.0));
        assert_eq!(output.table.records[2].primary_role, "");
    }

    #[test]
    fn test_composite_table_is_deterministic() {
        let use_case = FeaturesUseCase::new(&Config::default()).unwrap();
        let first = use_case.compute(&canonical(), false).unwrap();
        let second = use_case.compute(&canonical(), false).unwrap();
        for name in [FEATURES_CSV, FEATURES_JSON, FEATURE_DEFINITIONS_JSON] {
            assert_eq!(first.artifacts.get(name), second.artifacts.get(name));
        }
    }

    #[test]
    fn test_run_rejects_missing_input() {
        let use_case = FeaturesUseCase::new(&Config::default()).unwrap();
        let sink = InMemoryArtifactSink::new();
        let err = use_case
            .run(Path::new("/nonexistent/builds_canonical.csv"), &sink, false, false)
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
        assert!(sink.names().is_empty());
    }
}
