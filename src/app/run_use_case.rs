use anyhow::{Context, Result};
use std::path::Path;

use crate::app::features_use_case::{FeaturesOutput, FeaturesUseCase};
use crate::app::ports::ArtifactSink;
use crate::app::prepare_use_case::{PrepareOutput, PrepareUseCase};
use crate::config::Config;
use crate::pipeline::ingestion;
use crate::pipeline::storage::ArtifactSet;

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub prepare: PrepareOutput,
    pub features: FeaturesOutput,
}

/// Prepare then features in memory; both artifact sets pass the overwrite guard
/// together before anything is written.
pub struct RunUseCase {
    prepare: PrepareUseCase,
    features: FeaturesUseCase,
}

impl RunUseCase {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            prepare: PrepareUseCase::new(config),
            features: FeaturesUseCase::new(config)?,
        })
    }

    pub fn run(
        &self,
        input_dir: &Path,
        sink: &dyn ArtifactSink,
        force: bool,
        skip_percentiles: bool,
    ) -> Result<RunOutput> {
        let tables = ingestion::load_tables(input_dir)
            .with_context(|| format!("Failed to load input tables from {}", input_dir.display()))?;
        let prepare = self.prepare.prepare(&tables)?;
        let features = self.features.compute(&prepare.canonical, skip_percentiles)?;

        let mut artifacts = ArtifactSet::new();
        artifacts.extend(prepare.artifacts.clone());
        artifacts.extend(features.artifacts.clone());
        artifacts.publish(sink, force)?;

        Ok(RunOutput { prepare, features })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{CANONICAL_CSV, FEATURES_CSV};
    use crate::pipeline::storage::in_memory::InMemoryArtifactSink;

    #[test]
    fn test_run_writes_both_stages() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pg.csv"),
            "Build Name,Position,Speed,Agility\nBlur,PG,95,90\n",
        )
        .unwrap();
        let sink = InMemoryArtifactSink::new();
        let output = RunUseCase::new(&Config::default())
            .unwrap()
            .run(dir.path(), &sink, false, false)
            .unwrap();
        assert_eq!(output.features.table.records[0].primary_role, "Athleticism");
        assert_eq!(sink.names().len(), 7);
    }

    #[test]
    fn test_existing_feature_output_blocks_prepare_output_too() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pg.csv"), "build_name,position\nA,PG\n").unwrap();
        let sink = InMemoryArtifactSink::new();
        sink.write(FEATURES_CSV, b"old").unwrap();
        let result = RunUseCase::new(&Config::default())
            .unwrap()
            .run(dir.path(), &sink, false, false);
        assert!(result.is_err());
        assert!(sink.get(CANONICAL_CSV).is_none());
    }
}
