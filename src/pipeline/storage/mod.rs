// Pipeline storage: artifact serialization and publishing

pub mod in_memory;
pub mod tables;

use anyhow::Result;
use tracing::{error, info};

use crate::app::ports::ArtifactSink;
use crate::error::PipelineError;

/// One serialized output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: &'static str,
    pub contents: Vec<u8>,
}

impl Artifact {
    pub fn new(name: &'static str, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name,
            contents: contents.into(),
        }
    }
}

/// The artifacts of one stage, published all-or-nothing with respect to the
/// overwrite guard.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    artifacts: Vec<Artifact>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }

    /// Appends every artifact of `other`, e.g. to publish two stages together.
    pub fn extend(&mut self, other: ArtifactSet) {
        self.artifacts.extend(other.artifacts);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.artifacts.iter().map(|a| a.name).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.name == name)
    }

    /// Writes every artifact. Unless `force` is set, nothing is written when any
    /// target already exists.
    pub fn publish(&self, sink: &dyn ArtifactSink, force: bool) -> Result<()> {
        let existing = sink.existing(&self.names())?;
        if !existing.is_empty() && !force {
            error!(existing = ?existing, "outputs already exist; use --force to overwrite");
            return Err(PipelineError::OutputsExist(existing).into());
        }
        for artifact in &self.artifacts {
            sink.write(artifact.name, &artifact.contents)?;
            crate::observability::metrics::storage::artifact_written(artifact.contents.len());
            info!(artifact = artifact.name, bytes = artifact.contents.len(), "artifact written");
        }
        Ok(())
    }
}
