use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::app::ports::ArtifactSink;

/// In-memory artifact sink for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifactSink {
    artifacts: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryArtifactSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.artifacts.lock().ok()?.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.artifacts
            .lock()
            .map(|a| a.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl ArtifactSink for InMemoryArtifactSink {
    fn existing(&self, names: &[&str]) -> Result<Vec<String>> {
        let artifacts = self
            .artifacts
            .lock()
            .map_err(|_| anyhow!("artifact store lock poisoned"))?;
        Ok(names
            .iter()
            .filter(|n| artifacts.contains_key(**n))
            .map(|n| n.to_string())
            .collect())
    }

    fn write(&self, name: &str, contents: &[u8]) -> Result<()> {
        let mut artifacts = self
            .artifacts
            .lock()
            .map_err(|_| anyhow!("artifact store lock poisoned"))?;
        artifacts.insert(name.to_string(), contents.to_vec());
        debug!(artifact = name, bytes = contents.len(), "stored artifact in memory");
        Ok(())
    }
}
