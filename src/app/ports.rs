use anyhow::Result;

/// Destination for the named artifacts a stage produces.
pub trait ArtifactSink: Send + Sync {
    /// Names among `names` that are already present.
    fn existing(&self, names: &[&str]) -> Result<Vec<String>>;

    /// Stores one artifact, replacing any previous content.
    fn write(&self, name: &str, contents: &[u8]) -> Result<()>;
}
