use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::app::ports::ArtifactSink;

/// Writes artifacts into a directory. Each file goes to a temporary sibling first and
/// is renamed into place, so a failed write never leaves a partial file under its
/// final name.
pub struct FsArtifactSink {
    dir: PathBuf,
}

impl FsArtifactSink {
    /// Creates the output directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl ArtifactSink for FsArtifactSink {
    fn existing(&self, names: &[&str]) -> Result<Vec<String>> {
        Ok(names
            .iter()
            .filter(|n| self.path_of(n).exists())
            .map(|n| self.path_of(n).display().to_string())
            .collect())
    }

    fn write(&self, name: &str, contents: &[u8]) -> Result<()> {
        let target = self.path_of(name);
        let tmp = self.dir.join(format!(".{}.tmp", name));
        {
            let mut file = fs::File::create(&tmp)
                .with_context(|| format!("Failed to create {}", tmp.display()))?;
            file.write_all(contents)
                .with_context(|| format!("Failed to write {}", tmp.display()))?;
            file.sync_all()
                .with_context(|| format!("Failed to sync {}", tmp.display()))?;
        }
        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(anyhow::Error::new(e)
                .context(format!("Failed to move output into {}", target.display())));
        }
        debug!(path = %target.display(), bytes = contents.len(), "artifact file written");
        Ok(())
    }
}
