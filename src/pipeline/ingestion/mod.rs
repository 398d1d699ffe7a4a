// Pipeline ingestion: input discovery and table reading

pub mod csv;
pub mod markdown;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::types::RawTable;

/// Every `*.csv` file directly under `dir`, sorted by name.
pub fn discover_input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Reads one CSV file. The first record is the header; the source id is the file name.
pub fn read_table(path: &Path) -> Result<RawTable> {
    let content = fs::read_to_string(path)?;
    let mut records = csv::parse_records(&content, path)?.into_iter();
    let headers = records.next().unwrap_or_default();
    let rows: Vec<Vec<String>> = records.collect();
    let source_id = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    debug!(source = %source_id, columns = headers.len(), rows = rows.len(), "table read");
    crate::observability::metrics::ingestion::table_read(content.len(), rows.len());
    Ok(RawTable::new(source_id, headers, rows))
}

/// Reads every input table under `dir`. Fails when there is none.
pub fn load_tables(dir: &Path) -> Result<Vec<RawTable>> {
    let files = discover_input_files(dir)?;
    if files.is_empty() {
        return Err(PipelineError::NoInputTables(dir.to_path_buf()));
    }
    info!(count = files.len(), dir = %dir.display(), "found input tables");
    files.iter().map(|path| read_table(path)).collect()
}
