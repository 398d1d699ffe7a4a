use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed CSV in {path} at line {line}: {message}")]
    Csv {
        path: String,
        line: usize,
        message: String,
    },

    #[error("No input tables found in {}", .0.display())]
    NoInputTables(PathBuf),

    #[error("Required column '{column}' missing from {source_id}")]
    MissingIdentityColumn { source_id: String, column: String },

    #[error("Output files already exist ({}); use --force to overwrite", .0.join(", "))]
    OutputsExist(Vec<String>),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
