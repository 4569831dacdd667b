use std::path::PathBuf;

use thiserror::Error;

/// Main error type for usestruct operations
#[derive(Error, Debug)]
pub enum UsestructError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("Source model unavailable for {}: {reason}", path.display())]
    SourceModel { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

pub type Result<T> = std::result::Result<T, UsestructError>;
