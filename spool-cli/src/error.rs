use std::path::PathBuf;

use spool_engine::SpoolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Capture(#[from] SpoolError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("No playlist URL found on standard input")]
    NoManifest,

    #[error("Could not find a free file name for {0}")]
    NameExhausted(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
