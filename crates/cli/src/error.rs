use connectors::file::error::FileError;
use engine::error::{LoadError, StateError, TransformError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read the input archive: {0}")]
    Extract(#[from] FileError),

    #[error("Failed to transform the extracted records: {0}")]
    Transform(#[from] TransformError),

    #[error("Failed to load the batch files: {0}")]
    Load(#[from] LoadError),

    #[error("Failed to open the checkpoint store: {0}")]
    State(#[from] StateError),

    #[error("Failed to build an HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid rest day '{0}', expected a weekday name")]
    InvalidRestDay(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
