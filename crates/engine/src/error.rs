use chrono::NaiveDate;
use connectors::warehouse::error::WarehouseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Input records are not ordered by date: {current} after {previous}")]
    UnsortedInput {
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("Color '{0}' is not in the allowed set")]
    DisallowedColor(String),

    #[error("The duplicate sink was already opened and closed in this run")]
    DuplicateSinkReopened,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Background write task failed: {0}")]
    WriteTask(String),

    #[error("Corrupt batch file count: '{0}'")]
    CorruptFileCount(String),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Batch directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Failed to read batch file '{path}': {source}")]
    BatchFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("Checkpoint error: {0}")]
    State(#[from] StateError),
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Checkpoint store error: {0}")]
    Store(#[from] sled::Error),

    #[error("Checkpoint encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}
