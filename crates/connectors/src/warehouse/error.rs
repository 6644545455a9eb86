use thiserror::Error;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("Aggregate query returned {rows} rows, expected exactly one")]
    QueryShape { rows: usize },
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Failed to decode warehouse response: {0}")]
    Decode(String),
    #[error("Load job '{job_id}' failed: {message}")]
    JobFailed { job_id: String, message: String },
}

impl WarehouseError {
    /// Shape errors indicate a broken contract; everything else is treated
    /// as the store being unavailable.
    pub fn is_query_shape(&self) -> bool {
        matches!(self, WarehouseError::QueryShape { .. })
    }
}
