use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Input file has no header line: {0}")]
    Empty(String),
    #[error("Header does not match the expected schema: {0}")]
    HeaderMismatch(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
