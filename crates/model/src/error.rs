use thiserror::Error;

/// Rejection reasons for a single input line.
///
/// Structural variants reject the shape of the line itself; the remaining
/// variants reject a value on a well-shaped line. Extraction routes the two
/// classes to separate error sinks.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Expected 16 fields, found {found}")]
    FieldCount { found: usize },

    #[error("Field {index} ('{field}') is empty")]
    EmptyField { index: usize, field: &'static str },

    #[error("Field {index} ('{field}') holds a value outside its domain: '{value}'")]
    Semantic {
        index: usize,
        field: &'static str,
        value: String,
    },

    #[error("Invalid value for '{field}': {reason}")]
    Domain { field: &'static str, reason: String },

    #[error("Failed to parse field {index} ('{field}') from '{value}'")]
    Parse {
        index: usize,
        field: &'static str,
        value: String,
    },
}

impl RecordError {
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            RecordError::FieldCount { .. } | RecordError::EmptyField { .. }
        )
    }
}
