use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Empty input: {context}")]
    EmptyInput { context: String },

    #[error("Degenerate returns: no usable rows remain after dropping incomplete observations (columns without valid prices: {symbols:?})")]
    DegenerateReturns { symbols: Vec<String> },

    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Degenerate variance in {context}")]
    DegenerateVariance { context: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for PortfolioError {
    fn from(e: serde_json::Error) -> Self {
        PortfolioError::SerializationError(e.to_string())
    }
}
