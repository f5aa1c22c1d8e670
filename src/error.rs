use thiserror::Error;

/// Main error type for docindex operations
#[derive(Error, Debug)]
pub enum DocIndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed index data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Index wrapper not closed: expected `)` after `{prefix}`")]
    UnterminatedWrapper { prefix: &'static str },

    #[error("Index failed validation with {count} violation(s)")]
    InvalidIndex { count: usize },

    #[error("Unknown document: {0}")]
    UnknownDocument(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("HTML rewrite failed: {0}")]
    Rewrite(String),

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),
}

/// Result type alias for docindex operations
pub type Result<T> = std::result::Result<T, DocIndexError>;

impl DocIndexError {
    /// Errors caused by the input data rather than the environment
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            DocIndexError::Json(_)
                | DocIndexError::UnterminatedWrapper { .. }
                | DocIndexError::InvalidIndex { .. }
                | DocIndexError::UnknownDocument(_)
                | DocIndexError::Manifest(_)
        )
    }
}
