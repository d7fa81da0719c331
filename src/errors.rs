use thiserror::Error;

/// Error types for loading feature records and ranking similar sounds
#[derive(Error, Debug)]
pub enum SimilarityError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unknown metric: {metric} (no such column in the feature table)")]
    UnknownMetric { metric: String },

    #[error("Invalid row for {id}: null value in column {column}")]
    InvalidRow { id: String, column: String },

    #[error("Item not found: {id}")]
    NotFound { id: String },

    #[error("Vector dimension mismatch: reference has {query_dim} values, candidate has {target_dim}")]
    DimensionMismatch { query_dim: usize, target_dim: usize },

    #[error("Path is not a directory: {path}")]
    NotADirectory { path: String },

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },
}

impl SimilarityError {
    /// Create a user-friendly error message for the command line
    pub fn user_message(&self) -> String {
        match self {
            SimilarityError::Config { message } => {
                format!("The distance configuration is invalid: {}", message)
            }
            SimilarityError::UnknownMetric { metric } => {
                format!("The metric '{}' doesn't exist in the data.", metric)
            }
            SimilarityError::InvalidRow { id, column } => {
                format!("The sound '{}' has no value for '{}' and cannot be compared.", id, column)
            }
            SimilarityError::NotFound { id } => {
                format!("The sound '{}' could not be found in the analysed data.", id)
            }
            SimilarityError::DimensionMismatch { query_dim, target_dim } => {
                format!("Cannot compare {} features against {} features.", query_dim, target_dim)
            }
            SimilarityError::NotADirectory { path } => {
                format!("'{}' is not a directory. The data path must be a directory.", path)
            }
            SimilarityError::Io { message } => {
                format!("File operation failed: {}", message)
            }
            SimilarityError::Parse { path, message } => {
                format!("Unable to parse '{}': {}", path, message)
            }
        }
    }

    /// Errors that only concern the current primary item; the run may go on
    pub fn is_row_local(&self) -> bool {
        matches!(self, SimilarityError::InvalidRow { .. })
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        SimilarityError::Config { message: message.into() }
    }
}

/// Convert std::io::Error to SimilarityError without path context
impl From<std::io::Error> for SimilarityError {
    fn from(error: std::io::Error) -> Self {
        SimilarityError::Io {
            message: error.to_string(),
        }
    }
}

/// Helper trait to add context to IO errors
pub trait IOErrorContext<T> {
    fn with_path_context(self, path: &str, operation: &str) -> SimilarityResult<T>;
}

impl<T> IOErrorContext<T> for Result<T, std::io::Error> {
    fn with_path_context(self, path: &str, operation: &str) -> SimilarityResult<T> {
        self.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SimilarityError::Io {
                message: format!("Failed to {} '{}': file not found", operation, path),
            },
            std::io::ErrorKind::PermissionDenied => SimilarityError::Io {
                message: format!("Failed to {} '{}': permission denied", operation, path),
            },
            _ => SimilarityError::Io {
                message: format!("Failed to {} '{}': {}", operation, path, e),
            },
        })
    }
}

/// Result type alias for loading and similarity operations
pub type SimilarityResult<T> = Result<T, SimilarityError>;
