use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store-layer errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("resource {0} does not exist")]
    NotExistent(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Taxonomy code reported across the public boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotExistent(_) => "NOT_EXISTENT",
            StoreError::Serialization(_) | StoreError::Backend(_) => "STORE_BACKEND_FAILURE",
        }
    }

    pub fn is_not_existent(&self) -> bool {
        matches!(self, StoreError::NotExistent(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
