//! Error types for Depot

/// Main error type for Depot operations
#[derive(Debug, thiserror::Error)]
pub enum DepotError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Filesystem error: {0}")]
    Filesystem(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

// Implement From conversions for common error types

impl From<std::io::Error> for DepotError {
    fn from(err: std::io::Error) -> Self {
        Self::Filesystem(err.to_string())
    }
}

impl From<serde_json::Error> for DepotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {}", err))
    }
}

impl From<mongodb::error::Error> for DepotError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for DepotError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Database(format!("BSON encode error: {}", err))
    }
}

/// Result type alias for Depot operations
pub type Result<T> = std::result::Result<T, DepotError>;
