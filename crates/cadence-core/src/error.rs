use thiserror::Error;

/// Top-level error used at the daemon boundary, where outcomes become
/// failed `Response` envelopes tagged with a stable code.
#[derive(Debug, Error)]
pub enum CadenceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CadenceError {
    /// Short error code string included in failed `Response` messages.
    pub fn code(&self) -> &'static str {
        match self {
            CadenceError::Config(_) => "CONFIG_ERROR",
            CadenceError::Validation(_) => "VALIDATION_ERROR",
            CadenceError::NotFound(_) => "NOT_FOUND",
            CadenceError::Conflict(_) => "CONFLICT",
            CadenceError::Database(_) => "DATABASE_ERROR",
            CadenceError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, CadenceError>;
