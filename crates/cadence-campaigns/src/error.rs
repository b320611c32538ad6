use thiserror::Error;

/// Errors that can occur in the campaign store and recurrence engine.
#[derive(Debug, Error)]
pub enum CampaignError {
    /// The campaign or its recurrence rule is malformed. Raised before any
    /// occurrence is produced or any row is written.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No campaign with the given ID exists in the store.
    #[error("Campaign not found: {id}")]
    CampaignNotFound { id: String },

    /// No event with the given ID exists in the store.
    #[error("Event not found: {id}")]
    EventNotFound { id: String },

    /// No post matches the given campaign/event selector.
    #[error("Post not found: {key}")]
    PostNotFound { key: String },

    /// A concurrent writer held the database (SQLITE_BUSY / SQLITE_LOCKED).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other underlying SQLite error.
    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    /// A JSON column (recurrence, channels, medias) failed to round-trip.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<CampaignError> for cadence_core::CadenceError {
    fn from(e: CampaignError) -> Self {
        use cadence_core::CadenceError;
        match e {
            CampaignError::Validation(m) => CadenceError::Validation(m),
            CampaignError::CampaignNotFound { .. }
            | CampaignError::EventNotFound { .. }
            | CampaignError::PostNotFound { .. } => CadenceError::NotFound(e.to_string()),
            CampaignError::Conflict(m) => CadenceError::Conflict(m),
            CampaignError::Database(err) => CadenceError::Database(err.to_string()),
            CampaignError::Serialization(err) => CadenceError::Serialization(err),
        }
    }
}

impl From<rusqlite::Error> for CampaignError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(err, _) = &e {
            if matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ) {
                return CampaignError::Conflict(e.to_string());
            }
        }
        CampaignError::Database(e)
    }
}

pub type Result<T> = std::result::Result<T, CampaignError>;
