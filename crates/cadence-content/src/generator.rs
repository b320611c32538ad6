use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use cadence_core::{CampaignId, EventId};

/// Context handed to the generation service for one calendar event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub campaign_id: CampaignId,
    pub event_id: EventId,
    /// Campaign theme — the main steering input for the generated copy.
    pub theme: String,
    /// Ordered media references the post should reference.
    pub medias: Vec<String>,
    /// Date the occurrence goes live.
    pub event_date: NaiveDate,
}

/// Content returned by the generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub body: String,
}

/// Common interface for content-generation backends.
///
/// Implementations must be `Send + Sync` so a single generator can be shared
/// by the background manager and on-demand callers.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generator name for logging and error messages.
    fn name(&self) -> &str;

    /// Produce content for one event. Slow calls are bounded by the caller's
    /// timeout; implementations should still set their own transport timeout.
    async fn generate(&self, req: &GenerateRequest) -> Result<GeneratedContent, GeneratorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("provider error: {0}")]
    Provider(String),
}
