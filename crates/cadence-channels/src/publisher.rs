use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use cadence_core::{CampaignId, EventId};

/// A post to be delivered to one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundPost {
    pub campaign_id: CampaignId,
    pub event_id: EventId,
    /// Logical channel name (e.g. "mastodon", "linkedin").
    pub channel: String,
    /// Content to deliver.
    pub body: String,
    /// Media references attached to the post.
    pub medias: Vec<String>,
}

/// Acknowledgement from a channel after a successful delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub channel: String,
    /// Platform-native identifier of the published item, if the endpoint
    /// reports one.
    pub remote_id: Option<String>,
}

/// Common interface implemented by every publish adapter.
///
/// `publish` takes `&self` so one adapter can deliver to its channel from
/// multiple Tokio tasks concurrently.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Stable lowercase identifier for this channel. Used as the registry
    /// key and matched against `Campaign::channels`.
    fn name(&self) -> &str;

    /// Deliver a single post to the channel.
    async fn publish(&self, post: &OutboundPost) -> Result<PublishReceipt, PublishError>;
}

/// Errors that can occur within any publish adapter.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The channel rejected the supplied credentials or token.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// The channel refused the post itself (policy, size, duplicate, …).
    #[error("Channel rejected post: {0}")]
    Rejected(String),

    /// The post could not be delivered to the remote endpoint.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Delivery exceeded its allowed time budget.
    #[error("Operation timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The channel-specific configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
