use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::publisher::{OutboundPost, PublishError, PublishReceipt, Publisher};

/// Delivers posts for one channel to a webhook endpoint as JSON.
///
/// The endpoint may reply with `{"id": "..."}` to report a platform-native
/// identifier; any other success body is accepted.
pub struct WebhookPublisher {
    name: String,
    url: String,
    token: Option<String>,
    client: reqwest::Client,
    timeout_ms: u64,
}

impl WebhookPublisher {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        token: Option<String>,
        timeout_ms: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            name: name.into(),
            url: url.into(),
            token,
            client,
            timeout_ms,
        }
    }
}

#[async_trait]
impl Publisher for WebhookPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, post: &OutboundPost) -> Result<PublishReceipt, PublishError> {
        debug!(channel = %self.name, event_id = %post.event_id, "delivering post");

        let mut builder = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .json(post);
        if let Some(ref token) = self.token {
            builder = builder.bearer_auth(token);
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                PublishError::Timeout {
                    ms: self.timeout_ms,
                }
            } else {
                PublishError::SendFailed(e.to_string())
            }
        })?;

        let status = resp.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(PublishError::AuthFailed(format!(
                "endpoint returned {}",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(channel = %self.name, status = status.as_u16(), body = %text, "publish rejected");
            return Err(PublishError::Rejected(format!(
                "status {}: {}",
                status.as_u16(),
                text
            )));
        }

        let remote_id = resp
            .json::<ReceiptBody>()
            .await
            .ok()
            .and_then(|b| b.id);

        Ok(PublishReceipt {
            channel: self.name.clone(),
            remote_id,
        })
    }
}

// Wire response type (private — deserialization only)

#[derive(Deserialize)]
struct ReceiptBody {
    id: Option<String>,
}
