use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::generator::{ContentGenerator, GeneratedContent, GenerateRequest, GeneratorError};

/// JSON bridge to an HTTP generation service.
///
/// POSTs the [`GenerateRequest`] to `{base_url}/generate` and expects
/// `{"content": "..."}` back.
pub struct HttpGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout_ms: u64,
}

impl HttpGenerator {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            api_key,
            timeout_ms,
        }
    }
}

#[async_trait]
impl ContentGenerator for HttpGenerator {
    fn name(&self) -> &str {
        "http"
    }

    async fn generate(&self, req: &GenerateRequest) -> Result<GeneratedContent, GeneratorError> {
        let url = format!("{}/generate", self.base_url);

        debug!(event_id = %req.event_id, theme = %req.theme, "requesting content generation");

        let mut builder = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(req);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                GeneratorError::Timeout {
                    ms: self.timeout_ms,
                }
            } else {
                GeneratorError::Http(e)
            }
        })?;

        let status = resp.status();
        if status.as_u16() == 429 {
            let retry_after_ms = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(0);
            return Err(GeneratorError::RateLimited { retry_after_ms });
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %text, "generation API error");
            return Err(GeneratorError::Provider(format!(
                "status {}: {}",
                status.as_u16(),
                text
            )));
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .map_err(|e| GeneratorError::Provider(format!("bad response body: {e}")))?;

        Ok(GeneratedContent {
            body: api_resp.content,
        })
    }
}

// Wire response type (private — deserialization only)

#[derive(Deserialize)]
struct ApiResponse {
    content: String,
}
