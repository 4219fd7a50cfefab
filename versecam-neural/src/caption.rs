//! BLIP-2 image captioning over the Replicate predictions API.

use crate::{truncate_body, Captioner, ServiceError};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

/// Model version the deployment is pinned to.
const BLIP2_VERSION: &str = "4b32258c42e9efd4288bb9910bc532a69727f9acd26aa08e175713a0a857a608";

/// Direct HTTP client for Replicate's blocking prediction mode.
pub struct ReplicateCaptioner {
    http: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for ReplicateCaptioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicateCaptioner")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ReplicateCaptioner {
    pub fn new(token: &str) -> Self {
        Self::with_base_url("https://api.replicate.com/v1", token)
    }

    /// Point the client at a different endpoint (tests, mocks).
    pub fn with_base_url(base_url: &str, token: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }
}

#[async_trait]
impl Captioner for ReplicateCaptioner {
    async fn caption(&self, image: &[u8]) -> Result<String, ServiceError> {
        let url = format!("{}/predictions", self.base_url);
        let data_url = format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(image)
        );

        let body = json!({
            "version": BLIP2_VERSION,
            "input": {
                "image": data_url,
                "caption": true
            }
        });

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            // Hold the connection until the prediction resolves.
            .header("Prefer", "wait=30")
            .timeout(Duration::from_secs(30))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                status,
                body: truncate_body(&text),
            });
        }

        let parsed: Value =
            serde_json::from_str(&text).map_err(|e| ServiceError::Malformed(e.to_string()))?;

        // BLIP-2 answers with a plain string; some model versions stream
        // the caption as an array of fragments instead.
        let output = &parsed["output"];
        let caption = if let Some(s) = output.as_str() {
            s.trim().to_string()
        } else if let Some(parts) = output.as_array() {
            parts
                .iter()
                .filter_map(Value::as_str)
                .collect::<String>()
                .trim()
                .to_string()
        } else {
            return Err(ServiceError::Malformed(
                "prediction carried no output".to_string(),
            ));
        };

        info!(caption = %caption, "image captioned");
        Ok(caption)
    }
}
