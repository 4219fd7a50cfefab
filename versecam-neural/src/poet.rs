//! Poem generation over an OpenAI-compatible chat completions API.

use crate::{truncate_body, Poet, ServiceError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

/// Direct HTTP client for the DeepSeek chat completions endpoint.
pub struct DeepSeekPoet {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for DeepSeekPoet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepSeekPoet")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl DeepSeekPoet {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url("https://api.deepseek.com/v1", api_key, "deepseek-chat")
    }

    /// Point the client at a different endpoint or model (tests, local
    /// OpenAI-compatible servers).
    pub fn with_base_url(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// Send a chat completion request and return the content string.
    async fn chat(&self, messages: Vec<Value>) -> Result<String, ServiceError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = json!({
            "model": self.model,
            "messages": messages,
            "stream": false
        });

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
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

        let content = parsed["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ServiceError::Malformed("completion carried no content".to_string()))?
            .trim()
            .to_string();

        Ok(content)
    }
}

#[async_trait]
impl Poet for DeepSeekPoet {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ServiceError> {
        let messages = vec![
            json!({
                "role": "system",
                "content": system_prompt
            }),
            json!({
                "role": "user",
                "content": user_prompt
            }),
        ];

        let poem = self.chat(messages).await?;
        info!(lines = poem.lines().count(), "poem generated");
        Ok(poem)
    }
}
