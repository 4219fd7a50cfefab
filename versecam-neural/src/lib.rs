//! # Versecam Neural
//!
//! The remote collaborators of the poetry pipeline: image captioning and
//! poem generation. Both are plain HTTP clients behind small traits so
//! the orchestrator (and its tests) never care which service is on the
//! wire.

use async_trait::async_trait;

pub mod caption;
pub mod poet;
pub mod prompts;
pub mod retry;

pub use caption::ReplicateCaptioner;
pub use poet::DeepSeekPoet;

/// A remote call failed: network error, non-2xx status, or a response
/// body that did not carry the expected payload.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// The interface for any image-captioning backend.
#[async_trait]
pub trait Captioner: Send + Sync {
    async fn caption(&self, image: &[u8]) -> Result<String, ServiceError>;
}

/// The interface for any poem-generation backend.
#[async_trait]
pub trait Poet: Send + Sync {
    async fn generate(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, ServiceError>;
}

/// Error bodies can be huge HTML pages; keep just enough to diagnose.
pub(crate) fn truncate_body(body: &str) -> String {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}
