//! ChatBackend trait — the text-generation seam the loop controller drives.

use async_trait::async_trait;
use thiserror::Error;

/// Transport-level failure talking to a chat backend.
///
/// These are the only errors allowed to escape the conversation loop;
/// everything else the loop converts to outcomes or early termination.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("backend returned an unreadable response: {0}")]
    Decode(String),
}

/// Trait every text-generation backend implements.
///
/// The backend accepts a fully assembled prompt string (plus optional
/// base64-encoded images for multimodal models) and returns generated text.
/// A backend that produced no answer returns its sentinel string rather than
/// an error; the loop controller checks for it by exact match.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Generate text for a prompt.
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        images: &[String],
    ) -> Result<String, BackendError>;

    /// The exact string this backend returns when it produced no answer.
    fn no_answer_sentinel(&self) -> &str;

    /// Default model for this backend instance.
    fn default_model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
