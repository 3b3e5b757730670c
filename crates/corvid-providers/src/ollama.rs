//! Ollama `/api/generate` client.
//!
//! Prompt-completion style: one prompt string in, one text response out,
//! `stream: false`. Vision models accept base64-encoded images alongside
//! the prompt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use corvid_core::config::BackendConfig;

use crate::backend::{BackendError, ChatBackend};

/// Returned when the API answered but carried no `response` field.
pub const NO_ANSWER: &str = "No response from Ollama.";

// ─────────────────────────────────────────────
// Wire format
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

// ─────────────────────────────────────────────
// OllamaBackend
// ─────────────────────────────────────────────

/// HTTP client for an Ollama generate endpoint.
pub struct OllamaBackend {
    client: reqwest::Client,
    api_url: String,
    default_model: String,
}

impl OllamaBackend {
    /// Create a backend for a generate endpoint URL.
    pub fn new(api_url: impl Into<String>, default_model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");
        OllamaBackend {
            client,
            api_url: api_url.into(),
            default_model: default_model.into(),
        }
    }

    /// Create a backend from the loaded configuration.
    pub fn from_config(config: &BackendConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("Failed to build HTTP client");
        OllamaBackend {
            client,
            api_url: config.generate_url.clone(),
            default_model: config.chat_model.clone(),
        }
    }
}

impl std::fmt::Debug for OllamaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaBackend")
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        images: &[String],
    ) -> Result<String, BackendError> {
        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
            images: if images.is_empty() {
                None
            } else {
                Some(images)
            },
        };

        debug!(
            model = model,
            prompt_len = prompt.len(),
            images = images.len(),
            "calling generate endpoint"
        );

        let response = self.client.post(&self.api_url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(status = %status, body = %body, "generate request rejected");
            return Err(BackendError::Status { status, body });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        match parsed.response {
            Some(text) => {
                debug!(response_len = text.len(), "generate response received");
                Ok(text)
            }
            None => Ok(NO_ANSWER.to_string()),
        }
    }

    fn no_answer_sentinel(&self) -> &str {
        NO_ANSWER
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn display_name(&self) -> &str {
        "Ollama"
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
