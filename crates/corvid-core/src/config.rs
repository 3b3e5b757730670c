//! Configuration schema and loader.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case, converted via
//! `#[serde(rename_all = "camelCase")]`.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file, when a path is given and the file exists
//! 3. Environment variables `CORVID_*` (override JSON)

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ─────────────────────────────────────────────
// Schema
// ─────────────────────────────────────────────

/// Root configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub backend: BackendConfig,
    pub agent: AgentConfig,
}

/// Chat-backend (text generation endpoint) settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendConfig {
    /// Full URL of the generate endpoint.
    pub generate_url: String,
    /// Model identifier sent with each request.
    pub chat_model: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            generate_url: "http://localhost:11434/api/generate".to_string(),
            chat_model: "llama3.1".to_string(),
            request_timeout_secs: 120,
        }
    }
}

/// Tool-calling loop settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Maximum generate → dispatch rounds per user turn.
    pub max_rounds: usize,
    /// Maximum capability calls executed per round; overflow is dropped.
    pub max_calls_per_round: usize,
    /// Base system prompt (the capability catalogue is appended at runtime).
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            max_calls_per_round: 5,
            system_prompt: "You are a helpful chat assistant.".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Loader
// ─────────────────────────────────────────────

impl Config {
    /// Load configuration from an optional JSON file plus env overrides.
    ///
    /// A missing or unreadable file falls back to defaults — configuration
    /// problems are logged, never fatal.
    pub fn load(path: Option<&Path>) -> Config {
        let config = match path {
            Some(p) if p.exists() => Self::load_file(p),
            Some(p) => {
                info!("No config file found at {}, using defaults", p.display());
                Config::default()
            }
            None => Config::default(),
        };
        apply_env_overrides(config)
    }

    fn load_file(path: &Path) -> Config {
        debug!("Loading config from {}", path.display());
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                return Config::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to parse config JSON: {}", e);
                Config::default()
            }
        }
    }

    /// Save configuration to disk (pretty-printed JSON with camelCase keys).
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)?;
        debug!("Config saved to {}", path.display());
        Ok(())
    }
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Supported overrides:
/// - `CORVID_GENERATE_URL` → `backend.generate_url`
/// - `CORVID_CHAT_MODEL` → `backend.chat_model`
/// - `CORVID_MAX_ROUNDS` → `agent.max_rounds`
/// - `CORVID_MAX_CALLS_PER_ROUND` → `agent.max_calls_per_round`
/// - `CORVID_SYSTEM_PROMPT` → `agent.system_prompt`
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(url) = std::env::var("CORVID_GENERATE_URL") {
        config.backend.generate_url = url;
    }
    if let Ok(model) = std::env::var("CORVID_CHAT_MODEL") {
        config.backend.chat_model = model;
    }
    if let Ok(rounds) = std::env::var("CORVID_MAX_ROUNDS") {
        match rounds.parse() {
            Ok(n) => config.agent.max_rounds = n,
            Err(_) => warn!("Ignoring non-numeric CORVID_MAX_ROUNDS={rounds}"),
        }
    }
    if let Ok(cap) = std::env::var("CORVID_MAX_CALLS_PER_ROUND") {
        match cap.parse() {
            Ok(n) => config.agent.max_calls_per_round = n,
            Err(_) => warn!("Ignoring non-numeric CORVID_MAX_CALLS_PER_ROUND={cap}"),
        }
    }
    if let Ok(prompt) = std::env::var("CORVID_SYSTEM_PROMPT") {
        config.agent.system_prompt = prompt;
    }
    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
