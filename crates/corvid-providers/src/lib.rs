//! Chat backend layer for Corvid.
//!
//! The tool-calling loop treats text generation as an external collaborator:
//! it hands over a prompt and gets free-form text back. This crate defines
//! that seam ([`backend::ChatBackend`]) and ships the one concrete client
//! the bot uses in production, an Ollama `/api/generate` HTTP client.

pub mod backend;
pub mod ollama;

pub use backend::{BackendError, ChatBackend};
pub use ollama::OllamaBackend;
