//! Corvid Agent — the tool-calling orchestration core.
//!
//! This crate contains:
//! - **capability**: the `Capability` trait and argument helpers
//! - **registry**: process-wide capability store with schema export
//! - **parser**: extracts call requests from free-form generated text
//! - **dispatch**: validation, coercion, and execution of parsed calls
//! - **prompt**: capability catalogue + continuation prompt assembly
//! - **conversation**: the bounded generate → dispatch → reinject loop
//! - **capabilities**: built-in utility and messaging capabilities
//! - **admin**: thin read-only surface over the registry

pub mod admin;
pub mod capabilities;
pub mod capability;
pub mod conversation;
pub mod dispatch;
pub mod parser;
pub mod prompt;
pub mod registry;

pub use capabilities::{register_builtins, register_messaging};
pub use capability::Capability;
pub use conversation::ConversationLoop;
pub use dispatch::Dispatcher;
pub use parser::{CallParser, CallRequest};
pub use registry::{CapabilityRegistry, RegisteredCapability};
