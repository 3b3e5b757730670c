//! Capability trait — the interface every callable capability implements.
//!
//! A capability is registered together with its [`Descriptor`]; the
//! dispatcher validates and coerces arguments against the descriptor before
//! `invoke` runs, so implementations may assume declared types hold.

use async_trait::async_trait;
use serde_json::Value;

use corvid_core::session::SessionContext;
use corvid_core::types::ArgMap;

/// Implementation side of a capability.
///
/// `invoke` receives the coerced argument map and, when the descriptor
/// declares `needs_context`, the live session context (the dispatcher
/// guarantees it is `Some` in that case). Returning `Err` is safe: the
/// dispatcher converts it into a failure outcome instead of letting it
/// crash the loop.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Execute with validated arguments, producing the output value.
    async fn invoke(&self, args: ArgMap, ctx: Option<&SessionContext>) -> anyhow::Result<Value>;
}

// ─────────────────────────────────────────────
// Argument helpers
// ─────────────────────────────────────────────

/// Extract a string argument, erroring when absent or mistyped.
pub fn require_str<'a>(args: &'a ArgMap, key: &str) -> anyhow::Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing required parameter: {key}"))
}

/// Extract an optional string argument.
pub fn arg_str<'a>(args: &'a ArgMap, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

/// Extract an optional integer argument.
pub fn arg_i64(args: &ArgMap, key: &str) -> Option<i64> {
    args.get(key).and_then(|v| v.as_i64())
}

/// Extract an optional boolean argument (absent → `false`).
pub fn arg_bool(args: &ArgMap, key: &str) -> bool {
    args.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}
