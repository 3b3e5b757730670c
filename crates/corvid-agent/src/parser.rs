//! Call parser — extracts capability call requests from generated text.
//!
//! Two textual conventions are recognized, tried in priority order:
//!
//! 1. tagged: `<tool_call>{"name": ..., "arguments": {...}}</tool_call>`
//! 2. fenced: a ```` ```tool ```` code block containing the same object
//!
//! Parsing is best-effort by design: the model writes free-form text, so a
//! span whose body is not valid JSON is skipped with a warning rather than
//! failing the whole scan. `parse`, `has_calls` and `strip_calls` share the
//! same two compiled matchers so they can never disagree about what
//! constitutes a call span.

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use corvid_core::types::ArgMap;

/// A parsed capability invocation request, pre-validation.
#[derive(Clone, Debug)]
pub struct CallRequest {
    /// Capability name as written by the model.
    pub name: String,
    /// Raw argument mapping; validated and coerced at dispatch time.
    pub arguments: ArgMap,
    /// The literal span the request was parsed from, for diagnostics.
    pub raw: String,
}

// ─────────────────────────────────────────────
// Parser
// ─────────────────────────────────────────────

/// Span scanner over the two recognized call conventions.
pub struct CallParser {
    tagged: Regex,
    fenced: Regex,
}

impl CallParser {
    pub fn new() -> Self {
        Self {
            // Non-greedy object capture; (?s) so arguments may span lines.
            tagged: Regex::new(r"(?s)<tool_call>\s*(\{.*?\})\s*</tool_call>")
                .expect("invalid tagged call pattern"),
            fenced: Regex::new(r"(?s)```tool\s*\n(\{.*?\})\s*\n```")
                .expect("invalid fenced call pattern"),
        }
    }

    /// Parse all call requests from a block of generated text.
    ///
    /// The tagged convention wins: the fenced form is only consulted when no
    /// tagged span matched at all.
    pub fn parse(&self, text: &str) -> Vec<CallRequest> {
        let mut spans: Vec<(&str, &str)> = self
            .tagged
            .captures_iter(text)
            .map(|c| (c.get(0).unwrap().as_str(), c.get(1).unwrap().as_str()))
            .collect();
        if spans.is_empty() {
            spans = self
                .fenced
                .captures_iter(text)
                .map(|c| (c.get(0).unwrap().as_str(), c.get(1).unwrap().as_str()))
                .collect();
        }

        let mut calls = Vec::new();
        for (raw, body) in spans {
            match serde_json::from_str::<Value>(body) {
                Ok(value) => {
                    if let Some(call) = call_from_object(value, raw) {
                        calls.push(call);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "skipping malformed call span");
                }
            }
        }
        calls
    }

    /// Cheap existence check using the same span matchers as `parse`.
    pub fn has_calls(&self, text: &str) -> bool {
        self.tagged.is_match(text) || self.fenced.is_match(text)
    }

    /// Remove every recognized call span (both conventions) and trim.
    ///
    /// Idempotent: stripping already-stripped text is a no-op.
    pub fn strip_calls(&self, text: &str) -> String {
        let text = self.tagged.replace_all(text, "");
        let text = self.fenced.replace_all(&text, "");
        text.trim().to_string()
    }
}

impl Default for CallParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a `CallRequest` from a decoded span object.
///
/// Requires a string `"name"`; arguments come from `"arguments"` or the
/// historical alias `"params"`, defaulting to empty.
fn call_from_object(value: Value, raw: &str) -> Option<CallRequest> {
    let object = value.as_object()?;
    let name = object.get("name")?.as_str()?.to_string();

    let arguments = object
        .get("arguments")
        .or_else(|| object.get("params"))
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();

    Some(CallRequest {
        name,
        arguments,
        raw: raw.to_string(),
    })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
