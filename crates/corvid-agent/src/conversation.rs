//! Conversation loop controller — the bounded generate → dispatch cycle.
//!
//! One loop instance handles one user turn: the caller hands over the first
//! generated text, the prior conversation, and an optional session context.
//! Each round dispatches the calls found in the current text, feeds the
//! outcomes back through a continuation prompt, and regenerates — until the
//! model stops requesting capabilities, the backend runs dry, or the round
//! cap is hit. Whatever happens, the returned text never contains a call
//! span and is never empty when the model produced content.

use std::sync::Arc;

use tracing::{debug, info};

use corvid_core::session::SessionContext;
use corvid_core::types::Turn;
use corvid_providers::backend::ChatBackend;

use crate::dispatch::Dispatcher;
use crate::prompt::{capability_addendum, PromptAssembler, TranscriptAssembler};

/// Default maximum generate → dispatch rounds per user turn.
pub const DEFAULT_MAX_ROUNDS: usize = 3;

// ─────────────────────────────────────────────
// ConversationLoop
// ─────────────────────────────────────────────

/// Drives repeated rounds of generation and capability dispatch.
///
/// Holds no state across turns; callers must not run two loops over the same
/// conversation history concurrently.
pub struct ConversationLoop {
    backend: Arc<dyn ChatBackend>,
    dispatcher: Dispatcher,
    assembler: Box<dyn PromptAssembler>,
    system_prompt: String,
    model: String,
    max_rounds: usize,
}

impl ConversationLoop {
    /// Create a loop over a backend and a populated dispatcher.
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        dispatcher: Dispatcher,
        system_prompt: impl Into<String>,
    ) -> Self {
        let model = backend.default_model().to_string();
        Self {
            backend,
            dispatcher,
            assembler: Box::new(TranscriptAssembler),
            system_prompt: system_prompt.into(),
            model,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Override the model identifier sent to the backend.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the round cap.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Swap in a different prompt-assembly strategy.
    pub fn with_assembler(mut self, assembler: Box<dyn PromptAssembler>) -> Self {
        self.assembler = assembler;
        self
    }

    /// The dispatcher this loop executes calls through.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Process a full user turn: generate the first response, then resolve
    /// any capability calls it makes.
    pub async fn respond(
        &self,
        user_text: &str,
        history: &[Turn],
        ctx: Option<&SessionContext>,
    ) -> anyhow::Result<String> {
        let system = self.system_with_catalogue();
        let prompt = self.assembler.initial(&system, history, user_text);
        let first = self.backend.generate(&prompt, &self.model, &[]).await?;
        if first == self.backend.no_answer_sentinel() {
            return Ok(first);
        }
        self.run(&first, history, ctx).await
    }

    /// Resolve capability calls in already-generated text.
    ///
    /// This is the loop proper; `respond` is a convenience wrapper that also
    /// produces the first text.
    pub async fn run(
        &self,
        first_text: &str,
        history: &[Turn],
        ctx: Option<&SessionContext>,
    ) -> anyhow::Result<String> {
        let system = self.system_with_catalogue();
        let mut text = first_text.to_string();
        // Best text seen so far, for degenerate backend termination.
        let mut last_clean: Option<String> = None;

        for round in 0..self.max_rounds {
            let (outcomes, cleaned) = self.dispatcher.dispatch_all(&text, ctx).await;

            if outcomes.is_empty() {
                // No executable calls. `cleaned` can still differ from `text`
                // when every span was malformed; fall back to the original
                // rather than returning an empty message.
                return Ok(if cleaned.is_empty() { text } else { cleaned });
            }

            info!(
                round = round,
                calls = outcomes.len(),
                "executed capability calls"
            );
            if !cleaned.is_empty() {
                last_clean = Some(cleaned);
            }

            let results = self.dispatcher.format_for_model(&outcomes);
            let prompt = self
                .assembler
                .continuation(&system, history, &text, &results);

            debug!(round = round, prompt_len = prompt.len(), "regenerating");
            let next = self.backend.generate(&prompt, &self.model, &[]).await?;

            if next == self.backend.no_answer_sentinel() {
                info!(round = round, "backend returned no-answer sentinel");
                return Ok(last_clean.unwrap_or(next));
            }
            text = next;
        }

        // Round cap reached: an unresolved call span must never leak to the
        // user, so strip whatever the last response still contains. When
        // stripping leaves nothing, fall back to the best earlier text
        // rather than the raw markup.
        let cleaned = self.dispatcher.strip_calls(&text);
        if cleaned.is_empty() {
            Ok(last_clean.unwrap_or(cleaned))
        } else {
            Ok(cleaned)
        }
    }

    fn system_with_catalogue(&self) -> String {
        format!(
            "{}{}",
            self.system_prompt,
            capability_addendum(self.dispatcher.registry())
        )
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use corvid_core::types::{ArgMap, Descriptor, ParamSpec, ParamType};
    use corvid_providers::backend::BackendError;

    use crate::capability::Capability;
    use crate::registry::CapabilityRegistry;

    const SENTINEL: &str = "No response from Ollama.";

    /// Backend double that replays canned responses and records prompts.
    struct ScriptedBackend {
        responses: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl ScriptedBackend {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(&[])
            }
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn generate(
            &self,
            prompt: &str,
            _model: &str,
            _images: &[String],
        ) -> Result<String, BackendError> {
            if self.fail {
                return Err(BackendError::Decode("connection reset".into()));
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(SENTINEL.to_string())
            } else {
                Ok(responses.remove(0))
            }
        }

        fn no_answer_sentinel(&self) -> &str {
            SENTINEL
        }

        fn default_model(&self) -> &str {
            "test-model"
        }

        fn display_name(&self) -> &str {
            "Scripted"
        }
    }

    struct DateCapability;

    #[async_trait]
    impl Capability for DateCapability {
        async fn invoke(
            &self,
            _args: ArgMap,
            _ctx: Option<&SessionContext>,
        ) -> anyhow::Result<Value> {
            Ok(json!("2024-06-01"))
        }
    }

    fn test_registry() -> Arc<CapabilityRegistry> {
        let mut registry = CapabilityRegistry::new();
        registry.register(
            Descriptor::new("get_current_time", "Get the current date and time").param(
                ParamSpec::optional("format", "Output format", ParamType::Text)
                    .with_default(json!("full"))
                    .with_allowed(&["full", "date", "time", "unix"]),
            ),
            Arc::new(DateCapability),
        );
        registry.register(
            Descriptor::new("delete_message", "Delete a message by ID")
                .category("messaging")
                .needs_context()
                .param(ParamSpec::required(
                    "message_id",
                    "ID of the message to delete",
                    ParamType::Text,
                )),
            Arc::new(DateCapability),
        );
        Arc::new(registry)
    }

    fn loop_over(backend: Arc<ScriptedBackend>) -> ConversationLoop {
        ConversationLoop::new(
            backend,
            Dispatcher::new(test_registry()),
            "You are a helpful chat assistant.",
        )
    }

    #[tokio::test]
    async fn test_no_calls_returns_immediately() {
        let backend = Arc::new(ScriptedBackend::new(&[]));
        let conv = loop_over(backend.clone());

        let result = conv.run("Just a plain answer.", &[], None).await.unwrap();
        assert_eq!(result, "Just a plain answer.");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_single_call_round_trip() {
        let backend = Arc::new(ScriptedBackend::new(&["Today is 2024-06-01."]));
        let conv = loop_over(backend.clone());

        let text = r#"Let me check. <tool_call>{"name":"get_current_time","arguments":{"format":"date"}}</tool_call>"#;
        let result = conv.run(text, &[], None).await.unwrap();
        assert_eq!(result, "Today is 2024-06-01.");

        // The continuation prompt carried the outcome block and the spans.
        let prompts = backend.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Tool Results:"));
        assert!(prompts[0].contains("[1] Success: "));
        assert!(prompts[0].contains("<tool_call>"));
        assert!(prompts[0].contains("## Tools"));
    }

    #[tokio::test]
    async fn test_failure_outcome_keeps_loop_alive() {
        let backend = Arc::new(ScriptedBackend::new(&["I could not delete that message."]));
        let conv = loop_over(backend.clone());

        // Context-requiring capability dispatched without a context
        let text = r#"<tool_call>{"name":"delete_message","arguments":{"message_id":"9"}}</tool_call>"#;
        let result = conv.run(text, &[], None).await.unwrap();
        assert_eq!(result, "I could not delete that message.");

        let prompts = backend.prompts.lock().unwrap();
        assert!(prompts[0].contains("[1] Failed: Capability delete_message requires session context"));
    }

    #[tokio::test]
    async fn test_round_cap_bounds_generation_and_strips_final_text() {
        let span = r#"<tool_call>{"name":"get_current_time"}</tool_call>"#;
        let with_call = format!("Still checking. {span}");
        let backend = Arc::new(ScriptedBackend::new(&[
            with_call.as_str(),
            with_call.as_str(),
            with_call.as_str(),
        ]));
        let conv = loop_over(backend.clone()).with_max_rounds(3);

        let result = conv.run(&with_call, &[], None).await.unwrap();
        // Never more than max_rounds generations
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        // The unresolved span never leaks
        assert!(!result.contains("tool_call"));
        assert_eq!(result, "Still checking.");
    }

    #[tokio::test]
    async fn test_round_cap_span_only_final_text_never_leaks_markup() {
        // The model emits nothing but a bare call span, every round.
        let span = r#"<tool_call>{"name":"get_current_time"}</tool_call>"#;
        let backend = Arc::new(ScriptedBackend::new(&[span, span, span]));
        let conv = loop_over(backend.clone()).with_max_rounds(3);

        let result = conv.run(span, &[], None).await.unwrap();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert!(!result.contains("tool_call"), "leaked markup: {result:?}");
        // No prose was ever produced, so there is nothing to return.
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_round_cap_span_only_final_falls_back_to_earlier_text() {
        let span = r#"<tool_call>{"name":"get_current_time"}</tool_call>"#;
        let first = format!("Checking. {span}");
        let backend = Arc::new(ScriptedBackend::new(&[span, span, span]));
        let conv = loop_over(backend).with_max_rounds(3);

        // The first round produced prose; the exhaustion exit keeps it.
        let result = conv.run(&first, &[], None).await.unwrap();
        assert_eq!(result, "Checking.");
    }

    #[tokio::test]
    async fn test_sentinel_terminates_with_best_effort_text() {
        // Backend runs dry right after the first dispatch round.
        let backend = Arc::new(ScriptedBackend::new(&[]));
        let conv = loop_over(backend.clone());

        let text = r#"Looking it up. <tool_call>{"name":"get_current_time"}</tool_call>"#;
        let result = conv.run(text, &[], None).await.unwrap();
        assert_eq!(result, "Looking it up.");
    }

    #[tokio::test]
    async fn test_sentinel_with_no_prior_text_returns_sentinel() {
        let backend = Arc::new(ScriptedBackend::new(&[]));
        let conv = loop_over(backend.clone());

        // The whole first text is one span, so stripping leaves nothing.
        let text = r#"<tool_call>{"name":"get_current_time"}</tool_call>"#;
        let result = conv.run(text, &[], None).await.unwrap();
        assert_eq!(result, SENTINEL);
    }

    #[tokio::test]
    async fn test_malformed_only_spans_fall_back_to_original_text() {
        let backend = Arc::new(ScriptedBackend::new(&[]));
        let conv = loop_over(backend.clone());

        let text = "<tool_call>{broken</tool_call>";
        let result = conv.run(text, &[], None).await.unwrap();
        // No executable call and stripping leaves nothing → original text
        assert_eq!(result, text);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backend_transport_error_propagates() {
        let backend = Arc::new(ScriptedBackend::failing());
        let conv = loop_over(backend);

        let text = r#"<tool_call>{"name":"get_current_time"}</tool_call>"#;
        assert!(conv.run(text, &[], None).await.is_err());
    }

    #[tokio::test]
    async fn test_respond_generates_then_resolves() {
        let span = r#"<tool_call>{"name":"get_current_time","arguments":{"format":"date"}}</tool_call>"#;
        let first = format!("Checking. {span}");
        let backend = Arc::new(ScriptedBackend::new(&[first.as_str(), "It is 2024-06-01."]));
        let conv = loop_over(backend.clone());

        let history = vec![Turn::user("alice", "hi"), Turn::assistant("hello!")];
        let result = conv.respond("what's the date?", &history, None).await.unwrap();
        assert_eq!(result, "It is 2024-06-01.");

        let prompts = backend.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("User (alice): hi"));
        assert!(prompts[0].ends_with("User: what's the date?\nAssistant: "));
    }

    #[tokio::test]
    async fn test_respond_passes_sentinel_through() {
        let backend = Arc::new(ScriptedBackend::new(&[]));
        let conv = loop_over(backend);
        let result = conv.respond("hello?", &[], None).await.unwrap();
        assert_eq!(result, SENTINEL);
    }
}
