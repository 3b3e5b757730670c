//! Prompt assembly — the capability catalogue and the continuation prompt.
//!
//! Assembly is a trait seam so prompt-growth policy (truncation, history
//! summarization) can change without touching the loop state machine. The
//! default [`TranscriptAssembler`] re-embeds the full prior conversation
//! every round, matching the bot's transcript-style backend.

use corvid_core::types::{Turn, TurnRole};

use crate::registry::CapabilityRegistry;

/// Directive appended after the outcome block in a continuation prompt.
const CONTINUE_DIRECTIVE: &str =
    "Continue your response based on the tool results above. Do not repeat the tool calls.";

// ─────────────────────────────────────────────
// Capability catalogue
// ─────────────────────────────────────────────

/// Build the system-prompt addendum advertising every registered capability.
///
/// Empty when no capabilities are registered, so a tool-less deployment
/// never mentions tools to the model.
pub fn capability_addendum(registry: &CapabilityRegistry) -> String {
    let entries = registry.list_all();
    if entries.is_empty() {
        return String::new();
    }

    let mut lines = vec![
        "\n\n## Tools".to_string(),
        "You have access to the following tools. To use a tool, include a tool call in your response using this format:".to_string(),
        r#"<tool_call>{"name": "tool_name", "arguments": {"param1": "value1"}}</tool_call>"#.to_string(),
        String::new(),
        "You can call multiple tools in one response if needed. After tool results are returned, continue your response.".to_string(),
        String::new(),
        "Available tools:".to_string(),
    ];

    for entry in entries {
        let d = &entry.descriptor;
        lines.push(format!("\n### {}", d.name));
        lines.push(d.description.clone());
        if !d.params.is_empty() {
            lines.push("Parameters:".to_string());
            for p in &d.params {
                let req = if p.required { "required" } else { "optional" };
                lines.push(format!(
                    "    - {} ({}, {}): {}",
                    p.name,
                    p.kind.schema_type(),
                    req,
                    p.description
                ));
            }
        }
    }

    lines.join("\n")
}

// ─────────────────────────────────────────────
// Prompt assembler
// ─────────────────────────────────────────────

/// Builds the prompts submitted to the chat backend.
pub trait PromptAssembler: Send + Sync {
    /// Prompt for the first generation of a turn.
    fn initial(&self, system: &str, history: &[Turn], user_text: &str) -> String;

    /// Continuation prompt after a round of capability execution:
    /// system + prior turns + the assistant's text (spans included, for
    /// self-consistency) + the outcome block + a continue directive.
    fn continuation(
        &self,
        system: &str,
        history: &[Turn],
        assistant_text: &str,
        results_block: &str,
    ) -> String;
}

/// Transcript-style assembler: `System:` / `User (name):` / `Assistant:` lines.
pub struct TranscriptAssembler;

impl TranscriptAssembler {
    fn render_turns(out: &mut String, history: &[Turn]) {
        for turn in history {
            match turn.role {
                TurnRole::User => {
                    let name = turn
                        .name
                        .as_deref()
                        .map(|n| format!(" ({n})"))
                        .unwrap_or_default();
                    out.push_str(&format!("User{name}: {}\n", turn.content));
                }
                TurnRole::Assistant => {
                    out.push_str(&format!("Assistant: {}\n", turn.content));
                }
            }
        }
    }
}

impl PromptAssembler for TranscriptAssembler {
    fn initial(&self, system: &str, history: &[Turn], user_text: &str) -> String {
        let mut prompt = format!("System: {system}\n");
        Self::render_turns(&mut prompt, history);
        prompt.push_str(&format!("User: {user_text}\n"));
        prompt.push_str("Assistant: ");
        prompt
    }

    fn continuation(
        &self,
        system: &str,
        history: &[Turn],
        assistant_text: &str,
        results_block: &str,
    ) -> String {
        let mut prompt = format!("System: {system}\n");
        Self::render_turns(&mut prompt, history);
        prompt.push_str(&format!("Assistant: {assistant_text}\n"));
        prompt.push_str(&format!("{results_block}\n"));
        prompt.push_str(&format!("{CONTINUE_DIRECTIVE}\n"));
        prompt.push_str("Assistant: ");
        prompt
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;

    use corvid_core::session::SessionContext;
    use corvid_core::types::{ArgMap, Descriptor, ParamSpec, ParamType};

    use crate::capability::Capability;

    struct Noop;

    #[async_trait]
    impl Capability for Noop {
        async fn invoke(
            &self,
            _args: ArgMap,
            _ctx: Option<&SessionContext>,
        ) -> anyhow::Result<Value> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_addendum_empty_registry() {
        let registry = CapabilityRegistry::new();
        assert_eq!(capability_addendum(&registry), "");
    }

    #[test]
    fn test_addendum_lists_capabilities_and_parameters() {
        let mut registry = CapabilityRegistry::new();
        registry.register(
            Descriptor::new("get_current_time", "Get the current date and time").param(
                ParamSpec::optional("format", "Output format", ParamType::Text),
            ),
            Arc::new(Noop),
        );

        let addendum = capability_addendum(&registry);
        assert!(addendum.contains("## Tools"));
        assert!(addendum.contains("<tool_call>"));
        assert!(addendum.contains("### get_current_time"));
        assert!(addendum.contains("- format (string, optional): Output format"));
    }

    #[test]
    fn test_initial_prompt_shape() {
        let history = vec![
            Turn::user("alice", "what time is it?"),
            Turn::assistant("Let me check."),
        ];
        let prompt = TranscriptAssembler.initial("Be helpful.", &history, "and the date?");
        assert!(prompt.starts_with("System: Be helpful.\n"));
        assert!(prompt.contains("User (alice): what time is it?\n"));
        assert!(prompt.contains("Assistant: Let me check.\n"));
        assert!(prompt.ends_with("User: and the date?\nAssistant: "));
    }

    #[test]
    fn test_continuation_prompt_keeps_spans_and_results() {
        let history = vec![Turn::user("bob", "roll for me")];
        let assistant = r#"Rolling. <tool_call>{"name": "roll_dice"}</tool_call>"#;
        let results = "Tool Results:\n[1] Success: 7";

        let prompt =
            TranscriptAssembler.continuation("Be helpful.", &history, assistant, results);
        assert!(prompt.contains("User (bob): roll for me\n"));
        // The raw span stays visible to the model for self-consistency
        assert!(prompt.contains(r#"<tool_call>{"name": "roll_dice"}</tool_call>"#));
        assert!(prompt.contains("Tool Results:\n[1] Success: 7"));
        assert!(prompt.contains(CONTINUE_DIRECTIVE));
        assert!(prompt.ends_with("Assistant: "));
    }
}
