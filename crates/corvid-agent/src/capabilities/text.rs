//! Text statistics capability.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use serde_json::{json, Value};

use corvid_core::session::SessionContext;
use corvid_core::types::{ArgMap, Descriptor, ParamSpec, ParamType};

use crate::capability::{require_str, Capability};
use crate::registry::CapabilityRegistry;

struct AnalyzeText;

#[async_trait]
impl Capability for AnalyzeText {
    async fn invoke(&self, args: ArgMap, _ctx: Option<&SessionContext>) -> anyhow::Result<Value> {
        let text = require_str(&args, "text")?;
        if text.is_empty() {
            bail!("Text is required");
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        let sentence_count = text
            .split(['.', '!', '?'])
            .filter(|s| !s.trim().is_empty())
            .count();
        let unique_words: HashSet<String> = words.iter().map(|w| w.to_lowercase()).collect();
        let total_word_len: usize = words.iter().map(|w| w.chars().count()).sum();
        let average_word_length =
            (total_word_len as f64 / words.len().max(1) as f64 * 100.0).round() / 100.0;

        Ok(json!({
            "character_count": text.chars().count(),
            "character_count_no_spaces": text.chars().filter(|c| *c != ' ').count(),
            "word_count": words.len(),
            "line_count": text.lines().count(),
            "sentence_count": sentence_count,
            "paragraph_count": text.split("\n\n").count(),
            "average_word_length": average_word_length,
            "unique_words": unique_words.len(),
        }))
    }
}

pub fn register(registry: &mut CapabilityRegistry) {
    registry.register(
        Descriptor::new(
            "analyze_text",
            "Analyze text to get statistics like word count, character count, sentence count, etc.",
        )
        .category("utility")
        .param(ParamSpec::required(
            "text",
            "The text to analyze",
            ParamType::Text,
        )),
        Arc::new(AnalyzeText),
    );
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
