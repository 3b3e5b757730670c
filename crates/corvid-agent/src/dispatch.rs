//! Call validation and dispatch.
//!
//! The dispatcher is the failure boundary of the tool-calling core: whatever
//! a parsed call does wrong — unknown name, bad arguments, missing context,
//! a panicking implementation's `Err` — comes back as a failure [`Outcome`],
//! never as an error that could abort the conversation loop.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use corvid_core::session::SessionContext;
use corvid_core::types::{ArgMap, Descriptor, Outcome, ParamType};

use crate::parser::{CallParser, CallRequest};
use crate::registry::CapabilityRegistry;

/// Cap on capability calls executed per round; overflow is silently dropped.
pub const DEFAULT_MAX_CALLS_PER_ROUND: usize = 5;

// ─────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────

/// Validate and coerce arguments against a descriptor.
///
/// Coercion mutates `args` in place so the implementation receives correctly
/// typed values. Optional parameters with a default are filled in here;
/// defaulted values go through the same enum check as supplied ones.
pub fn validate(descriptor: &Descriptor, args: &mut ArgMap) -> Result<(), String> {
    for param in &descriptor.params {
        if !args.contains_key(&param.name) {
            if param.required {
                return Err(format!("Missing required parameter: {}", param.name));
            }
            match &param.default {
                Some(default) => {
                    args.insert(param.name.clone(), default.clone());
                }
                None => continue,
            }
        }

        let value = args
            .get(&param.name)
            .cloned()
            .unwrap_or(Value::Null);

        let coerced = coerce(&param.name, param.kind, value)?;
        if let Some(allowed) = &param.allowed {
            let matches = coerced.as_str().is_some_and(|s| allowed.iter().any(|a| a == s));
            if !matches {
                return Err(format!(
                    "Parameter {} must be one of {:?}, got {}",
                    param.name, allowed, coerced
                ));
            }
        }
        args.insert(param.name.clone(), coerced);
    }
    Ok(())
}

/// Coerce one value to its declared type, or explain why it can't be.
fn coerce(name: &str, kind: ParamType, value: Value) -> Result<Value, String> {
    match kind {
        ParamType::Integer => match &value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value),
            Value::Number(n) => {
                // Whole-valued floats are accepted; 2.5 is not an integer.
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 => Ok(Value::from(f as i64)),
                    _ => Err(format!("Parameter {name} must be an integer")),
                }
            }
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("Parameter {name} must be an integer")),
            _ => Err(format!("Parameter {name} must be an integer")),
        },
        ParamType::Real => match &value {
            Value::Number(_) => Ok(value),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("Parameter {name} must be a number")),
            _ => Err(format!("Parameter {name} must be a number")),
        },
        ParamType::Boolean => match &value {
            Value::Bool(_) => Ok(value),
            Value::String(s) if ["true", "1", "yes"].contains(&s.to_lowercase().as_str()) => {
                Ok(Value::Bool(true))
            }
            _ => Err(format!("Parameter {name} must be a boolean")),
        },
        // Text and List values are passed through as written.
        ParamType::Text | ParamType::List => Ok(value),
    }
}

// ─────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────

/// Validates parsed calls against the registry and executes them.
pub struct Dispatcher {
    registry: Arc<CapabilityRegistry>,
    parser: CallParser,
    max_calls_per_round: usize,
}

impl Dispatcher {
    /// Create a dispatcher over a populated registry.
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            registry,
            parser: CallParser::new(),
            max_calls_per_round: DEFAULT_MAX_CALLS_PER_ROUND,
        }
    }

    /// Override the per-round call cap.
    pub fn with_max_calls(mut self, max_calls_per_round: usize) -> Self {
        self.max_calls_per_round = max_calls_per_round;
        self
    }

    /// The registry this dispatcher reads from.
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Whether the text contains any recognizable call span.
    pub fn has_calls(&self, text: &str) -> bool {
        self.parser.has_calls(text)
    }

    /// Remove every recognizable call span from the text.
    pub fn strip_calls(&self, text: &str) -> String {
        self.parser.strip_calls(text)
    }

    /// Execute one parsed call, normalizing every failure into an outcome.
    pub async fn dispatch(
        &self,
        call: &CallRequest,
        ctx: Option<&SessionContext>,
    ) -> Outcome {
        let entry = match self.registry.get(&call.name) {
            Some(e) => e,
            None => {
                warn!(capability = %call.name, "call names an unregistered capability");
                return Outcome::fail(format!("Unknown capability: {}", call.name));
            }
        };

        let mut args = call.arguments.clone();
        if let Err(reason) = validate(&entry.descriptor, &mut args) {
            warn!(capability = %call.name, reason = %reason, "argument validation failed");
            return Outcome::fail(reason);
        }

        if entry.descriptor.needs_context && ctx.is_none() {
            return Outcome::fail(format!(
                "Capability {} requires session context",
                call.name
            ));
        }

        info!(capability = %call.name, "executing capability");
        match entry.handler.invoke(args, ctx).await {
            Ok(output) => Outcome::ok(output),
            Err(e) => {
                warn!(capability = %call.name, error = %e, "capability execution failed");
                Outcome::fail(format!("Capability execution failed: {e}"))
            }
        }
    }

    /// Parse and execute every call in `text`.
    ///
    /// Calls beyond the per-round cap are dropped without outcomes. Dispatch
    /// is sequential and left-to-right: most capabilities mutate shared
    /// external state, so evaluation order is part of the observable contract.
    pub async fn dispatch_all(
        &self,
        text: &str,
        ctx: Option<&SessionContext>,
    ) -> (Vec<Outcome>, String) {
        let calls = self.parser.parse(text);
        if calls.len() > self.max_calls_per_round {
            debug!(
                parsed = calls.len(),
                cap = self.max_calls_per_round,
                "dropping calls beyond per-round cap"
            );
        }

        let mut outcomes = Vec::new();
        for call in calls.iter().take(self.max_calls_per_round) {
            outcomes.push(self.dispatch(call, ctx).await);
        }

        let cleaned = self.parser.strip_calls(text);
        (outcomes, cleaned)
    }

    /// Render outcomes into the result block fed back to the model.
    ///
    /// The shape is deliberately flat and human-readable — the model reads
    /// it as prose, and so does anyone scanning a transcript.
    pub fn format_for_model(&self, outcomes: &[Outcome]) -> String {
        if outcomes.is_empty() {
            return String::new();
        }
        let mut parts = vec!["Tool Results:".to_string()];
        for (i, outcome) in outcomes.iter().enumerate() {
            let line = if outcome.success {
                format!("[{}] Success: {}", i + 1, outcome.render())
            } else {
                format!(
                    "[{}] Failed: {}",
                    i + 1,
                    outcome.error.as_deref().unwrap_or("unknown error")
                )
            };
            parts.push(line);
        }
        parts.join("\n")
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
