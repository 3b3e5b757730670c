//! Core types for Corvid — capability metadata and call outcomes.
//!
//! A *capability* is a named, schema-described function the model may request
//! from its generated text. The static metadata lives in [`Descriptor`]; the
//! normalized result of attempting one invocation is an [`Outcome`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw argument map for one capability invocation, keyed by parameter name.
///
/// Values are unvalidated until the dispatcher coerces them against the
/// capability's [`ParamSpec`] list.
pub type ArgMap = serde_json::Map<String, Value>;

// ─────────────────────────────────────────────
// Parameter types
// ─────────────────────────────────────────────

/// Declared type of a capability parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Text,
    Integer,
    Real,
    Boolean,
    List,
}

impl ParamType {
    /// JSON Schema type string for this parameter type.
    pub fn schema_type(&self) -> &'static str {
        match self {
            ParamType::Text => "string",
            ParamType::Integer => "integer",
            ParamType::Real => "number",
            ParamType::Boolean => "boolean",
            ParamType::List => "array",
        }
    }
}

// ─────────────────────────────────────────────
// Parameter spec
// ─────────────────────────────────────────────

/// Declaration of one capability parameter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name, unique within one capability.
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
    /// Declared type; supplied values are coerced to it at dispatch time.
    pub kind: ParamType,
    /// Whether the parameter must be supplied. When true, `default` is ignored.
    pub required: bool,
    /// Value used when the parameter is optional and absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Fixed set of allowed values. Supplied or defaulted values must be members.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
}

impl ParamSpec {
    /// Create a required parameter.
    pub fn required(
        name: impl Into<String>,
        description: impl Into<String>,
        kind: ParamType,
    ) -> Self {
        ParamSpec {
            name: name.into(),
            description: description.into(),
            kind,
            required: true,
            default: None,
            allowed: None,
        }
    }

    /// Create an optional parameter.
    pub fn optional(
        name: impl Into<String>,
        description: impl Into<String>,
        kind: ParamType,
    ) -> Self {
        ParamSpec {
            required: false,
            ..Self::required(name, description, kind)
        }
    }

    /// Set the default value used when this (optional) parameter is absent.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Restrict the parameter to a fixed set of allowed values.
    pub fn with_allowed(mut self, allowed: &[&str]) -> Self {
        self.allowed = Some(allowed.iter().map(|s| s.to_string()).collect());
        self
    }

    /// JSON Schema fragment for this parameter (the property block).
    pub fn to_schema(&self) -> Value {
        let mut schema = serde_json::Map::new();
        schema.insert("type".into(), Value::String(self.kind.schema_type().into()));
        schema.insert("description".into(), Value::String(self.description.clone()));
        if let Some(allowed) = &self.allowed {
            schema.insert(
                "enum".into(),
                Value::Array(allowed.iter().map(|v| Value::String(v.clone())).collect()),
            );
        }
        Value::Object(schema)
    }
}

// ─────────────────────────────────────────────
// Capability descriptor
// ─────────────────────────────────────────────

/// Static metadata describing one capability, independent of its implementation.
///
/// Built once at startup by each capability provider and immutable thereafter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Descriptor {
    /// Globally unique, stable identifier the model uses to request the capability.
    pub name: String,
    /// Natural-language description shown to the model.
    pub description: String,
    /// Ordered parameter list.
    pub params: Vec<ParamSpec>,
    /// Grouping tag for documentation and the admin surface.
    pub category: String,
    /// Whether the implementation needs the live [`crate::SessionContext`].
    pub needs_context: bool,
}

impl Descriptor {
    /// Create a descriptor.
    ///
    /// # Panics
    /// Panics when `name` or `description` is empty — an invalid capability
    /// must never reach the registry, so this is a startup-time failure.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        let description = description.into();
        assert!(!name.is_empty(), "capability must have a name");
        assert!(
            !description.is_empty(),
            "capability '{name}' must have a description"
        );
        Descriptor {
            name,
            description,
            params: Vec::new(),
            category: "general".into(),
            needs_context: false,
        }
    }

    /// Set the category tag.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Mark this capability as requiring a live session context.
    pub fn needs_context(mut self) -> Self {
        self.needs_context = true;
        self
    }

    /// Append a parameter.
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Full function-calling schema for this capability.
    pub fn to_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for p in &self.params {
            properties.insert(p.name.clone(), p.to_schema());
            if p.required {
                required.push(Value::String(p.name.clone()));
            }
        }

        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }
            }
        })
    }

    /// One-line parameter summary, e.g. `limit: integer (optional), query: string`.
    pub fn param_summary(&self) -> String {
        self.params
            .iter()
            .map(|p| {
                let opt = if p.required { "" } else { " (optional)" };
                format!("{}: {}{}", p.name, p.kind.schema_type(), opt)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ─────────────────────────────────────────────
// Call outcome
// ─────────────────────────────────────────────

/// Normalized result of attempting one capability invocation.
///
/// `output` is present iff `success`; `error` is present iff not.
/// Produced by the dispatcher, rendered into the continuation prompt,
/// then discarded.
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    pub success: bool,
    pub output: Option<Value>,
    pub error: Option<String>,
}

impl Outcome {
    /// A successful outcome carrying the capability's output value.
    pub fn ok(output: impl Into<Value>) -> Self {
        Outcome {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    /// A failure outcome carrying a short diagnostic.
    pub fn fail(error: impl Into<String>) -> Self {
        Outcome {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }

    /// Stringify the output for model consumption.
    ///
    /// Plain strings are passed through without JSON quoting; anything else
    /// is rendered as compact JSON.
    pub fn render(&self) -> String {
        match &self.output {
            Some(Value::String(s)) => s.clone(),
            Some(v) => v.to_string(),
            None => String::new(),
        }
    }
}

// ─────────────────────────────────────────────
// Conversation turns
// ─────────────────────────────────────────────

/// Who produced a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One prior turn of the conversation the loop controller is continuing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    /// Display name of the speaker (user turns only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub content: String,
}

impl Turn {
    /// Create a user turn with the speaker's display name.
    pub fn user(name: impl Into<String>, content: impl Into<String>) -> Self {
        Turn {
            role: TurnRole::User,
            name: Some(name.into()),
            content: content.into(),
        }
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Turn {
            role: TurnRole::Assistant,
            name: None,
            content: content.into(),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
