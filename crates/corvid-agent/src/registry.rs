//! Capability Registry — the process-wide capability store.
//!
//! Built once at startup by the capability providers, then read continuously
//! by the dispatcher and the loop controller. Registering a second capability
//! under an existing name replaces the first (last-registration-wins); this
//! is logged as a warning, not rejected.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use corvid_core::types::Descriptor;

use crate::capability::Capability;

// ─────────────────────────────────────────────
// Entries
// ─────────────────────────────────────────────

/// A descriptor paired with its implementation.
#[derive(Clone)]
pub struct RegisteredCapability {
    pub descriptor: Descriptor,
    pub handler: Arc<dyn Capability>,
}

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Stores capabilities keyed by name, preserving registration order.
///
/// An overwrite keeps the capability's original position so the catalogue
/// shown to the model stays stable within one process run.
pub struct CapabilityRegistry {
    entries: HashMap<String, RegisteredCapability>,
    order: Vec<String>,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a capability. Replaces any previous entry with the same name.
    pub fn register(&mut self, descriptor: Descriptor, handler: Arc<dyn Capability>) {
        let name = descriptor.name.clone();
        let entry = RegisteredCapability {
            descriptor,
            handler,
        };
        if self.entries.insert(name.clone(), entry).is_some() {
            warn!(capability = %name, "replacing previously registered capability");
        } else {
            info!(capability = %name, "registered capability");
            self.order.push(name);
        }
    }

    /// Look up a capability by name. Absence is a signal, not an error.
    pub fn get(&self, name: &str) -> Option<&RegisteredCapability> {
        self.entries.get(name)
    }

    /// Check whether a capability is registered.
    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All registered capabilities in registration order.
    pub fn list_all(&self) -> Vec<&RegisteredCapability> {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name))
            .collect()
    }

    /// Registered capabilities in the given category, registration order.
    pub fn list_by_category(&self, category: &str) -> Vec<&RegisteredCapability> {
        self.list_all()
            .into_iter()
            .filter(|e| e.descriptor.category == category)
            .collect()
    }

    /// Function-calling schemas, one per capability.
    ///
    /// A `filter` restricts the export to the named capabilities.
    pub fn export_schemas(&self, filter: Option<&[&str]>) -> Vec<Value> {
        self.list_all()
            .into_iter()
            .filter(|e| match filter {
                Some(names) => names.contains(&e.descriptor.name.as_str()),
                None => true,
            })
            .map(|e| e.descriptor.to_schema())
            .collect()
    }

    /// Human-readable enumeration of every capability with parameter summary.
    pub fn describe_all(&self) -> String {
        let mut lines = vec!["Available capabilities:".to_string()];
        for entry in self.list_all() {
            let d = &entry.descriptor;
            lines.push(format!(
                "- {}({}): {}",
                d.name,
                d.param_summary(),
                d.description
            ));
        }
        lines.join("\n")
    }

    /// Remove a capability by name. Administrative use only.
    pub fn unregister(&mut self, name: &str) -> bool {
        if self.entries.remove(name).is_some() {
            self.order.retain(|n| n != name);
            info!(capability = name, "unregistered capability");
            true
        } else {
            false
        }
    }

    /// Remove every capability. Administrative use only — never called
    /// implicitly during normal operation.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        info!("cleared capability registry");
    }

    /// Number of registered capabilities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use corvid_core::session::SessionContext;
    use corvid_core::types::{ArgMap, ParamSpec, ParamType};
    use serde_json::json;

    struct EchoCapability;

    #[async_trait]
    impl Capability for EchoCapability {
        async fn invoke(
            &self,
            args: ArgMap,
            _ctx: Option<&SessionContext>,
        ) -> anyhow::Result<Value> {
            Ok(args.get("text").cloned().unwrap_or(Value::Null))
        }
    }

    fn echo_descriptor(name: &str, category: &str) -> Descriptor {
        Descriptor::new(name, "Echoes back the input")
            .category(category)
            .param(ParamSpec::required("text", "Text to echo", ParamType::Text))
    }

    fn registry_with(names: &[(&str, &str)]) -> CapabilityRegistry {
        let mut reg = CapabilityRegistry::new();
        for (name, category) in names {
            reg.register(echo_descriptor(name, category), Arc::new(EchoCapability));
        }
        reg
    }

    #[test]
    fn test_register_and_lookup() {
        let reg = registry_with(&[("echo", "utility")]);
        assert!(reg.has("echo"));
        assert!(!reg.has("nope"));
        assert!(reg.get("echo").is_some());
        assert!(reg.get("nope").is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_list_all_preserves_registration_order() {
        let reg = registry_with(&[("zeta", "a"), ("alpha", "b"), ("mid", "a")]);
        let names: Vec<&str> = reg
            .list_all()
            .iter()
            .map(|e| e.descriptor.name.as_str())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_overwrite_keeps_original_position() {
        let mut reg = registry_with(&[("first", "a"), ("second", "a")]);
        reg.register(
            Descriptor::new("first", "Replacement implementation").category("b"),
            Arc::new(EchoCapability),
        );

        let names: Vec<&str> = reg
            .list_all()
            .iter()
            .map(|e| e.descriptor.name.as_str())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(reg.len(), 2);
        assert_eq!(
            reg.get("first").unwrap().descriptor.description,
            "Replacement implementation"
        );
    }

    #[test]
    fn test_list_by_category() {
        let reg = registry_with(&[("a", "utility"), ("b", "messaging"), ("c", "utility")]);
        let utility = reg.list_by_category("utility");
        assert_eq!(utility.len(), 2);
        assert!(reg.list_by_category("unknown").is_empty());
    }

    #[test]
    fn test_export_schemas_all() {
        let reg = registry_with(&[("a", "utility"), ("b", "utility")]);
        let schemas = reg.export_schemas(None);
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0]["function"]["name"], "a");
        assert_eq!(schemas[0]["type"], "function");
        assert_eq!(
            schemas[0]["function"]["parameters"]["required"],
            json!(["text"])
        );
    }

    #[test]
    fn test_export_schemas_filtered() {
        let reg = registry_with(&[("a", "utility"), ("b", "utility"), ("c", "utility")]);
        let schemas = reg.export_schemas(Some(&["b", "c"]));
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0]["function"]["name"], "b");
    }

    #[test]
    fn test_describe_all() {
        let reg = registry_with(&[("echo", "utility")]);
        let text = reg.describe_all();
        assert!(text.starts_with("Available capabilities:"));
        assert!(text.contains("echo(text: string): Echoes back the input"));
    }

    #[test]
    fn test_unregister_and_clear() {
        let mut reg = registry_with(&[("a", "x"), ("b", "x")]);
        assert!(reg.unregister("a"));
        assert!(!reg.unregister("a"));
        assert_eq!(reg.len(), 1);
        reg.clear();
        assert!(reg.is_empty());
        assert!(reg.list_all().is_empty());
    }
}
