//! Administrative surface — operator-facing reads over the registry and the
//! per-scope tool-calling switch.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use tracing::info;

use crate::registry::CapabilityRegistry;

// ─────────────────────────────────────────────
// Tooling switch
// ─────────────────────────────────────────────

/// Per-scope on/off switch for capability calling.
///
/// A scope is whatever the front-end keys conversations by (a channel, a
/// guild). Scopes without an explicit override follow the default, which is
/// on.
pub struct ToolingSwitch {
    default_on: bool,
    overrides: RwLock<HashMap<u64, bool>>,
}

impl ToolingSwitch {
    pub fn new() -> Self {
        Self {
            default_on: true,
            overrides: RwLock::new(HashMap::new()),
        }
    }

    /// Flip the default for scopes with no explicit override.
    pub fn with_default(mut self, on: bool) -> Self {
        self.default_on = on;
        self
    }

    /// Enable capability calling in a scope.
    pub fn enable(&self, scope: u64) {
        self.overrides.write().unwrap().insert(scope, true);
        info!(scope, "tool calling enabled");
    }

    /// Disable capability calling in a scope.
    pub fn disable(&self, scope: u64) {
        self.overrides.write().unwrap().insert(scope, false);
        info!(scope, "tool calling disabled");
    }

    /// Drop a scope's override, returning it to the default.
    pub fn reset(&self, scope: u64) {
        self.overrides.write().unwrap().remove(&scope);
    }

    /// Whether capability calling is active in a scope.
    pub fn is_enabled(&self, scope: u64) -> bool {
        self.overrides
            .read()
            .unwrap()
            .get(&scope)
            .copied()
            .unwrap_or(self.default_on)
    }
}

impl Default for ToolingSwitch {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────
// Registry views
// ─────────────────────────────────────────────

/// Capability overview grouped by category, for operator display.
pub fn capability_overview(registry: &CapabilityRegistry) -> String {
    if registry.is_empty() {
        return "No capabilities registered.".to_string();
    }

    // BTreeMap for stable category ordering; entries keep insertion order.
    let mut groups: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for entry in registry.list_all() {
        let d = &entry.descriptor;
        groups
            .entry(d.category.as_str())
            .or_default()
            .push(format!("  {} — {}", d.name, d.description));
    }

    let mut lines = Vec::new();
    for (category, entries) in groups {
        lines.push(format!("{category}:"));
        lines.extend(entries);
    }
    lines.join("\n")
}

/// Detailed view of a single capability: summary line plus its
/// function-calling schema, pretty-printed. `None` when unregistered.
pub fn capability_detail(registry: &CapabilityRegistry, name: &str) -> Option<String> {
    let entry = registry.get(name)?;
    let d = &entry.descriptor;
    let schema = serde_json::to_string_pretty(&d.to_schema()).unwrap_or_default();
    Some(format!(
        "{}({})\n{}\nCategory: {}\n\n{}",
        d.name,
        d.param_summary(),
        d.description,
        d.category,
        schema
    ))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
