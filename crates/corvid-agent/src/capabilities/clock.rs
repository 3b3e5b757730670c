//! Current date/time capability.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use serde_json::{json, Value};

use corvid_core::session::SessionContext;
use corvid_core::types::{ArgMap, Descriptor, ParamSpec, ParamType};

use crate::capability::{arg_str, Capability};
use crate::registry::CapabilityRegistry;

struct CurrentTime;

#[async_trait]
impl Capability for CurrentTime {
    async fn invoke(&self, args: ArgMap, _ctx: Option<&SessionContext>) -> anyhow::Result<Value> {
        let format = arg_str(&args, "format").unwrap_or("full");
        let now = Local::now();

        let rendered = match format {
            "date" => json!(now.format("%Y-%m-%d").to_string()),
            "time" => json!(now.format("%H:%M:%S").to_string()),
            "unix" => json!(now.timestamp()),
            _ => json!(now.format("%Y-%m-%d %H:%M:%S").to_string()),
        };

        Ok(json!({
            "current_time": rendered,
            "format": format,
            "timezone": "local",
        }))
    }
}

pub fn register(registry: &mut CapabilityRegistry) {
    registry.register(
        Descriptor::new(
            "get_current_time",
            "Get the current date and time. Useful for time-sensitive questions.",
        )
        .category("utility")
        .param(
            ParamSpec::optional(
                "format",
                "Output format: 'full', 'date', 'time', or 'unix'",
                ParamType::Text,
            )
            .with_default(json!("full"))
            .with_allowed(&["full", "date", "time", "unix"]),
        ),
        Arc::new(CurrentTime),
    );
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
