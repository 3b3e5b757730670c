//! Built-in capability providers.
//!
//! Utility capabilities are context-free; messaging capabilities operate on
//! the session ports and are only useful when a messaging front-end is
//! attached, so they register separately.

pub mod clock;
pub mod messaging;
pub mod random;
pub mod text;

use crate::registry::CapabilityRegistry;

/// Register every context-free utility capability.
pub fn register_builtins(registry: &mut CapabilityRegistry) {
    clock::register(registry);
    text::register(registry);
    random::register(registry);
}

/// Register the messaging capabilities. All of these need a session context.
pub fn register_messaging(registry: &mut CapabilityRegistry) {
    messaging::register(registry);
}
