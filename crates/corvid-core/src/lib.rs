//! Corvid Core — shared types, session ports, and configuration.
//!
//! This crate contains:
//! - **types**: capability descriptors, parameter specs, call outcomes,
//!   and conversation turns
//! - **session**: the live messaging context handed to capabilities that
//!   need it, expressed as trait-object ports
//! - **config**: typed configuration schema + JSON/env loader

pub mod config;
pub mod session;
pub mod types;

pub use config::Config;
pub use session::{ChannelMessage, ChannelPort, GuildPort, MemberInfo, SessionContext, UserPort};
pub use types::{ArgMap, Descriptor, Outcome, ParamSpec, ParamType, Turn, TurnRole};
