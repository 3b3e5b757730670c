//! Session context — live references to the messaging environment.
//!
//! The messaging front-end hands a [`SessionContext`] to the dispatcher for
//! the duration of one dispatch cycle. Capabilities that declare
//! `needs_context` receive it; nobody stores it beyond the call it was
//! supplied for.
//!
//! The front-end itself (Discord, Matrix, a test harness) lives outside this
//! workspace, so the context is expressed as trait-object ports.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Port data
// ─────────────────────────────────────────────

/// A message fetched from a channel's history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub id: u64,
    pub author: String,
    pub author_id: u64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Information about a guild member, resolved by [`GuildPort::member_named`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemberInfo {
    pub id: u64,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub roles: Vec<String>,
}

// ─────────────────────────────────────────────
// Ports
// ─────────────────────────────────────────────

/// Handle to the channel the conversation is happening in.
#[async_trait]
pub trait ChannelPort: Send + Sync {
    fn id(&self) -> u64;
    fn name(&self) -> &str;

    /// Fetch up to `limit` recent messages, newest first.
    async fn history(&self, limit: usize) -> anyhow::Result<Vec<ChannelMessage>>;

    /// Delete a single message by ID.
    async fn delete_message(&self, message_id: u64) -> anyhow::Result<()>;

    /// Bulk-delete up to `limit` recent messages; returns the count removed.
    async fn purge(&self, limit: usize) -> anyhow::Result<usize>;
}

/// Handle to the guild (server) the channel belongs to, when there is one.
#[async_trait]
pub trait GuildPort: Send + Sync {
    fn id(&self) -> u64;
    fn name(&self) -> &str;
    fn member_count(&self) -> usize;

    /// Resolve a member by exact or partial display name.
    async fn member_named(&self, query: &str) -> anyhow::Result<Option<MemberInfo>>;
}

/// Handle to the user whose message started the current turn.
pub trait UserPort: Send + Sync {
    fn id(&self) -> u64;
    fn display_name(&self) -> &str;
}

// ─────────────────────────────────────────────
// SessionContext
// ─────────────────────────────────────────────

/// Bundle of live messaging references for one dispatch cycle.
#[derive(Clone)]
pub struct SessionContext {
    /// The channel the triggering message arrived in.
    pub channel: Arc<dyn ChannelPort>,
    /// The owning guild; absent in direct-message conversations.
    pub guild: Option<Arc<dyn GuildPort>>,
    /// The invoking user.
    pub user: Arc<dyn UserPort>,
}

impl SessionContext {
    /// Create a context for a guild channel.
    pub fn new(
        channel: Arc<dyn ChannelPort>,
        guild: Option<Arc<dyn GuildPort>>,
        user: Arc<dyn UserPort>,
    ) -> Self {
        SessionContext {
            channel,
            guild,
            user,
        }
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("channel", &self.channel.name())
            .field("guild", &self.guild.as_ref().map(|g| g.name().to_string()))
            .field("user", &self.user.display_name())
            .finish()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
