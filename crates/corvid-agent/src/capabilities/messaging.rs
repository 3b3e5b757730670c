//! Messaging capabilities — read and moderate the channel the conversation
//! is happening in, through the session ports.
//!
//! Every capability here declares `needs_context`, so the dispatcher refuses
//! them when no front-end is attached.

use std::sync::Arc;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use serde_json::{json, Value};

use corvid_core::session::{GuildPort, SessionContext};
use corvid_core::types::{ArgMap, Descriptor, ParamSpec, ParamType};

use crate::capability::{arg_i64, arg_str, require_str, Capability};
use crate::registry::CapabilityRegistry;

const MAX_HISTORY: usize = 50;
const MAX_PURGE: usize = 100;
const CONTENT_PREVIEW: usize = 500;

fn context(ctx: Option<&SessionContext>) -> anyhow::Result<&SessionContext> {
    ctx.ok_or_else(|| anyhow!("Session context required"))
}

fn guild(ctx: &SessionContext) -> anyhow::Result<&Arc<dyn GuildPort>> {
    ctx.guild
        .as_ref()
        .ok_or_else(|| anyhow!("Not connected to a server"))
}

// ─────────────────────────────────────────────
// get_channel_messages
// ─────────────────────────────────────────────

struct GetChannelMessages;

#[async_trait]
impl Capability for GetChannelMessages {
    async fn invoke(&self, args: ArgMap, ctx: Option<&SessionContext>) -> anyhow::Result<Value> {
        let ctx = context(ctx)?;
        let limit = (arg_i64(&args, "limit").unwrap_or(10).max(1) as usize).min(MAX_HISTORY);
        let author = arg_str(&args, "author").map(|a| a.to_lowercase());

        // When filtering, fetch extra so enough matching messages survive.
        let fetch = if author.is_some() {
            (limit * 5).min(MAX_PURGE)
        } else {
            limit
        };

        let mut messages = Vec::new();
        for msg in ctx.channel.history(fetch).await? {
            if let Some(author) = &author {
                if !msg.author.to_lowercase().contains(author.as_str()) {
                    continue;
                }
            }
            messages.push(json!({
                "id": msg.id,
                "author": msg.author,
                "author_id": msg.author_id,
                "content": msg.content.chars().take(CONTENT_PREVIEW).collect::<String>(),
                "timestamp": msg.timestamp.to_rfc3339(),
            }));
            if messages.len() >= limit {
                break;
            }
        }

        Ok(json!({
            "channel": ctx.channel.name(),
            "message_count": messages.len(),
            "messages": messages,
        }))
    }
}

// ─────────────────────────────────────────────
// get_user_info
// ─────────────────────────────────────────────

struct GetUserInfo;

#[async_trait]
impl Capability for GetUserInfo {
    async fn invoke(&self, args: ArgMap, ctx: Option<&SessionContext>) -> anyhow::Result<Value> {
        let ctx = context(ctx)?;

        match arg_str(&args, "username") {
            Some(query) => {
                let member = guild(ctx)?
                    .member_named(query)
                    .await?
                    .ok_or_else(|| anyhow!("User not found: {query}"))?;
                Ok(serde_json::to_value(member)?)
            }
            // Without a query, describe the invoking user
            None => Ok(json!({
                "id": ctx.user.id(),
                "display_name": ctx.user.display_name(),
            })),
        }
    }
}

// ─────────────────────────────────────────────
// get_server_info
// ─────────────────────────────────────────────

struct GetServerInfo;

#[async_trait]
impl Capability for GetServerInfo {
    async fn invoke(&self, _args: ArgMap, ctx: Option<&SessionContext>) -> anyhow::Result<Value> {
        let ctx = context(ctx)?;
        let guild = guild(ctx)?;

        Ok(json!({
            "id": guild.id(),
            "name": guild.name(),
            "member_count": guild.member_count(),
        }))
    }
}

// ─────────────────────────────────────────────
// delete_message
// ─────────────────────────────────────────────

struct DeleteMessage;

#[async_trait]
impl Capability for DeleteMessage {
    async fn invoke(&self, args: ArgMap, ctx: Option<&SessionContext>) -> anyhow::Result<Value> {
        let ctx = context(ctx)?;
        let raw = require_str(&args, "message_id")?;
        let message_id: u64 = raw
            .parse()
            .map_err(|_| anyhow!("Invalid message ID: {raw}"))?;

        ctx.channel.delete_message(message_id).await?;
        Ok(json!(format!("Deleted message {message_id}")))
    }
}

// ─────────────────────────────────────────────
// purge_messages
// ─────────────────────────────────────────────

struct PurgeMessages;

#[async_trait]
impl Capability for PurgeMessages {
    async fn invoke(&self, args: ArgMap, ctx: Option<&SessionContext>) -> anyhow::Result<Value> {
        let ctx = context(ctx)?;
        let limit = args
            .get("limit")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| anyhow!("Missing required parameter: limit"))?;

        if limit < 1 {
            bail!("limit must be at least 1");
        }
        let limit = (limit as usize).min(MAX_PURGE);

        let deleted = ctx.channel.purge(limit).await?;
        Ok(json!(format!(
            "Deleted {deleted} messages from #{}",
            ctx.channel.name()
        )))
    }
}

// ─────────────────────────────────────────────
// Registration
// ─────────────────────────────────────────────

pub fn register(registry: &mut CapabilityRegistry) {
    registry.register(
        Descriptor::new(
            "get_channel_messages",
            "Retrieve recent messages from the current channel. Can filter by author.",
        )
        .category("messaging")
        .needs_context()
        .param(
            ParamSpec::optional(
                "limit",
                "Number of messages to retrieve (max 50)",
                ParamType::Integer,
            )
            .with_default(json!(10)),
        )
        .param(ParamSpec::optional(
            "author",
            "Only include messages whose author name matches",
            ParamType::Text,
        )),
        Arc::new(GetChannelMessages),
    );

    registry.register(
        Descriptor::new(
            "get_user_info",
            "Get information about a user. Without a username, describes the message author.",
        )
        .category("messaging")
        .needs_context()
        .param(ParamSpec::optional(
            "username",
            "Display name to look up (partial match)",
            ParamType::Text,
        )),
        Arc::new(GetUserInfo),
    );

    registry.register(
        Descriptor::new(
            "get_server_info",
            "Get information about the current server, including member count.",
        )
        .category("messaging")
        .needs_context(),
        Arc::new(GetServerInfo),
    );

    registry.register(
        Descriptor::new("delete_message", "Delete a specific message by its ID.")
            .category("messaging")
            .needs_context()
            .param(ParamSpec::required(
                "message_id",
                "The ID of the message to delete",
                ParamType::Text,
            )),
        Arc::new(DeleteMessage),
    );

    registry.register(
        Descriptor::new(
            "purge_messages",
            "Bulk delete the most recent messages from the channel.",
        )
        .category("messaging")
        .needs_context()
        .param(ParamSpec::required(
            "limit",
            "Number of messages to delete (max 100)",
            ParamType::Integer,
        )),
        Arc::new(PurgeMessages),
    );
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
