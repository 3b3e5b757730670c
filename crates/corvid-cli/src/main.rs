//! Corvid CLI — entry point.
//!
//! # Commands
//!
//! - `corvid chat -m MESSAGE` — run one prompt through the tool-calling loop
//! - `corvid capabilities [NAME]` — inspect the registered capabilities
//! - `corvid config` — print the effective configuration

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use corvid_agent::admin::{capability_detail, capability_overview};
use corvid_agent::{register_builtins, register_messaging, CapabilityRegistry, ConversationLoop, Dispatcher};
use corvid_core::config::Config;
use corvid_providers::OllamaBackend;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Corvid — tool-calling chat assistant core
#[derive(Parser)]
#[command(name = "corvid", version, about, long_about = None)]
struct Cli {
    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one message through the tool-calling loop
    Chat {
        /// The message to send
        #[arg(short, long)]
        message: String,

        /// Override the configured model
        #[arg(long)]
        model: Option<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show registered capabilities, or one capability's full schema
    Capabilities {
        /// Capability name for a detailed view
        name: Option<String>,

        /// Print function-calling schemas as JSON
        #[arg(long, default_value_t = false)]
        schemas: bool,
    },

    /// Print the effective configuration
    Config,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref());

    match cli.command {
        Commands::Chat {
            message,
            model,
            logs,
        } => {
            init_logging(logs);
            run_chat(&config, &message, model).await
        }
        Commands::Capabilities { name, schemas } => {
            init_logging(false);
            run_capabilities(name, schemas)
        }
        Commands::Config => {
            init_logging(false);
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

// ─────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────

async fn run_chat(config: &Config, message: &str, model: Option<String>) -> Result<()> {
    let backend = Arc::new(OllamaBackend::from_config(&config.backend));
    let dispatcher =
        Dispatcher::new(build_registry()).with_max_calls(config.agent.max_calls_per_round);

    let conversation = ConversationLoop::new(backend, dispatcher, &config.agent.system_prompt)
        .with_model(model.unwrap_or_else(|| config.backend.chat_model.clone()))
        .with_max_rounds(config.agent.max_rounds);

    info!(chars = message.len(), "processing message");
    // No messaging front-end on the command line, so no session context:
    // messaging capabilities resolve to failure outcomes the model can see.
    let response = conversation
        .respond(message, &[], None)
        .await
        .context("chat processing failed")?;

    println!("{response}");
    Ok(())
}

fn run_capabilities(name: Option<String>, schemas: bool) -> Result<()> {
    let registry = build_registry();

    match name {
        Some(name) => {
            let detail = capability_detail(&registry, &name)
                .with_context(|| format!("unknown capability: {name}"))?;
            println!("{detail}");
        }
        None if schemas => {
            let exported = registry.export_schemas(None);
            println!("{}", serde_json::to_string_pretty(&exported)?);
        }
        None => println!("{}", capability_overview(&registry)),
    }
    Ok(())
}

/// Registry with the full built-in inventory.
fn build_registry() -> Arc<CapabilityRegistry> {
    let mut registry = CapabilityRegistry::new();
    register_builtins(&mut registry);
    register_messaging(&mut registry);
    Arc::new(registry)
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("corvid=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
