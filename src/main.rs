//! Gmail MCP Server - Rust Implementation
//!
//! A Model Context Protocol (MCP) server exposing a single Gmail mailbox to
//! an AI agent over stdio.

use clap::{Parser, Subcommand};

use gmail_mcp::config::Config;
use gmail_mcp::error::Result;
use gmail_mcp::gmail::auth::Authenticator;
use gmail_mcp::mcp::server::McpServer;

/// Gmail MCP Server
#[derive(Parser)]
#[command(name = "gmail-mcp")]
#[command(author, version, about = "Gmail MCP Server - A Model Context Protocol server for Gmail")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate with Gmail (run this first)
    Auth,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout belongs to the protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::new()?;

    match cli.command {
        Some(Commands::Auth) => {
            if !config.oauth_keys_exist() {
                eprintln!("Error: OAuth keys file not found.");
                eprintln!(
                    "Please place gcp-oauth.keys.json in current directory or {}",
                    config.config_dir.display()
                );
                std::process::exit(1);
            }

            let authenticator = Authenticator::new(config).await?;
            authenticator.authenticate_interactive().await?;
            std::process::exit(0);
        }
        None => {
            // Run MCP server; authentication problems surface per tool call
            let mut server = McpServer::new(config);
            server.run_stdio().await?;
        }
    }

    Ok(())
}
