//! Gmail MCP Server Library
//!
//! A Model Context Protocol (MCP) server exposing a single Gmail mailbox to
//! an AI agent. Provides tools for reading, searching, sending, drafting,
//! threading, and labeling email via OAuth2-authenticated REST calls.

pub mod config;
pub mod error;
pub mod gmail;
pub mod mcp;

pub use config::Config;
pub use error::{GmailMcpError, Result};
