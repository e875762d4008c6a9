//! apple-mail-mcp: MCP server for AI-assisted Apple Mail automation
//!
//! Exposes Mail.app to AI assistants through JXA (JavaScript for
//! Automation) scripts run by `osascript`.
//!
//! # Architecture
//!
//! The server stays thin. Every tool call runs one embedded script, which
//! talks to Mail.app and answers with a JSON envelope:
//!
//! - **Accounts and mailboxes**: list accounts, mailboxes and unread counts
//! - **Messages**: read the current selection and message content
//! - **Drafts**: create replies and new outgoing messages (never sent)
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Configuration error types
//! - [`jxa`]: Script execution, the response envelope and the startup check
//! - [`mcp`]: MCP protocol implementation
//! - [`tools`]: Mail tool definitions and handlers

pub mod config;
pub mod error;
pub mod jxa;
pub mod mcp;
pub mod tools;
