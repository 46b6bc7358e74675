//! MCP More: registers the local MCP server with installed AI clients.
//!
//! - [`clients`]: per-client detection and config-file editing
//! - [`config`]: application settings (server port, default alias)
//! - [`commands`]: the JSON command boundary used by the UI and CLI
//! - [`services`]: logging, platform paths and the file-manager opener

pub mod clients;
pub mod commands;
pub mod config;
pub mod services;
