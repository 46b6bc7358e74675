use serde::{Deserialize, Serialize};

/// Root application settings, stored as `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub user: UserConfig,
}

/// Local MCP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port_number: u16,
    /// Alias used when a setup request does not name one.
    #[serde(default = "default_alias")]
    pub default_alias: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port_number: default_port(),
            default_alias: default_alias(),
        }
    }
}

/// User preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
        }
    }
}

// ============ Default value functions ============

fn default_port() -> u16 { 7195 }
fn default_alias() -> String { "mcp-more".into() }
fn default_language() -> String { "en".into() }
