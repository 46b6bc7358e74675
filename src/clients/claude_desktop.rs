//! Claude Desktop: `<config_dir>/Claude/claude_desktop_config.json`.
//!
//! Claude Desktop only launches stdio servers from its config file, so the
//! local HTTP endpoint is reached through the `mcp-remote` bridge:
//! `mcpServers.<alias> = { command: "npx", args: ["-y", "mcp-remote", url] }`.

use std::path::PathBuf;

use serde_json::{json, Value};

use super::detection::{self, HostLayout, ProbeTargets};
use super::{config_under, ClientDescriptor, ClientDetector, DetectionResult};

const BRIDGE_PACKAGE: &str = "mcp-remote";

pub struct ClaudeDesktop {
    descriptor: ClientDescriptor,
    layout: HostLayout,
}

impl ClaudeDesktop {
    pub fn new(layout: HostLayout) -> Self {
        Self {
            descriptor: ClientDescriptor::new("claude-desktop", "Claude Desktop", 100, "Anthropic's desktop chat app"),
            layout,
        }
    }

    fn root(&self) -> PathBuf {
        self.layout.config_dir.join("Claude")
    }
}

impl ClientDetector for ClaudeDesktop {
    fn descriptor(&self) -> &ClientDescriptor {
        &self.descriptor
    }

    fn layout(&self) -> &HostLayout {
        &self.layout
    }

    fn config_path(&self) -> Option<PathBuf> {
        config_under(&self.root(), "claude_desktop_config.json")
    }

    fn detect(&self) -> DetectionResult {
        let mut markers = vec![self.root()];
        markers.extend(self.layout.app_markers(&["Claude.app", "AnthropicClaude", "Claude"]));
        let targets = ProbeTargets {
            markers,
            executable: None,
        };
        detection::probe(&self.descriptor, &self.layout, &targets, self.config_path())
    }

    fn server_entry(&self, url: &str) -> Value {
        json!({
            "command": "npx",
            "args": ["-y", BRIDGE_PACKAGE, url]
        })
    }

    fn needs_restart(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ConfiguredServerEntry, SetupRequest};

    #[test]
    fn test_setup_writes_bridge_entry() {
        let dir = tempfile::tempdir().unwrap();
        let layout = HostLayout::rooted(dir.path());
        std::fs::create_dir_all(layout.config_dir.join("Claude")).unwrap();
        let claude = ClaudeDesktop::new(layout);

        let result = claude.setup(&SetupRequest {
            server_url: "http://localhost:7195/".into(),
            alias: "mm".into(),
            profile_id: None,
        });
        assert!(result.success, "{:?}", result);

        let raw = std::fs::read_to_string(claude.config_path().unwrap()).unwrap();
        let written: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            written["mcpServers"]["mm"],
            json!({ "command": "npx", "args": ["-y", "mcp-remote", "http://localhost:7195/"] })
        );
        assert_eq!(
            claude.configured_servers(7195),
            vec![ConfiguredServerEntry { alias: "mm".into(), url: "http://localhost:7195/".into() }]
        );
    }

    #[test]
    fn test_detect_from_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let layout = HostLayout::rooted(dir.path());
        let claude = ClaudeDesktop::new(layout.clone());
        let absent = claude.detect();
        assert!(!absent.installed);
        assert!(absent.error.is_none());

        std::fs::create_dir_all(layout.config_dir.join("Claude")).unwrap();
        let present = claude.detect();
        assert!(present.installed);
        assert!(present.config_path.is_some());
    }
}
