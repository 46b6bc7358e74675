//! Claude Code CLI: user-scope servers in `~/.claude.json`,
//! `mcpServers.<alias> = { type: "http", url }`.
//!
//! The file also holds the CLI's own state (projects, history, flags), all of
//! which must survive a merge.

use std::path::PathBuf;

use serde_json::{json, Value};

use super::detection::{self, HostLayout, ProbeTargets};
use super::{config_under, ClientDescriptor, ClientDetector, DetectionResult};

pub struct ClaudeCode {
    descriptor: ClientDescriptor,
    layout: HostLayout,
}

impl ClaudeCode {
    pub fn new(layout: HostLayout) -> Self {
        Self {
            descriptor: ClientDescriptor::new("claude-code", "Claude Code", 90, "Anthropic's agentic coding CLI"),
            layout,
        }
    }
}

impl ClientDetector for ClaudeCode {
    fn descriptor(&self) -> &ClientDescriptor {
        &self.descriptor
    }

    fn layout(&self) -> &HostLayout {
        &self.layout
    }

    fn config_path(&self) -> Option<PathBuf> {
        config_under(&self.layout.home, ".claude.json")
    }

    fn detect(&self) -> DetectionResult {
        let targets = ProbeTargets {
            markers: vec![self.layout.home.join(".claude")],
            executable: Some("claude"),
        };
        detection::probe(&self.descriptor, &self.layout, &targets, self.config_path())
    }

    fn server_entry(&self, url: &str) -> Value {
        json!({ "type": "http", "url": url })
    }

    fn needs_restart(&self) -> bool {
        false
    }
}
