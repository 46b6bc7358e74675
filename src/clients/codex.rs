//! Codex CLI: `~/.codex/config.toml`, `[mcp_servers.<alias>] url = "..."`.

use std::path::PathBuf;

use serde_json::{json, Value};

use super::detection::{self, HostLayout, ProbeTargets};
use super::{config_under, ClientDescriptor, ClientDetector, ConfigFormat, DetectionResult};

pub struct Codex {
    descriptor: ClientDescriptor,
    layout: HostLayout,
}

impl Codex {
    pub fn new(layout: HostLayout) -> Self {
        Self {
            descriptor: ClientDescriptor::new("codex", "Codex CLI", 50, "OpenAI's coding agent CLI"),
            layout,
        }
    }

    fn root(&self) -> PathBuf {
        self.layout.home.join(".codex")
    }
}

impl ClientDetector for Codex {
    fn descriptor(&self) -> &ClientDescriptor {
        &self.descriptor
    }

    fn layout(&self) -> &HostLayout {
        &self.layout
    }

    fn config_path(&self) -> Option<PathBuf> {
        config_under(&self.root(), "config.toml")
    }

    fn detect(&self) -> DetectionResult {
        let targets = ProbeTargets {
            markers: vec![self.root()],
            executable: Some("codex"),
        };
        detection::probe(&self.descriptor, &self.layout, &targets, self.config_path())
    }

    fn server_entry(&self, url: &str) -> Value {
        json!({ "url": url })
    }

    fn needs_restart(&self) -> bool {
        false
    }

    fn format(&self) -> ConfigFormat {
        ConfigFormat::Toml
    }

    fn servers_key(&self) -> &'static str {
        "mcp_servers"
    }
}
