//! Windsurf editor: `~/.codeium/windsurf/mcp_config.json`,
//! `mcpServers.<alias> = { serverUrl }`.

use std::path::PathBuf;

use serde_json::{json, Value};

use super::detection::{self, HostLayout, ProbeTargets};
use super::{config_under, ClientDescriptor, ClientDetector, DetectionResult};

pub struct Windsurf {
    descriptor: ClientDescriptor,
    layout: HostLayout,
}

impl Windsurf {
    pub fn new(layout: HostLayout) -> Self {
        Self {
            descriptor: ClientDescriptor::new("windsurf", "Windsurf", 60, "Codeium's agentic editor"),
            layout,
        }
    }

    fn root(&self) -> PathBuf {
        self.layout.home.join(".codeium").join("windsurf")
    }
}

impl ClientDetector for Windsurf {
    fn descriptor(&self) -> &ClientDescriptor {
        &self.descriptor
    }

    fn layout(&self) -> &HostLayout {
        &self.layout
    }

    fn config_path(&self) -> Option<PathBuf> {
        config_under(&self.root(), "mcp_config.json")
    }

    fn detect(&self) -> DetectionResult {
        let mut markers = vec![self.root()];
        markers.extend(self.layout.app_markers(&["Windsurf.app", "Windsurf", "windsurf"]));
        let targets = ProbeTargets {
            markers,
            executable: Some("windsurf"),
        };
        detection::probe(&self.descriptor, &self.layout, &targets, self.config_path())
    }

    fn server_entry(&self, url: &str) -> Value {
        json!({ "serverUrl": url })
    }

    fn needs_restart(&self) -> bool {
        true
    }
}
