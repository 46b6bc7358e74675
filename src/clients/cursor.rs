//! Cursor editor: `~/.cursor/mcp.json`, `mcpServers.<alias> = { url }`.

use std::path::PathBuf;

use serde_json::{json, Value};

use super::detection::{self, HostLayout, ProbeTargets};
use super::{config_under, ClientDescriptor, ClientDetector, DetectionResult};

pub struct Cursor {
    descriptor: ClientDescriptor,
    layout: HostLayout,
}

impl Cursor {
    pub fn new(layout: HostLayout) -> Self {
        Self {
            descriptor: ClientDescriptor::new("cursor", "Cursor", 80, "AI code editor"),
            layout,
        }
    }

    fn root(&self) -> PathBuf {
        self.layout.home.join(".cursor")
    }
}

impl ClientDetector for Cursor {
    fn descriptor(&self) -> &ClientDescriptor {
        &self.descriptor
    }

    fn layout(&self) -> &HostLayout {
        &self.layout
    }

    fn config_path(&self) -> Option<PathBuf> {
        config_under(&self.root(), "mcp.json")
    }

    fn detect(&self) -> DetectionResult {
        let mut markers = vec![self.root()];
        markers.extend(self.layout.app_markers(&["Cursor.app", "cursor", "Cursor"]));
        let targets = ProbeTargets {
            markers,
            executable: Some("cursor"),
        };
        detection::probe(&self.descriptor, &self.layout, &targets, self.config_path())
    }

    fn server_entry(&self, url: &str) -> Value {
        json!({ "url": url })
    }

    fn needs_restart(&self) -> bool {
        true
    }
}
