//! Visual Studio Code: user-level `<config_dir>/Code/User/mcp.json`,
//! `servers.<alias> = { type: "http", url }`.
//!
//! VS Code writes this file as JSONC; edits touch only the alias being
//! registered, so comments and hand formatting elsewhere are kept.

use std::path::PathBuf;

use serde_json::{json, Value};

use super::detection::{self, HostLayout, ProbeTargets};
use super::{config_under, ClientDescriptor, ClientDetector, DetectionResult};

pub struct VsCode {
    descriptor: ClientDescriptor,
    layout: HostLayout,
}

impl VsCode {
    pub fn new(layout: HostLayout) -> Self {
        Self {
            descriptor: ClientDescriptor::new("vscode", "Visual Studio Code", 70, "Code editor with agent mode"),
            layout,
        }
    }

    fn root(&self) -> PathBuf {
        self.layout.config_dir.join("Code")
    }
}

impl ClientDetector for VsCode {
    fn descriptor(&self) -> &ClientDescriptor {
        &self.descriptor
    }

    fn layout(&self) -> &HostLayout {
        &self.layout
    }

    fn config_path(&self) -> Option<PathBuf> {
        config_under(&self.root(), "User/mcp.json")
    }

    fn detect(&self) -> DetectionResult {
        let mut markers = vec![self.root()];
        markers.extend(self.layout.app_markers(&["Visual Studio Code.app", "Microsoft VS Code"]));
        let targets = ProbeTargets {
            markers,
            executable: Some("code"),
        };
        detection::probe(&self.descriptor, &self.layout, &targets, self.config_path())
    }

    fn server_entry(&self, url: &str) -> Value {
        json!({ "type": "http", "url": url })
    }

    fn needs_restart(&self) -> bool {
        false
    }

    fn servers_key(&self) -> &'static str {
        "servers"
    }
}
