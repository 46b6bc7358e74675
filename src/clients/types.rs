//! Value types exchanged between the client manager and its callers.
//!
//! All types serialize as camelCase JSON so they cross the IPC boundary
//! unchanged.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Identifies one supported client application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDescriptor {
    pub id: String,
    pub display_name: String,
    /// 1-100, higher sorts first.
    pub priority: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ClientDescriptor {
    pub fn new(id: &str, display_name: &str, priority: u8, description: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            priority: priority.clamp(1, 100),
            description: Some(description.to_string()),
        }
    }
}

/// Outcome of probing the host for one client application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub id: String,
    pub display_name: String,
    pub installed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub logs: Vec<String>,
}

impl DetectionResult {
    /// A "not installed" result carrying an unexpected failure.
    pub fn failed(descriptor: &ClientDescriptor, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            id: descriptor.id.clone(),
            display_name: descriptor.display_name.clone(),
            installed: false,
            logs: vec![format!("Detection failed: {}", error)],
            error: Some(error),
            ..Default::default()
        }
    }
}

/// Caller request to register the local server with a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupRequest {
    pub server_url: String,
    pub alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
}

/// Outcome of a mutating operation on a client's config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupResult {
    pub success: bool,
    pub message: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_restart: Option<bool>,
    #[serde(default)]
    pub logs: Vec<String>,
}

/// One entry in a client's config that points at this server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfiguredServerEntry {
    pub alias: String,
    pub url: String,
}

/// Ordered, user-visible trace of one operation.
///
/// Every line is mirrored to `tracing` with the client id attached.
#[derive(Debug, Clone)]
pub struct StepLog {
    client_id: String,
    lines: Vec<String>,
}

impl StepLog {
    pub fn new(client_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            lines: Vec::new(),
        }
    }

    pub fn step(&mut self, line: impl Into<String>) {
        let line = line.into();
        info!(client = %self.client_id, "{}", line);
        self.lines.push(line);
    }

    pub fn warn(&mut self, line: impl Into<String>) {
        let line = line.into();
        warn!(client = %self.client_id, "{}", line);
        self.lines.push(format!("Warning: {}", line));
    }

    pub fn path_step(&mut self, label: &str, path: &Path) {
        self.step(format!("{}: {}", label, path.display()));
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_priority_is_clamped() {
        assert_eq!(ClientDescriptor::new("a", "A", 0, "").priority, 1);
        assert_eq!(ClientDescriptor::new("a", "A", 250, "").priority, 100);
        assert_eq!(ClientDescriptor::new("a", "A", 42, "").priority, 42);
    }

    #[test]
    fn test_detection_result_serializes_camel_case() {
        let result = DetectionResult {
            id: "cursor".into(),
            display_name: "Cursor".into(),
            installed: true,
            config_path: Some(PathBuf::from("/tmp/mcp.json")),
            ..Default::default()
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["displayName"], "Cursor");
        assert_eq!(json["configPath"], "/tmp/mcp.json");
        assert!(json.get("version").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_setup_request_deserializes_without_profile() {
        let req: SetupRequest =
            serde_json::from_str(r#"{"serverUrl":"http://localhost:7195/","alias":"mm"}"#)
                .unwrap();
        assert_eq!(req.alias, "mm");
        assert!(req.profile_id.is_none());
    }

    #[test]
    fn test_failed_detection_is_not_installed() {
        let desc = ClientDescriptor::new("x", "X", 10, "");
        let result = DetectionResult::failed(&desc, "boom");
        assert!(!result.installed);
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert_eq!(result.logs.len(), 1);
    }

    #[test]
    fn test_step_log_keeps_order() {
        let mut log = StepLog::new("cursor");
        log.step("one");
        log.warn("two");
        log.step("three");
        assert_eq!(log.into_lines(), vec!["one", "Warning: two", "three"]);
    }
}
