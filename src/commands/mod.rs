pub mod clients;

use serde_json::Value;

/// IPC response format shared with the UI process:
/// { success: bool, data?: any, error?: string }
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct IpcResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IpcResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }

    /// Serialize `value` into a success response.
    pub fn from_serializable<T: serde::Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(format!("Failed to serialize response: {}", e)),
        }
    }
}
