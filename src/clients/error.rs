use std::path::PathBuf;

use thiserror::Error;

/// Failures of the client configuration layer.
///
/// "Not installed" is deliberately absent: it is a normal detection outcome.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Unknown client: {0}")]
    NotFound(String),

    #[error("No config location for {0}; is it installed?")]
    NoConfigPath(String),

    #[error("Invalid setup request: {0}")]
    InvalidRequest(String),

    #[error("Failed to parse {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to back up {path}: {source}")]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {message}")]
    WriteFailed { path: PathBuf, message: String },

    #[error("Entry '{alias}' does not point at {url} after writing")]
    VerifyFailed { alias: String, url: String },

    #[error("{0} timed out")]
    Timeout(String),

    #[error("Failed to open {path}: {message}")]
    OpenFailed { path: PathBuf, message: String },

    #[error("Background task failed: {0}")]
    Worker(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_descriptive() {
        let err = ClientError::NotFound("zed".into());
        assert_eq!(err.to_string(), "Unknown client: zed");
        assert!(err.is_not_found());

        let err = ClientError::ConfigParse {
            path: PathBuf::from("/x/mcp.json"),
            message: "expected value".into(),
        };
        assert_eq!(err.to_string(), "Failed to parse /x/mcp.json: expected value");
        assert!(!err.is_not_found());
    }
}
