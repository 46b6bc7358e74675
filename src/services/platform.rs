//! Per-platform application directories.

use std::path::PathBuf;

const APP_DIR: &str = "mcp-more";

/// `{config_dir}/mcp-more`, holding `config.json`.
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// `{data_dir}/mcp-more`.
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// `{data_dir}/mcp-more/logs`.
pub fn get_log_dir() -> PathBuf {
    get_data_dir().join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_are_namespaced() {
        assert!(get_config_dir().ends_with(APP_DIR));
        assert!(get_log_dir().ends_with(PathBuf::from(APP_DIR).join("logs")));
    }
}
