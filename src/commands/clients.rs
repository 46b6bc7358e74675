//! Client configuration commands exposed to the UI process.
//!
//! Each command resolves to an [`IpcResponse`]. Commands that touch config
//! files run on blocking worker threads. Detector failures travel
//! inside the returned result objects (`error`, `logs`); only unknown client
//! ids, bad arguments and serialization problems become `success: false`.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::IpcResponse;
use crate::clients::{ClientError, ClientManager, SetupRequest};

/// Setup arguments as sent by the UI. Anything omitted is filled in from the
/// live settings.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupArgs {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub server_url: Option<String>,
}

impl SetupArgs {
    fn into_request(self, manager: &ClientManager) -> SetupRequest {
        let mut request = manager.default_setup_request(self.alias.as_deref(), self.profile_id.as_deref());
        if let Some(url) = self.server_url {
            request.server_url = url;
        }
        request
    }
}

fn reject(err: ClientError) -> IpcResponse {
    warn!("Command rejected: {}", err);
    IpcResponse::err(err.to_string())
}

fn respond<T>(result: Result<T, ClientError>, ok: impl FnOnce(T) -> IpcResponse) -> IpcResponse {
    match result {
        Ok(value) => ok(value),
        Err(e) => reject(e),
    }
}

pub fn get_supported_apps(manager: &ClientManager) -> IpcResponse {
    IpcResponse::from_serializable(&manager.supported_apps())
}

pub async fn detect_all_apps(manager: &ClientManager) -> IpcResponse {
    IpcResponse::from_serializable(&manager.detect_all_apps().await)
}

pub async fn detect_app(manager: &ClientManager, id: &str) -> IpcResponse {
    match manager.detect_app(id).await {
        Ok(result) => IpcResponse::from_serializable(&result),
        Err(e) => reject(e),
    }
}

pub async fn get_installed_apps(manager: &ClientManager, limit: Option<i64>) -> IpcResponse {
    IpcResponse::from_serializable(&manager.installed_apps(limit).await)
}

/// Register the local server with one client.
///
/// The URL and port are taken from the settings at call time unless the
/// caller passes `serverUrl` explicitly.
pub async fn setup_app(manager: &ClientManager, id: &str, args: SetupArgs) -> IpcResponse {
    let id = id.to_string();
    let result = manager
        .run_blocking(move |m| {
            let request = args.into_request(m);
            m.setup_app(&id, &request)
        })
        .await;
    respond(result, |r| IpcResponse::from_serializable(&r))
}

pub async fn remove_app_server(manager: &ClientManager, id: &str, alias: &str) -> IpcResponse {
    let (id, alias) = (id.to_string(), alias.to_string());
    let result = manager.run_blocking(move |m| m.remove_app_server(&id, &alias)).await;
    respond(result, |r| IpcResponse::from_serializable(&r))
}

pub async fn open_config_directory(manager: &ClientManager, id: &str) -> IpcResponse {
    let id = id.to_string();
    let result = manager.run_blocking(move |m| m.open_config_directory(&id)).await;
    respond(result, |dir| IpcResponse::ok(json!({ "opened": dir })))
}

pub async fn backup_app_config(manager: &ClientManager, id: &str) -> IpcResponse {
    let id = id.to_string();
    let result = manager.run_blocking(move |m| m.backup_app_config(&id)).await;
    respond(result, |path| IpcResponse::ok(json!({ "backupPath": path })))
}

pub async fn list_app_backups(manager: &ClientManager, id: &str) -> IpcResponse {
    let id = id.to_string();
    let result = manager.run_blocking(move |m| m.list_app_backups(&id)).await;
    respond(result, |paths| IpcResponse::ok(json!({ "backups": paths })))
}

pub async fn is_app_configured(manager: &ClientManager, id: &str, alias: &str) -> IpcResponse {
    let (id, alias) = (id.to_string(), alias.to_string());
    let result = manager.run_blocking(move |m| m.is_app_configured(&id, &alias)).await;
    respond(result, |configured| IpcResponse::ok(json!({ "configured": configured })))
}

pub async fn get_app_configured_servers(manager: &ClientManager, id: &str) -> IpcResponse {
    let id = id.to_string();
    let result = manager.run_blocking(move |m| m.app_configured_servers(&id)).await;
    respond(result, |servers| IpcResponse::from_serializable(&servers))
}

pub async fn verify_app(manager: &ClientManager, id: &str, alias: &str, url: &str) -> IpcResponse {
    let (id, alias, url) = (id.to_string(), alias.to_string(), url.to_string());
    let result = manager.run_blocking(move |m| m.verify_app(&id, &alias, &url)).await;
    respond(result, |verified| IpcResponse::ok(json!({ "verified": verified })))
}

// ---------------------------------------------------------------------------
// JSON dispatch
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct IdArgs {
    id: String,
}

#[derive(Deserialize)]
struct AliasArgs {
    id: String,
    alias: String,
}

#[derive(Deserialize)]
struct VerifyArgs {
    id: String,
    alias: String,
    url: String,
}

#[derive(Deserialize, Default)]
struct LimitArgs {
    #[serde(default)]
    limit: Option<i64>,
}

#[derive(Deserialize)]
struct SetupCommandArgs {
    id: String,
    #[serde(flatten)]
    setup: SetupArgs,
}

fn parse<T: DeserializeOwned>(command: &str, args: Value) -> Result<T, IpcResponse> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args)
        .map_err(|e| IpcResponse::err(format!("Invalid arguments for {}: {}", command, e)))
}

/// Route a named command with JSON arguments.
pub async fn dispatch(manager: &ClientManager, command: &str, args: Value) -> IpcResponse {
    macro_rules! args {
        ($ty:ty) => {
            match parse::<$ty>(command, args) {
                Ok(a) => a,
                Err(resp) => return resp,
            }
        };
    }

    match command {
        "get_supported_apps" => get_supported_apps(manager),
        "detect_all_apps" => detect_all_apps(manager).await,
        "detect_app" => {
            let a = args!(IdArgs);
            detect_app(manager, &a.id).await
        }
        "get_installed_apps" => {
            let a = args!(LimitArgs);
            get_installed_apps(manager, a.limit).await
        }
        "setup_app" => {
            let a = args!(SetupCommandArgs);
            setup_app(manager, &a.id, a.setup).await
        }
        "remove_app_server" => {
            let a = args!(AliasArgs);
            remove_app_server(manager, &a.id, &a.alias).await
        }
        "open_config_directory" => {
            let a = args!(IdArgs);
            open_config_directory(manager, &a.id).await
        }
        "backup_app_config" => {
            let a = args!(IdArgs);
            backup_app_config(manager, &a.id).await
        }
        "list_app_backups" => {
            let a = args!(IdArgs);
            list_app_backups(manager, &a.id).await
        }
        "is_app_configured" => {
            let a = args!(AliasArgs);
            is_app_configured(manager, &a.id, &a.alias).await
        }
        "get_app_configured_servers" => {
            let a = args!(IdArgs);
            get_app_configured_servers(manager, &a.id).await
        }
        "verify_app" => {
            let a = args!(VerifyArgs);
            verify_app(manager, &a.id, &a.alias, &a.url).await
        }
        other => IpcResponse::err(format!("Unknown command: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{default_detectors, HostLayout};
    use crate::config::StaticSettings;
    use crate::services::opener::DirectoryOpener;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    struct NoopOpener;

    impl DirectoryOpener for NoopOpener {
        fn open(&self, _dir: &Path) -> Result<(), String> {
            Ok(())
        }
    }

    fn manager() -> (tempfile::TempDir, ClientManager) {
        let dir = tempfile::tempdir().unwrap();
        let layout = HostLayout::rooted(dir.path());
        fs::create_dir_all(layout.home.join(".cursor")).unwrap();
        let manager = ClientManager::with_detectors(
            default_detectors(&layout),
            Arc::new(StaticSettings::with_port(7195)),
            Arc::new(NoopOpener),
        );
        (dir, manager)
    }

    #[tokio::test]
    async fn test_dispatch_setup_then_list() {
        let (_dir, manager) = manager();
        let resp = dispatch(&manager, "setup_app", json!({ "id": "cursor", "alias": "mm" })).await;
        assert!(resp.success, "{:?}", resp.error);
        let data = resp.data.unwrap();
        assert_eq!(data["success"], true);
        assert!(data.get("backupPath").is_none());

        let resp = dispatch(&manager, "get_app_configured_servers", json!({ "id": "cursor" })).await;
        assert_eq!(resp.data.unwrap(), json!([{ "alias": "mm", "url": "http://localhost:7195/" }]));

        let resp = dispatch(&manager, "is_app_configured", json!({ "id": "cursor", "alias": "mm" })).await;
        assert_eq!(resp.data.unwrap()["configured"], true);
    }

    #[tokio::test]
    async fn test_dispatch_setup_failure_is_a_resolved_result() {
        let (_dir, manager) = manager();
        // Windsurf's config root does not exist in this layout.
        let resp = dispatch(&manager, "setup_app", json!({ "id": "windsurf" })).await;
        assert!(resp.success);
        let data = resp.data.unwrap();
        assert_eq!(data["success"], false);
        assert!(data["error"].as_str().unwrap().contains("Windsurf"));
    }

    #[tokio::test]
    async fn test_dispatch_rejects_unknown_id() {
        let (_dir, manager) = manager();
        let resp = dispatch(&manager, "detect_app", json!({ "id": "zed" })).await;
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("Unknown client: zed"));
    }

    #[tokio::test]
    async fn test_dispatch_rejects_bad_args_and_unknown_command() {
        let (_dir, manager) = manager();
        let resp = dispatch(&manager, "detect_app", json!({})).await;
        assert!(!resp.success);
        assert!(resp.error.unwrap().starts_with("Invalid arguments for detect_app"));

        let resp = dispatch(&manager, "reformat_disk", Value::Null).await;
        assert!(!resp.success);
    }

    #[tokio::test]
    async fn test_dispatch_detection() {
        let (_dir, manager) = manager();
        let resp = dispatch(&manager, "detect_all_apps", Value::Null).await;
        let all = resp.data.unwrap();
        assert_eq!(all.as_array().unwrap().len(), 6);

        let resp = dispatch(&manager, "get_installed_apps", Value::Null).await;
        let installed = resp.data.unwrap();
        let ids: Vec<&str> = installed.as_array().unwrap().iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["cursor"]);
    }

    #[tokio::test]
    async fn test_dispatch_backup_without_file() {
        let (_dir, manager) = manager();
        let resp = dispatch(&manager, "backup_app_config", json!({ "id": "cursor" })).await;
        assert!(resp.success);
        assert_eq!(resp.data.unwrap(), json!({ "backupPath": null }));
    }

    #[test]
    fn test_setup_args_explicit_url_wins() {
        let (_dir, manager) = manager();
        let args = SetupArgs {
            alias: None,
            profile_id: None,
            server_url: Some("http://localhost:9000/".into()),
        };
        let req = args.into_request(&manager);
        assert_eq!(req.server_url, "http://localhost:9000/");
        assert_eq!(req.alias, "mcp-more");
    }
}
