//! Client manager: orchestrates the per-client detectors.
//!
//! The `ClientManager` owns the static registry of detectors, ordered by
//! descending priority, and fans detection out across them. It keeps no
//! state between calls beyond that registry: every query goes back to the
//! client's config file, and the server port is read from the settings
//! source at call time.
//!
//! Thread-safe: detectors are shared behind `Arc` and probed on blocking
//! worker threads.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{info, warn};

use super::detection::HostLayout;
use super::server_url;
use super::{
    default_detectors, ClientDescriptor, ClientDetector, ClientError, ConfiguredServerEntry, DetectionResult,
    SetupRequest, SetupResult,
};
use crate::config::{AppConfig, SettingsSource};
use crate::services::opener::{DirectoryOpener, SystemOpener};

/// Upper bound for one detector's `detect()`.
pub const DETECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct ClientManager {
    /// Sorted by descending priority, then id.
    detectors: Vec<Arc<dyn ClientDetector>>,
    settings: Arc<dyn SettingsSource>,
    opener: Arc<dyn DirectoryOpener>,
    detect_timeout: Duration,
}

impl ClientManager {
    /// Manager over every supported client on this host.
    pub fn new(settings: Arc<dyn SettingsSource>) -> Self {
        Self::with_detectors(
            default_detectors(&HostLayout::from_host()),
            settings,
            Arc::new(SystemOpener),
        )
    }

    /// Manager over an explicit detector set.
    pub fn with_detectors(
        mut detectors: Vec<Arc<dyn ClientDetector>>,
        settings: Arc<dyn SettingsSource>,
        opener: Arc<dyn DirectoryOpener>,
    ) -> Self {
        detectors.sort_by(|a, b| {
            let (a, b) = (a.descriptor(), b.descriptor());
            b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id))
        });
        Self {
            detectors,
            settings,
            opener,
            detect_timeout: DETECT_TIMEOUT,
        }
    }

    pub fn with_detect_timeout(mut self, timeout: Duration) -> Self {
        self.detect_timeout = timeout;
        self
    }

    /// Live application settings.
    pub fn settings(&self) -> AppConfig {
        self.settings.current()
    }

    pub fn supported_apps(&self) -> Vec<ClientDescriptor> {
        self.detectors.iter().map(|d| d.descriptor().clone()).collect()
    }

    pub fn detector(&self, id: &str) -> Option<Arc<dyn ClientDetector>> {
        self.detectors.iter().find(|d| d.descriptor().id == id).cloned()
    }

    /// Run `op` against a clone of this manager on a blocking worker thread.
    ///
    /// Every config-file read and write goes through here when called from
    /// async code, so the runtime threads never wait on disk.
    pub async fn run_blocking<T, F>(&self, op: F) -> Result<T, ClientError>
    where
        F: FnOnce(&ClientManager) -> Result<T, ClientError> + Send + 'static,
        T: Send + 'static,
    {
        let manager = self.clone();
        tokio::task::spawn_blocking(move || op(&manager))
            .await
            .map_err(|e| ClientError::Worker(e.to_string()))?
    }

    fn require(&self, id: &str) -> Result<Arc<dyn ClientDetector>, ClientError> {
        self.detector(id).ok_or_else(|| ClientError::NotFound(id.to_string()))
    }

    /// Probe every client concurrently.
    ///
    /// A detector that panics or overruns [`DETECT_TIMEOUT`] yields an
    /// `installed: false` result carrying the error; the others are
    /// unaffected. Results keep registry (priority) order.
    pub async fn detect_all_apps(&self) -> Vec<DetectionResult> {
        let probes = self
            .detectors
            .iter()
            .cloned()
            .map(|d| run_detection(d, self.detect_timeout));
        let results = join_all(probes).await;
        info!(
            "Detected {} of {} clients",
            results.iter().filter(|r| r.installed).count(),
            results.len()
        );
        results
    }

    pub async fn detect_app(&self, id: &str) -> Result<DetectionResult, ClientError> {
        let detector = self.require(id)?;
        Ok(run_detection(detector, self.detect_timeout).await)
    }

    /// Installed clients only; `limit <= 0` or `None` means no limit.
    pub async fn installed_apps(&self, limit: Option<i64>) -> Vec<DetectionResult> {
        let mut installed: Vec<DetectionResult> = self
            .detect_all_apps()
            .await
            .into_iter()
            .filter(|r| r.installed)
            .collect();
        if let Some(limit) = limit.filter(|n| *n > 0) {
            installed.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        installed
    }

    /// A request for the local server built from the live settings.
    pub fn default_setup_request(&self, alias: Option<&str>, profile_id: Option<&str>) -> SetupRequest {
        let settings = self.settings.current();
        SetupRequest {
            server_url: server_url::base_url(settings.server.port_number),
            alias: alias
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(String::from)
                .unwrap_or(settings.server.default_alias),
            profile_id: profile_id.map(String::from),
        }
    }

    /// Delegates to the detector's `setup`; no extra transaction here.
    pub fn setup_app(&self, id: &str, request: &SetupRequest) -> Result<SetupResult, ClientError> {
        let detector = self.require(id)?;
        let result = detector.setup(request);
        if result.success {
            info!(client = id, alias = %request.alias, "Setup succeeded");
        } else {
            warn!(client = id, alias = %request.alias, "Setup failed: {}", result.message);
        }
        Ok(result)
    }

    pub fn remove_app_server(&self, id: &str, alias: &str) -> Result<SetupResult, ClientError> {
        Ok(self.require(id)?.remove_server(alias))
    }

    /// Reveal the client's config directory (or its nearest existing
    /// ancestor) in the file manager. Returns the directory opened.
    pub fn open_config_directory(&self, id: &str) -> Result<PathBuf, ClientError> {
        let detector = self.require(id)?;
        let config_path = detector
            .config_path()
            .ok_or_else(|| ClientError::NoConfigPath(detector.descriptor().display_name.clone()))?;
        let dir = config_path
            .parent()
            .and_then(|p| p.ancestors().find(|a| a.is_dir()))
            .map(Path::to_path_buf)
            .ok_or_else(|| ClientError::NoConfigPath(detector.descriptor().display_name.clone()))?;
        self.opener
            .open(&dir)
            .map_err(|message| ClientError::OpenFailed { path: dir.clone(), message })?;
        Ok(dir)
    }

    pub fn backup_app_config(&self, id: &str) -> Result<Option<PathBuf>, ClientError> {
        self.require(id)?.backup_config()
    }

    pub fn list_app_backups(&self, id: &str) -> Result<Vec<PathBuf>, ClientError> {
        Ok(self.require(id)?.list_backups())
    }

    pub fn is_app_configured(&self, id: &str, alias: &str) -> Result<bool, ClientError> {
        let detector = self.require(id)?;
        let port = self.settings.current().server.port_number;
        Ok(detector.is_configured(alias, port))
    }

    pub fn app_configured_servers(&self, id: &str) -> Result<Vec<ConfiguredServerEntry>, ClientError> {
        let detector = self.require(id)?;
        let port = self.settings.current().server.port_number;
        Ok(detector.configured_servers(port))
    }

    pub fn verify_app(&self, id: &str, alias: &str, url: &str) -> Result<bool, ClientError> {
        Ok(self.require(id)?.verify(alias, url))
    }
}

async fn run_detection(detector: Arc<dyn ClientDetector>, timeout: Duration) -> DetectionResult {
    let descriptor = detector.descriptor().clone();
    let handle = tokio::task::spawn_blocking(move || detector.detect());

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => {
            let reason = if join_err.is_panic() {
                panic_message(join_err.into_panic())
            } else {
                join_err.to_string()
            };
            warn!(client = %descriptor.id, "Detector crashed: {}", reason);
            DetectionResult::failed(&descriptor, format!("detector crashed: {}", reason))
        }
        Err(_) => {
            let err = ClientError::Timeout(format!("Detection of {}", descriptor.display_name));
            warn!(client = %descriptor.id, "{}", err);
            DetectionResult::failed(&descriptor, err.to_string())
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::cursor::Cursor;
    use crate::config::StaticSettings;
    use serde_json::{json, Value};
    use std::fs;
    use std::sync::Mutex;

    const PORT: u16 = 7195;

    /// Records directories instead of launching a file manager.
    #[derive(Default)]
    struct RecordingOpener(Mutex<Vec<PathBuf>>);

    impl DirectoryOpener for RecordingOpener {
        fn open(&self, dir: &Path) -> Result<(), String> {
            self.0.lock().unwrap().push(dir.to_path_buf());
            Ok(())
        }
    }

    /// A detector with scripted `detect` behavior.
    struct Scripted {
        descriptor: ClientDescriptor,
        layout: HostLayout,
        mode: Mode,
    }

    enum Mode {
        Installed,
        Absent,
        Panic,
        Slow(Duration),
    }

    impl Scripted {
        fn boxed(id: &str, priority: u8, mode: Mode) -> Arc<dyn ClientDetector> {
            Arc::new(Self {
                descriptor: ClientDescriptor::new(id, id, priority, "scripted"),
                layout: HostLayout::rooted(Path::new("/nonexistent")),
                mode,
            })
        }
    }

    impl ClientDetector for Scripted {
        fn descriptor(&self) -> &ClientDescriptor {
            &self.descriptor
        }
        fn layout(&self) -> &HostLayout {
            &self.layout
        }
        fn config_path(&self) -> Option<PathBuf> {
            None
        }
        fn detect(&self) -> DetectionResult {
            match self.mode {
                Mode::Panic => panic!("probe exploded"),
                Mode::Slow(d) => std::thread::sleep(d),
                _ => {}
            }
            DetectionResult {
                id: self.descriptor.id.clone(),
                display_name: self.descriptor.display_name.clone(),
                installed: matches!(self.mode, Mode::Installed),
                version: Some("1.0.0".into()),
                ..Default::default()
            }
        }
        fn server_entry(&self, url: &str) -> Value {
            json!({ "url": url })
        }
        fn needs_restart(&self) -> bool {
            false
        }
    }

    fn scripted_manager(detectors: Vec<Arc<dyn ClientDetector>>) -> ClientManager {
        ClientManager::with_detectors(
            detectors,
            Arc::new(StaticSettings::with_port(PORT)),
            Arc::new(RecordingOpener::default()),
        )
    }

    fn cursor_manager() -> (tempfile::TempDir, ClientManager, Arc<RecordingOpener>) {
        let dir = tempfile::tempdir().unwrap();
        let layout = HostLayout::rooted(dir.path());
        fs::create_dir_all(layout.home.join(".cursor")).unwrap();
        let opener = Arc::new(RecordingOpener::default());
        let manager = ClientManager::with_detectors(
            vec![Arc::new(Cursor::new(layout))],
            Arc::new(StaticSettings::with_port(PORT)),
            opener.clone(),
        );
        (dir, manager, opener)
    }

    #[test]
    fn test_supported_apps_sorted_by_priority() {
        let manager = scripted_manager(vec![
            Scripted::boxed("low", 10, Mode::Absent),
            Scripted::boxed("high", 90, Mode::Absent),
            Scripted::boxed("mid", 50, Mode::Absent),
        ]);
        let ids: Vec<String> = manager.supported_apps().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_default_registry_order() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ClientManager::with_detectors(
            default_detectors(&HostLayout::rooted(dir.path())),
            Arc::new(StaticSettings::default()),
            Arc::new(RecordingOpener::default()),
        );
        let ids: Vec<String> = manager.supported_apps().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["claude-desktop", "claude-code", "cursor", "vscode", "windsurf", "codex"]);
    }

    #[tokio::test]
    async fn test_detect_all_survives_a_crashing_detector() {
        let manager = scripted_manager(vec![
            Scripted::boxed("a", 90, Mode::Installed),
            Scripted::boxed("boom", 50, Mode::Panic),
            Scripted::boxed("c", 10, Mode::Absent),
        ]);
        let results = manager.detect_all_apps().await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "a");
        assert!(results[0].installed);
        assert_eq!(results[0].version.as_deref(), Some("1.0.0"));

        assert_eq!(results[1].id, "boom");
        assert!(!results[1].installed);
        assert!(results[1].error.as_deref().unwrap().contains("probe exploded"));

        assert_eq!(results[2].id, "c");
        assert!(!results[2].installed);
        assert!(results[2].error.is_none());
    }

    #[tokio::test]
    async fn test_slow_detector_degrades_to_not_installed() {
        let manager = scripted_manager(vec![
            Scripted::boxed("slow", 50, Mode::Slow(Duration::from_millis(500))),
            Scripted::boxed("fast", 40, Mode::Installed),
        ])
        .with_detect_timeout(Duration::from_millis(50));

        let results = manager.detect_all_apps().await;
        assert!(!results[0].installed);
        assert!(results[0].error.as_deref().unwrap().contains("timed out"));
        assert!(results[1].installed);
    }

    #[tokio::test]
    async fn test_installed_apps_filter_and_limit() {
        let manager = scripted_manager(vec![
            Scripted::boxed("a", 90, Mode::Installed),
            Scripted::boxed("b", 80, Mode::Absent),
            Scripted::boxed("c", 70, Mode::Installed),
            Scripted::boxed("d", 60, Mode::Installed),
        ]);
        let ids = |rs: Vec<DetectionResult>| rs.into_iter().map(|r| r.id).collect::<Vec<_>>();

        assert_eq!(ids(manager.installed_apps(None).await), vec!["a", "c", "d"]);
        assert_eq!(ids(manager.installed_apps(Some(2)).await), vec!["a", "c"]);
        assert_eq!(ids(manager.installed_apps(Some(0)).await), vec!["a", "c", "d"]);
        assert_eq!(ids(manager.installed_apps(Some(-3)).await), vec!["a", "c", "d"]);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let (_dir, manager, _) = cursor_manager();
        assert!(manager.detect_app("zed").await.unwrap_err().is_not_found());
        let req = manager.default_setup_request(Some("mm"), None);
        assert!(manager.setup_app("zed", &req).unwrap_err().is_not_found());
        assert!(manager.is_app_configured("zed", "mm").unwrap_err().is_not_found());
        assert!(manager.app_configured_servers("zed").unwrap_err().is_not_found());
        assert!(manager.backup_app_config("zed").unwrap_err().is_not_found());
        assert!(manager.open_config_directory("zed").unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_every_default_client_reports_absence_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ClientManager::with_detectors(
            default_detectors(&HostLayout::rooted(dir.path())),
            Arc::new(StaticSettings::default()),
            Arc::new(RecordingOpener::default()),
        );
        for app in manager.supported_apps() {
            let result = manager.detect_app(&app.id).await.unwrap();
            assert!(!result.installed, "{} should be absent", app.id);
            assert!(result.error.is_none(), "{}: {:?}", app.id, result.error);
        }
    }

    #[test]
    fn test_default_setup_request_uses_live_settings() {
        let (_dir, manager, _) = cursor_manager();
        let req = manager.default_setup_request(None, None);
        assert_eq!(req.server_url, "http://localhost:7195/");
        assert_eq!(req.alias, "mcp-more");

        let req = manager.default_setup_request(Some("mm"), Some("p"));
        assert_eq!(req.alias, "mm");
        assert_eq!(req.profile_id.as_deref(), Some("p"));
    }

    #[test]
    fn test_setup_scenario_fresh_file() {
        let (_dir, manager, _) = cursor_manager();
        let req = manager.default_setup_request(Some("mm"), None);
        let result = manager.setup_app("cursor", &req).unwrap();

        assert!(result.success);
        assert!(result.backup_path.is_none());
        assert!(result.config_path.as_ref().unwrap().exists());
        assert_eq!(
            manager.app_configured_servers("cursor").unwrap(),
            vec![ConfiguredServerEntry { alias: "mm".into(), url: "http://localhost:7195/".into() }]
        );
        assert!(manager.is_app_configured("cursor", "mm").unwrap());
        assert!(manager.verify_app("cursor", "mm", "http://localhost:7195/").unwrap());
    }

    #[test]
    fn test_setup_twice_is_idempotent() {
        let (_dir, manager, _) = cursor_manager();
        let req = manager.default_setup_request(Some("mm"), None);
        manager.setup_app("cursor", &req).unwrap();
        let first = manager.app_configured_servers("cursor").unwrap();
        manager.setup_app("cursor", &req).unwrap();
        let second = manager.app_configured_servers("cursor").unwrap();
        assert_eq!(first, second);
        assert_eq!(manager.list_app_backups("cursor").unwrap().len(), 1);
    }

    #[test]
    fn test_open_config_directory_uses_nearest_existing_dir() {
        let (dir, manager, opener) = cursor_manager();
        let opened = manager.open_config_directory("cursor").unwrap();
        assert_eq!(opened, dir.path().join("home").join(".cursor"));
        assert_eq!(opener.0.lock().unwrap().as_slice(), &[opened]);
    }

    #[test]
    fn test_open_config_directory_without_path() {
        let manager = scripted_manager(vec![Scripted::boxed("a", 1, Mode::Absent)]);
        let err = manager.open_config_directory("a").unwrap_err();
        assert!(matches!(err, ClientError::NoConfigPath(_)));
    }

    #[test]
    fn test_backup_app_config() {
        let (_dir, manager, _) = cursor_manager();
        assert_eq!(manager.backup_app_config("cursor").unwrap(), None);

        let path = manager.detector("cursor").unwrap().config_path().unwrap();
        fs::write(&path, "{}").unwrap();
        let backup = manager.backup_app_config("cursor").unwrap().unwrap();
        assert_eq!(fs::read_to_string(backup).unwrap(), "{}");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_run_blocking_leaves_the_runtime_thread() {
        let (_dir, manager, _) = cursor_manager();
        let runtime_thread = std::thread::current().id();

        let (worker_thread, result) = manager
            .run_blocking(|m| {
                let req = m.default_setup_request(Some("mm"), None);
                Ok((std::thread::current().id(), m.setup_app("cursor", &req)?))
            })
            .await
            .unwrap();
        assert_ne!(worker_thread, runtime_thread);
        assert!(result.success);

        let err = manager.run_blocking(|m| m.backup_app_config("zed")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_is_configured_follows_port_in_file() {
        let (_dir, manager, _) = cursor_manager();
        let path = manager.detector("cursor").unwrap().config_path().unwrap();

        fs::write(&path, r#"{"mcpServers":{"mm":{"url":"http://localhost:9999/"}}}"#).unwrap();
        assert!(!manager.is_app_configured("cursor", "mm").unwrap());

        fs::write(&path, r#"{"mcpServers":{"mm":{"url":"http://localhost:7195/"}}}"#).unwrap();
        assert!(manager.is_app_configured("cursor", "mm").unwrap());
    }
}
