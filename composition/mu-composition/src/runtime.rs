//! 更新ランタイムの配線。
//! アダプタを一度だけ生成し、ユースケースごとにアプリケーション層のサービスへ渡す。

use std::path::{Path, PathBuf};
use std::time::Duration;

use mu_adapter_clock::ClockAdapter;
use mu_adapter_fs::FsAdapter;
use mu_adapter_image::ImageResourceAdapter;
use mu_adapter_paths as paths;
use mu_adapter_process::{
    ContextCaptureAdapter, InstallerRunnerAdapter, PrivilegeProbeAdapter, ProcessLauncherAdapter,
    ProcessScannerAdapter,
};
use mu_app::{DiscoveryDeps, DiscoveryService, SessionDeps, UpdateSessionService, VerifyService};
use mu_domain::DomainError;
use mu_domain::model::{
    CancelToken, InstallerRejection, RuntimeInfo, SessionReport, UpdaterConfig,
};
use mu_domain::port::driven::{
    ConfigRepository, FileInspector, InstallerSource, Operator, SessionLog,
};
use mu_domain::port::driving::{
    DiscoveryReport, DiscoveryUseCase, DownloadPlan, UpdateRequest, UpdateUseCase,
    VerifyInstallerUseCase,
};
use mu_log_utils::write_lifecycle_line;

use crate::system;

const COMPONENT: &str = "RUNTIME";

/// 更新用の依存関係一式
pub struct UpdaterRuntime {
    config: UpdaterConfig,
    info: RuntimeInfo,
    fs: FsAdapter,
    image: ImageResourceAdapter,
    scanner: ProcessScannerAdapter,
    capture: ContextCaptureAdapter,
    runner: InstallerRunnerAdapter,
    launcher: ProcessLauncherAdapter,
    privilege: PrivilegeProbeAdapter,
    clock: ClockAdapter,
}

impl UpdaterRuntime {
    /// 既定のデータディレクトリで作成（設定ファイルがなければ既定値）
    pub fn new() -> Result<Self, DomainError> {
        Self::with_data_dir(paths::default_data_dir())
    }

    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let fs = FsAdapter::new(data_dir);
        let config = fs.load()?;
        let privilege = PrivilegeProbeAdapter::new();
        let info = system::detect_runtime_info(&privilege);
        write_lifecycle_line(
            COMPONENT,
            &format!(
                "{} started (elevated={}, user={})",
                info.banner(),
                info.elevated,
                info.identity.as_deref().unwrap_or("<unknown>")
            ),
        );
        Ok(Self {
            capture: ContextCaptureAdapter::new(info.elevated),
            config,
            info,
            fs,
            image: ImageResourceAdapter::new(),
            scanner: ProcessScannerAdapter::new(),
            runner: InstallerRunnerAdapter::new(),
            launcher: ProcessLauncherAdapter::new(),
            privilege,
            clock: ClockAdapter::new(),
        })
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    pub fn runtime_info(&self) -> &RuntimeInfo {
        &self.info
    }

    pub fn config_path(&self) -> &Path {
        self.fs.config_path()
    }

    pub fn config_exists(&self) -> bool {
        self.fs.exists()
    }

    pub fn save_config(&self, config: &UpdaterConfig) -> Result<(), DomainError> {
        self.fs.save(config)?;
        write_lifecycle_line(
            COMPONENT,
            &format!("config saved to {}", self.fs.config_path().display()),
        );
        Ok(())
    }

    /// 環境情報をセッションログの冒頭に書く
    pub fn log_preamble(&self, log: &dyn SessionLog) {
        for line in system::describe(&self.info) {
            log.append(&line);
        }
    }

    fn discovery<'a>(&'a self, log: &'a dyn SessionLog) -> DiscoveryService<'a> {
        DiscoveryService::new(
            DiscoveryDeps {
                scanner: &self.scanner,
                capture: &self.capture,
                metadata: &self.image,
                log,
            },
            &self.config,
        )
    }

    /// 対象プロセスを列挙する。得られたトークンはレポートの破棄で閉じる
    pub fn scan(&self, log: &dyn SessionLog) -> Result<DiscoveryReport, DomainError> {
        self.discovery(log).discover()
    }

    pub fn verify(&self, installer: &Path) -> Result<(), InstallerRejection> {
        let result = VerifyService::new(&self.image, &self.fs, &self.config).verify(installer);
        write_lifecycle_line(
            COMPONENT,
            &format!(
                "verify {}: {}",
                installer.display(),
                match &result {
                    Ok(()) => "accepted".to_string(),
                    Err(rejection) => rejection.to_string(),
                }
            ),
        );
        result
    }

    pub fn installer_sha256(&self, installer: &Path) -> Result<String, DomainError> {
        self.fs.sha256_hex(installer)
    }

    /// CLI の指定から更新要求を組み立てる（未指定は設定値）
    pub fn update_request(
        &self,
        installer: Option<PathBuf>,
        restart: Option<bool>,
        close_timeout_ms: Option<u32>,
        download_dir: Option<PathBuf>,
    ) -> Result<UpdateRequest, DomainError> {
        let effective = UpdaterConfig {
            close_timeout_ms: close_timeout_ms.unwrap_or(self.config.close_timeout_ms),
            ..self.config.clone()
        };
        effective.validate()?;
        Ok(UpdateRequest {
            installer,
            download: download_dir.map(|directory| DownloadPlan {
                site_url: self.config.package_site_url.clone(),
                directory,
            }),
            restart: restart.unwrap_or(self.config.restart_after_update),
            close_timeout: Duration::from_millis(u64::from(effective.close_timeout_ms)),
        })
    }

    pub fn update(
        &self,
        request: &UpdateRequest,
        operator: &dyn Operator,
        log: &dyn SessionLog,
        cancel: &CancelToken,
    ) -> SessionReport {
        self.update_with_source(request, operator, log, None, cancel)
    }

    /// 取得元を持つ組み込み側向け。`source` がなければ取得は行わない
    pub fn update_with_source(
        &self,
        request: &UpdateRequest,
        operator: &dyn Operator,
        log: &dyn SessionLog,
        source: Option<&dyn InstallerSource>,
        cancel: &CancelToken,
    ) -> SessionReport {
        write_lifecycle_line(
            COMPONENT,
            &format!(
                "update session started (restart={}, timeout_ms={})",
                request.restart,
                request.close_timeout.as_millis()
            ),
        );
        let discovery = self.discovery(log);
        let deps = SessionDeps {
            discovery: &discovery,
            operator,
            metadata: &self.image,
            files: &self.fs,
            runner: &self.runner,
            launcher: &self.launcher,
            privilege: &self.privilege,
            unblocker: &self.fs,
            source,
            log,
            clock: &self.clock,
        };
        let report = UpdateSessionService::new(deps, &self.config).run(request, cancel);
        write_lifecycle_line(
            COMPONENT,
            &format!(
                "update session finished (state={}, abort={}, errors={})",
                report.state.as_str(),
                report
                    .abort
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "none".into()),
                report.error_count()
            ),
        );
        report
    }

    pub fn save_session_log(&self, path: &Path, lines: &[String]) -> Result<(), DomainError> {
        self.fs.save_session_log(path, lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::{ConsoleLog, ConsoleOperator, Echo, Selection};
    use mu_domain::model::SessionAbort;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn missing_config_uses_defaults_until_saved() {
        let dir = tempdir().unwrap();
        let runtime = UpdaterRuntime::with_data_dir(dir.path()).unwrap();
        assert!(!runtime.config_exists());
        assert_eq!(runtime.config(), &UpdaterConfig::default());

        let mut config = UpdaterConfig::default();
        config.close_timeout_ms = 2500;
        runtime.save_config(&config).unwrap();
        assert!(runtime.config_exists());

        let reloaded = UpdaterRuntime::with_data_dir(dir.path()).unwrap();
        assert_eq!(reloaded.config().close_timeout_ms, 2500);
    }

    #[test]
    fn update_request_applies_overrides_and_validates() {
        let dir = tempdir().unwrap();
        let runtime = UpdaterRuntime::with_data_dir(dir.path()).unwrap();

        let request = runtime
            .update_request(Some(PathBuf::from("setup.exe")), None, None, None)
            .unwrap();
        assert!(request.restart);
        assert_eq!(request.close_timeout, Duration::from_millis(10_000));
        assert!(request.download.is_none());

        let request = runtime
            .update_request(None, Some(false), Some(750), Some(PathBuf::from("dl")))
            .unwrap();
        assert!(!request.restart);
        assert_eq!(request.close_timeout, Duration::from_millis(750));
        assert_eq!(
            request.download.map(|p| p.site_url),
            Some(runtime.config().package_site_url.clone())
        );

        assert!(runtime.update_request(None, None, Some(0), None).is_err());
        assert!(runtime.update_request(None, None, Some(600_001), None).is_err());
    }

    #[test]
    fn update_without_targets_aborts_before_any_prompt() {
        let dir = tempdir().unwrap();
        let mut config = UpdaterConfig::default();
        config.target_image_name = "mu-no-such-image-7d2a".into();
        let runtime = UpdaterRuntime::with_data_dir(dir.path()).unwrap();
        runtime.save_config(&config).unwrap();
        let runtime = UpdaterRuntime::with_data_dir(dir.path()).unwrap();

        let log = ConsoleLog::new(Echo::Silent);
        let operator = ConsoleOperator::with_io(
            Selection::Prompt,
            false,
            Box::new(Cursor::new(Vec::new())),
            Box::new(std::io::sink()),
        );
        let request = runtime
            .update_request(Some(dir.path().join("setup.exe")), None, Some(100), None)
            .unwrap();
        let report = runtime.update(&request, &operator, &log, &CancelToken::new());

        assert_eq!(report.abort, Some(SessionAbort::NoProcessesFound));
        assert!(report.installs.is_empty());
        assert!(log.lines().iter().any(|l| l.contains("Update aborted")));
    }

    #[test]
    fn session_log_is_written_to_requested_path() {
        let dir = tempdir().unwrap();
        let runtime = UpdaterRuntime::with_data_dir(dir.path()).unwrap();
        let path = dir.path().join("session.log");
        runtime
            .save_session_log(&path, &["first".to_string(), "second".to_string()])
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("first"));
        assert!(text.contains("second"));
    }
}
