//! 更新セッションユースケース。
//!
//! 発見→選択→（取得）→検証→停止→インストール→再起動を1スレッドで順に進める。
//! 停止開始前なら中断できる。停止後の失敗は項目ごとに記録して続行し、
//! ロールバックはしない。トークンはどの経路でも最後に1度だけ解放する。

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use mu_domain::model::{
    AcquireOutcome, CancelToken, ExcludedMember, InstallResult, InstallerArguments, ItemStatus,
    ProcessRecord, RelaunchRequest, SessionAbort, SessionReport, SessionState, StopOutcome,
    UpdateSession, UpdaterConfig,
};
use mu_domain::port::driven::{
    Clock, FileInspector, FileUnblocker, ImageMetadataReader, InstallerRunner, InstallerSource,
    Operator, PrivilegeProbe, ProcessLauncher, SessionLog,
};
use mu_domain::port::driving::{DiscoveryUseCase, UpdateRequest, UpdateUseCase};
use mu_domain::service::{
    InstallerAuthenticator, compute_install_groups, relaunch, stop_gracefully_then_force,
};

use crate::acquire::{AcquireDeps, acquire_installer};
use crate::section;

pub struct SessionDeps<'a> {
    pub discovery: &'a dyn DiscoveryUseCase,
    pub operator: &'a dyn Operator,
    pub metadata: &'a dyn ImageMetadataReader,
    pub files: &'a dyn FileInspector,
    pub runner: &'a dyn InstallerRunner,
    pub launcher: &'a dyn ProcessLauncher,
    pub privilege: &'a dyn PrivilegeProbe,
    pub unblocker: &'a dyn FileUnblocker,
    /// 取得元（なければオペレーター指定のパスだけを使う）
    pub source: Option<&'a dyn InstallerSource>,
    pub log: &'a dyn SessionLog,
    pub clock: &'a dyn Clock,
}

pub struct UpdateSessionService<'a> {
    deps: SessionDeps<'a>,
    config: &'a UpdaterConfig,
}

impl<'a> UpdateSessionService<'a> {
    pub fn new(deps: SessionDeps<'a>, config: &'a UpdaterConfig) -> Self {
        Self { deps, config }
    }

    fn log(&self, line: &str) {
        self.deps.log.append(line);
    }

    fn finish(&self, mut session: UpdateSession) -> SessionReport {
        if let Some(reason) = session.abort_reason() {
            self.log(&format!("Update aborted: {}", reason));
        }
        let released = session.release_remaining_tokens();
        if released > 0 {
            self.log(&format!("Released {} security token(s).", released));
        }
        let report = session.into_report();
        if !report.is_aborted() {
            self.log(&format!("Update completed {}", self.deps.clock.now_iso8601()));
        }
        report
    }

    /// 取得→オペレーター指定の順でインストーラーを決める
    fn resolve_installer(
        &self,
        request: &UpdateRequest,
        cancel: &CancelToken,
    ) -> Result<PathBuf, SessionAbort> {
        let mut detail = String::from("no installer path given");
        if let (Some(plan), Some(source)) = (&request.download, self.deps.source) {
            let deps = AcquireDeps {
                source,
                unblocker: self.deps.unblocker,
                operator: self.deps.operator,
                log: self.deps.log,
            };
            let outcome = acquire_installer(&deps, plan, cancel);
            self.log(&format!("Installer acquisition: {}", outcome.describe()));
            if let AcquireOutcome::Acquired(path) = outcome {
                return Ok(path);
            }
            detail = format!("acquisition {}", outcome.describe());
        }

        let Some(path) = request.installer.clone() else {
            return Err(SessionAbort::InstallerMissing(detail));
        };
        if !self.deps.files.is_file(&path) {
            return Err(SessionAbort::InstallerNotFound(path));
        }
        match self.deps.unblocker.unblock(&path) {
            Ok(true) => self.log(&format!("Removed Zone.Identifier from {}", path.display())),
            Ok(false) => {}
            Err(err) => self.log(&format!(
                "Warning: could not unblock {}: {}",
                path.display(),
                err
            )),
        }
        Ok(path)
    }

    fn terminate(&self, session: &mut UpdateSession, request: &UpdateRequest) {
        section(self.deps.log, "STOPPING PROCESSES AND RUNNING INSTALLER", '=');
        let mut results = Vec::with_capacity(session.selected.len());
        for rec in &session.selected {
            let path = rec.display_path();
            // 発見時のプロセスオブジェクトを使う（pid で引き直さない）
            let status = match stop_gracefully_then_force(rec.process(), request.close_timeout) {
                Ok(StopOutcome::AlreadyExited) => {
                    self.log(&format!(
                        "Process already terminated, skipping close/kill on: {} PID: {}",
                        path, rec.pid
                    ));
                    ItemStatus::AlreadyTerminated
                }
                Ok(outcome) => {
                    let forced = outcome == StopOutcome::Forced;
                    if forced {
                        self.log(&format!(
                            "Graceful shutdown failed or timed out, {} was killed",
                            path
                        ));
                    }
                    self.log(&format!(
                        "Process {} PID: {} terminated successfully.",
                        path, rec.pid
                    ));
                    ItemStatus::Terminated { forced }
                }
                Err(err) => {
                    self.log(&format!(
                        "Error terminating process {} PID: {}: {}",
                        path, rec.pid, err
                    ));
                    ItemStatus::TerminationFailed(err.to_string())
                }
            };
            results.push((rec.pid, status));
        }
        for (pid, status) in results {
            session.record(pid, status);
        }
    }

    fn install(
        &self,
        session: &mut UpdateSession,
        installer: &Path,
        excluded: &[ExcludedMember],
    ) {
        section(self.deps.log, "RUNNING INSTALLER FOR EACH INSTALL DIRECTORY", '-');
        for member in excluded {
            self.log(&format!("Installer not run for PID: {}: {}", member.pid, member.reason));
            session.record(member.pid, ItemStatus::InstallSkipped(member.reason.clone()));
        }
        let mut installs = Vec::with_capacity(session.groups.len());
        for group in &session.groups {
            let args = InstallerArguments::for_directory(&group.directory, &self.config.install_log_name);
            self.log(&format!("Install directory: {}", group.directory.display()));
            let result = match self.deps.runner.run(installer, &args) {
                Ok(code) => {
                    self.log(&format!("Installer exit code: {}", code));
                    InstallResult {
                        directory: group.directory.clone(),
                        exit_code: Some(code),
                        error: None,
                    }
                }
                Err(err) => {
                    self.log(&format!(
                        "Error running installer for {}: {}",
                        group.directory.display(),
                        err
                    ));
                    InstallResult {
                        directory: group.directory.clone(),
                        exit_code: None,
                        error: Some(err.to_string()),
                    }
                }
            };
            installs.push(result);
        }
        session.installs.extend(installs);
    }

    fn relaunch_all(&self, session: &mut UpdateSession) {
        section(self.deps.log, "RESTARTING PROCESSES AS ORIGINAL USER", '-');
        let mut entries = Vec::new();
        for rec in session.selected.iter_mut() {
            entries.push((rec.pid, self.relaunch_one(rec)));
            // 成否にかかわらずここで解放
            if rec.release_token() {
                entries.push((rec.pid, ItemStatus::TokenReleased));
            }
        }
        for (pid, status) in entries {
            session.record(pid, status);
        }
    }

    fn relaunch_one(&self, rec: &ProcessRecord) -> ItemStatus {
        let Some(executable) = rec.executable_path() else {
            self.log(&format!(
                "Error restarting process {} PID: {}: no executable path",
                rec.display_path(),
                rec.pid
            ));
            return ItemStatus::RelaunchFailed("no executable path".into());
        };
        let request = RelaunchRequest {
            executable: executable.to_path_buf(),
            arguments: rec.context.arguments.clone(),
            working_directory: rec.context.working_directory.clone(),
        };
        let who = rec
            .owner()
            .map(|o| format!(" as user: {}", o))
            .unwrap_or_default();
        self.log(&format!(
            "Attempting to start {} at {}{}",
            executable.display(),
            self.deps.clock.now_iso8601(),
            who
        ));

        let outcome = relaunch(
            self.deps.launcher,
            self.deps.privilege,
            &request,
            rec.context.token.as_ref(),
        );
        if let Some(from) = outcome.fallback_from {
            self.log(&format!(
                "No {} available, started with {} instead.",
                from, outcome.strategy
            ));
        }
        match outcome.error {
            None => {
                self.log("Process restarted successfully.");
                ItemStatus::RelaunchSucceeded {
                    strategy: outcome.strategy,
                    pid: outcome.pid,
                }
            }
            Some(err) => {
                self.log(&format!(
                    "Error restarting process {}: {}",
                    executable.display(),
                    err
                ));
                ItemStatus::RelaunchFailed(err)
            }
        }
    }
}

impl UpdateUseCase for UpdateSessionService<'_> {
    fn run(&self, request: &UpdateRequest, cancel: &CancelToken) -> SessionReport {
        let mut session = UpdateSession::new();

        session.enter(SessionState::Discovering);
        self.log(&format!(
            "Update session started at {}",
            self.deps.clock.now_iso8601()
        ));
        let discovery = match self.deps.discovery.discover() {
            Ok(report) => report,
            Err(err) => {
                session.abort(SessionAbort::DiscoveryFailed(err.to_string()));
                return self.finish(session);
            }
        };
        for entry in discovery.errors {
            session.record(entry.pid, entry.status);
        }
        session.set_discovered(discovery.records.len());
        if discovery.records.is_empty() {
            session.abort(SessionAbort::NoProcessesFound);
            return self.finish(session);
        }

        session.enter(SessionState::AwaitingSelection);
        let chosen: BTreeSet<u32> = self
            .deps
            .operator
            .select(&discovery.records)
            .into_iter()
            .collect();
        let (selected, unselected): (Vec<_>, Vec<_>) = discovery
            .records
            .into_iter()
            .partition(|r| chosen.contains(&r.pid));
        let skipped: Vec<u32> = unselected.iter().map(|r| r.pid).collect();
        session.selected = selected;
        session.unselected = unselected;
        for pid in skipped {
            session.record(pid, ItemStatus::Skipped);
        }
        if session.selected.is_empty() {
            session.abort(SessionAbort::NoSelection);
            return self.finish(session);
        }

        session.enter(SessionState::AuthenticatingInstaller);
        let installer = match self.resolve_installer(request, cancel) {
            Ok(path) => path,
            Err(reason) => {
                session.abort(reason);
                return self.finish(session);
            }
        };
        let authenticator =
            InstallerAuthenticator::from_config(self.deps.metadata, self.deps.files, self.config);
        if let Err(rejection) = authenticator.authenticate(&installer) {
            self.log(&format!(
                "The specified setup file {} is not a {} Setup Installer: {}",
                installer.display(),
                self.config.installer_product_name,
                rejection
            ));
            session.abort(SessionAbort::InstallerRejected(rejection));
            return self.finish(session);
        }
        match self.deps.files.sha256_hex(&installer) {
            Ok(digest) => {
                self.log(&format!("Installer SHA-256: {}", digest));
                session.installer_sha256 = Some(digest);
            }
            Err(err) => self.log(&format!("Warning: could not hash installer: {}", err)),
        }
        session.installer = Some(installer.clone());

        // 停止前に一度だけ求める
        let plan = compute_install_groups(
            session.selected.iter().map(|r| (r.pid, r.executable_path())),
            |p| self.deps.files.is_file(p),
        );
        session.groups = plan.groups;
        let excluded = plan.excluded;

        if !self
            .deps
            .operator
            .confirm_update(session.selected.len(), &installer)
        {
            self.log("Install canceled by user.");
            session.abort(SessionAbort::Declined);
            return self.finish(session);
        }

        self.log(&format!("Using setup installer: {}", installer.display()));
        self.log(&format!(
            "Count of processes selected for update: {}",
            session.selected.len()
        ));

        session.enter(SessionState::Terminating);
        self.terminate(&mut session, request);

        session.enter(SessionState::Installing);
        self.install(&mut session, &installer, &excluded);

        session.enter(SessionState::Relaunching);
        if request.restart {
            self.relaunch_all(&mut session);
        } else {
            self.log(&format!(
                "You may now start your {} instances.",
                self.config.target_image_name
            ));
            let pids: Vec<u32> = session.selected.iter().map(|r| r.pid).collect();
            for pid in pids {
                session.record(pid, ItemStatus::RelaunchDeclined);
            }
        }

        session.enter(SessionState::Complete);
        self.finish(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stubs::{
        FakeProcess, FixedClock, MemoryLog, Probe, RecordingLauncher, RecordingRunner,
        StubDiscovery, StubFiles, StubMetadata, StubOperator, StubSource, StubUnblocker, record,
    };
    use mu_domain::model::RelaunchStrategy;
    use mu_domain::port::driving::DownloadPlan;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    const INSTALLER: &str = "/dl/ProScan_setup.exe";

    struct Fixture {
        operator: StubOperator,
        metadata: StubMetadata,
        files: StubFiles,
        runner: RecordingRunner,
        launcher: RecordingLauncher,
        privilege: Probe,
        unblocker: StubUnblocker,
        source: Option<StubSource>,
        log: MemoryLog,
        config: UpdaterConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                operator: StubOperator::accept_all(),
                metadata: StubMetadata::genuine(),
                files: StubFiles::with(&[
                    INSTALLER,
                    "/opt/a/ProScan.exe",
                    "/opt/b/ProScan.exe",
                    "/dl/x/x.exe",
                ]),
                runner: RecordingRunner::default(),
                launcher: RecordingLauncher::default(),
                privilege: Probe(true),
                unblocker: StubUnblocker::default(),
                source: None,
                log: MemoryLog::default(),
                config: UpdaterConfig::default(),
            }
        }

        fn run(&self, discovery: &StubDiscovery, request: &UpdateRequest) -> SessionReport {
            let service = UpdateSessionService::new(
                SessionDeps {
                    discovery,
                    operator: &self.operator,
                    metadata: &self.metadata,
                    files: &self.files,
                    runner: &self.runner,
                    launcher: &self.launcher,
                    privilege: &self.privilege,
                    unblocker: &self.unblocker,
                    source: self.source.as_ref().map(|s| s as &dyn InstallerSource),
                    log: &self.log,
                    clock: &FixedClock,
                },
                &self.config,
            );
            service.run(request, &CancelToken::new())
        }
    }

    fn request(restart: bool) -> UpdateRequest {
        UpdateRequest {
            installer: Some(PathBuf::from(INSTALLER)),
            download: None,
            restart,
            close_timeout: Duration::from_millis(10),
        }
    }

    fn counter() -> Rc<Cell<u32>> {
        Rc::new(Cell::new(0))
    }

    #[test]
    fn zero_discovered_has_no_side_effects() {
        let fx = Fixture::new();
        let report = fx.run(&StubDiscovery::with(Vec::new()), &request(true));
        assert_eq!(report.abort, Some(SessionAbort::NoProcessesFound));
        assert_eq!(report.state, SessionState::Complete);
        assert_eq!(fx.operator.select_calls.get(), 0);
        assert!(fx.runner.runs.borrow().is_empty());
        assert!(fx.launcher.calls.borrow().is_empty());
    }

    #[test]
    fn discovery_failure_aborts() {
        let fx = Fixture::new();
        let report = fx.run(&StubDiscovery::failing(), &request(true));
        assert!(matches!(report.abort, Some(SessionAbort::DiscoveryFailed(_))));
    }

    #[test]
    fn rejected_installer_terminates_nothing() {
        let fx = Fixture {
            metadata: StubMetadata::forged(),
            ..Fixture::new()
        };
        let (p1, s1) = FakeProcess::running(1);
        let (p2, s2) = FakeProcess::running(2);
        let t1 = counter();
        let discovery = StubDiscovery::with(vec![
            record(1, Some("/opt/a/ProScan.exe"), p1, Some(t1.clone())),
            record(2, Some("/opt/b/ProScan.exe"), p2, None),
        ]);
        let report = fx.run(&discovery, &request(true));
        assert!(matches!(
            report.abort,
            Some(SessionAbort::InstallerRejected(_))
        ));
        assert_eq!(s1.closes.get() + s1.kills.get(), 0);
        assert_eq!(s2.closes.get() + s2.kills.get(), 0);
        assert_eq!(fx.operator.confirm_calls.get(), 0);
        assert!(fx.runner.runs.borrow().is_empty());
        assert_eq!(t1.get(), 1);
        assert!(fx.log.contains("is not a ProScan Setup Installer"));
    }

    #[test]
    fn shared_directory_runs_installer_once_per_directory() {
        let fx = Fixture::new();
        let discovery = StubDiscovery::with(vec![
            record(1, Some("/opt/a/ProScan.exe"), FakeProcess::running(1).0, None),
            record(2, Some("/opt/a/ProScan.exe"), FakeProcess::running(2).0, None),
            record(3, Some("/opt/b/ProScan.exe"), FakeProcess::running(3).0, None),
        ]);
        let report = fx.run(&discovery, &request(false));
        assert!(!report.is_aborted());
        let runs = fx.runner.runs.borrow();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].0, PathBuf::from(INSTALLER));
        assert_eq!(runs[0].1, "/opt/a");
        assert_eq!(runs[1].1, "/opt/b");
        assert_eq!(report.groups[0].pids, vec![1, 2]);
        assert_eq!(report.installer_sha256.as_deref(), Some("0123abcd"));
    }

    #[test]
    fn token_released_once_when_relaunch_succeeds() {
        let fx = Fixture::new();
        let t = counter();
        let discovery = StubDiscovery::with(vec![record(
            1,
            Some("/opt/a/ProScan.exe"),
            FakeProcess::running(1).0,
            Some(t.clone()),
        )]);
        let report = fx.run(&discovery, &request(true));
        assert_eq!(t.get(), 1);
        assert_eq!(fx.launcher.calls.borrow()[0].0, "token");
        assert_eq!(
            report.count(|s| matches!(
                s,
                ItemStatus::RelaunchSucceeded {
                    strategy: RelaunchStrategy::DirectToken,
                    ..
                }
            )),
            1
        );
        assert_eq!(report.count(|s| *s == ItemStatus::TokenReleased), 1);
        drop(report);
        assert_eq!(t.get(), 1);
    }

    #[test]
    fn token_released_once_when_relaunch_fails() {
        let fx = Fixture {
            launcher: RecordingLauncher {
                fail: true,
                ..RecordingLauncher::default()
            },
            ..Fixture::new()
        };
        let t = counter();
        let discovery = StubDiscovery::with(vec![record(
            1,
            Some("/opt/a/ProScan.exe"),
            FakeProcess::running(1).0,
            Some(t.clone()),
        )]);
        let report = fx.run(&discovery, &request(true));
        assert_eq!(t.get(), 1);
        assert_eq!(report.count(|s| matches!(s, ItemStatus::RelaunchFailed(_))), 1);
        assert_eq!(report.count(|s| *s == ItemStatus::TokenReleased), 1);
    }

    #[test]
    fn token_released_once_when_restart_declined() {
        let fx = Fixture::new();
        let t = counter();
        let discovery = StubDiscovery::with(vec![record(
            1,
            Some("/opt/a/ProScan.exe"),
            FakeProcess::running(1).0,
            Some(t.clone()),
        )]);
        let report = fx.run(&discovery, &request(false));
        assert_eq!(t.get(), 1);
        assert!(fx.launcher.calls.borrow().is_empty());
        assert_eq!(report.count(|s| *s == ItemStatus::RelaunchDeclined), 1);
        assert_eq!(report.count(|s| *s == ItemStatus::TokenReleased), 1);
        assert!(fx.log.contains("You may now start your ProScan instances."));
    }

    #[test]
    fn already_exited_is_logged_not_killed() {
        let fx = Fixture::new();
        let (gone, state) = FakeProcess::exited(1);
        let discovery =
            StubDiscovery::with(vec![record(1, Some("/opt/a/ProScan.exe"), gone, None)]);
        let report = fx.run(&discovery, &request(false));
        assert_eq!(state.kills.get(), 0);
        assert_eq!(state.closes.get(), 0);
        assert_eq!(report.count(|s| *s == ItemStatus::AlreadyTerminated), 1);
        assert_eq!(report.error_count(), 0);
        assert!(fx.log.contains("Process already terminated"));
        // インストールは続行
        assert_eq!(fx.runner.runs.borrow().len(), 1);
    }

    #[test]
    fn stubborn_process_is_killed_once() {
        let fx = Fixture::new();
        let (p, state) = FakeProcess::stubborn(1);
        let discovery = StubDiscovery::with(vec![record(1, Some("/opt/a/ProScan.exe"), p, None)]);
        let report = fx.run(&discovery, &request(false));
        assert_eq!(state.kills.get(), 1);
        assert_eq!(
            report.count(|s| *s == ItemStatus::Terminated { forced: true }),
            1
        );
    }

    #[test]
    fn missing_path_is_flagged_at_relaunch() {
        let fx = Fixture::new();
        let discovery = StubDiscovery::with(vec![
            record(1, None, FakeProcess::running(1).0, None),
            record(2, Some("/opt/a/ProScan.exe"), FakeProcess::running(2).0, None),
        ]);
        let report = fx.run(&discovery, &request(true));
        assert_eq!(fx.runner.runs.borrow().len(), 1);
        assert!(report.outcomes.iter().any(|e| e.pid == 1
            && e.status == ItemStatus::RelaunchFailed("no executable path".into())));
        assert_eq!(fx.launcher.calls.borrow().len(), 1);
    }

    #[test]
    fn vanished_executable_is_recorded_as_install_skipped() {
        let fx = Fixture::new();
        let (p2, s2) = FakeProcess::running(2);
        let discovery = StubDiscovery::with(vec![
            record(1, Some("/opt/a/ProScan.exe"), FakeProcess::running(1).0, None),
            record(2, Some("/opt/gone/ProScan.exe"), p2, None),
        ]);
        let report = fx.run(&discovery, &request(false));
        assert!(!report.is_aborted());
        assert_eq!(s2.closes.get(), 1);
        assert_eq!(fx.runner.runs.borrow().len(), 1);
        assert_eq!(report.installs.len(), 1);
        assert!(report.outcomes.iter().any(|e| e.pid == 2
            && e.status
                == ItemStatus::InstallSkipped(
                    "executable not found: /opt/gone/ProScan.exe".into()
                )));
        assert_eq!(report.error_count(), 1);
        assert!(fx.log.contains("Installer not run for PID: 2"));
    }

    #[test]
    fn unselected_records_are_skipped_and_released() {
        let fx = Fixture {
            operator: StubOperator::selecting(&[2]),
            ..Fixture::new()
        };
        let (p1, s1) = FakeProcess::running(1);
        let t1 = counter();
        let discovery = StubDiscovery::with(vec![
            record(1, Some("/opt/a/ProScan.exe"), p1, Some(t1.clone())),
            record(2, Some("/opt/b/ProScan.exe"), FakeProcess::running(2).0, None),
        ]);
        let report = fx.run(&discovery, &request(true));
        assert_eq!(s1.closes.get(), 0);
        assert_eq!(t1.get(), 1);
        assert_eq!(report.selected, 1);
        assert!(report
            .outcomes
            .iter()
            .any(|e| e.pid == 1 && e.status == ItemStatus::Skipped));
        assert_eq!(fx.runner.runs.borrow().len(), 1);
    }

    #[test]
    fn empty_selection_aborts() {
        let fx = Fixture {
            operator: StubOperator::selecting(&[]),
            ..Fixture::new()
        };
        let discovery = StubDiscovery::with(vec![record(
            1,
            Some("/opt/a/ProScan.exe"),
            FakeProcess::running(1).0,
            None,
        )]);
        let report = fx.run(&discovery, &request(true));
        assert_eq!(report.abort, Some(SessionAbort::NoSelection));
    }

    #[test]
    fn declined_confirmation_stops_nothing() {
        let fx = Fixture {
            operator: StubOperator::declining(),
            ..Fixture::new()
        };
        let (p, state) = FakeProcess::running(1);
        let t = counter();
        let discovery =
            StubDiscovery::with(vec![record(1, Some("/opt/a/ProScan.exe"), p, Some(t.clone()))]);
        let report = fx.run(&discovery, &request(true));
        assert_eq!(report.abort, Some(SessionAbort::Declined));
        assert_eq!(state.closes.get(), 0);
        assert_eq!(t.get(), 1);
        assert!(fx.log.contains("Install canceled by user."));
    }

    #[test]
    fn missing_installer_aborts() {
        let fx = Fixture::new();
        let discovery = StubDiscovery::with(vec![record(
            1,
            Some("/opt/a/ProScan.exe"),
            FakeProcess::running(1).0,
            None,
        )]);
        let mut req = request(true);
        req.installer = None;
        let report = fx.run(&discovery, &req);
        assert!(matches!(report.abort, Some(SessionAbort::InstallerMissing(_))));

        let discovery = StubDiscovery::with(vec![record(
            1,
            Some("/opt/a/ProScan.exe"),
            FakeProcess::running(1).0,
            None,
        )]);
        req.installer = Some(PathBuf::from("/dl/nope.exe"));
        let report = fx.run(&discovery, &req);
        assert_eq!(
            report.abort,
            Some(SessionAbort::InstallerNotFound(PathBuf::from("/dl/nope.exe")))
        );
    }

    #[test]
    fn acquired_installer_is_used() {
        let fx = Fixture {
            source: Some(StubSource::serving("https://h/files/x.zip", "/dl/x/x.exe")),
            ..Fixture::new()
        };
        let discovery = StubDiscovery::with(vec![record(
            1,
            Some("/opt/a/ProScan.exe"),
            FakeProcess::running(1).0,
            None,
        )]);
        let mut req = request(false);
        req.installer = None;
        req.download = Some(DownloadPlan {
            site_url: "https://h".into(),
            directory: PathBuf::from("/dl"),
        });
        let report = fx.run(&discovery, &req);
        assert!(!report.is_aborted());
        assert_eq!(report.installer.as_deref(), Some(Path::new("/dl/x/x.exe")));
        assert_eq!(fx.runner.runs.borrow()[0].0, PathBuf::from("/dl/x/x.exe"));
    }

    #[test]
    fn failed_install_for_one_group_does_not_stop_others() {
        let fx = Fixture {
            runner: RecordingRunner {
                fail_directory: Some("/opt/a".into()),
                ..RecordingRunner::default()
            },
            ..Fixture::new()
        };
        let discovery = StubDiscovery::with(vec![
            record(1, Some("/opt/a/ProScan.exe"), FakeProcess::running(1).0, None),
            record(2, Some("/opt/b/ProScan.exe"), FakeProcess::running(2).0, None),
        ]);
        let report = fx.run(&discovery, &request(true));
        assert_eq!(report.installs.len(), 2);
        assert!(!report.installs[0].succeeded());
        assert!(report.installs[1].succeeded());
        assert_eq!(fx.launcher.calls.borrow().len(), 2);
    }
}
