//! テスト用のポート実装（呼び出しを記録する）

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use mu_domain::DomainError;
use mu_domain::model::{
    CancelToken, DownloadOutcome, DownloadProgress, InstallerArguments, LaunchError,
    ProcessRecord, RelaunchRequest, ScanEntry, SecurityContext, SecurityToken, TargetProcess,
    TokenHandle, VersionStrings,
};
use mu_domain::port::driven::{
    Clock, FileInspector, FileUnblocker, ImageMetadataReader, InstallerRunner, InstallerSource,
    Operator, PrivilegeProbe, ProcessLauncher, ProcessScanner, SecurityContextCapture, SessionLog,
};
use mu_domain::port::driving::{DiscoveryReport, DiscoveryUseCase};

pub const INNO_MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<assembly xmlns="urn:schemas-microsoft-com:asm.v1" manifestVersion="1.0">
<assemblyIdentity version="1.0.0.0" processorArchitecture="x86" name="JR.Inno.Setup" type="win32"/>
<description>Inno Setup</description>
</assembly>"#;

#[derive(Default)]
pub struct ProcState {
    pub exited: Cell<bool>,
    pub exits_on_close: Cell<bool>,
    pub closes: Cell<u32>,
    pub kills: Cell<u32>,
}

pub struct FakeProcess {
    pid: u32,
    state: Rc<ProcState>,
}

impl FakeProcess {
    /// 終了要求で素直に終わるプロセス
    pub fn running(pid: u32) -> (Self, Rc<ProcState>) {
        let state = Rc::new(ProcState::default());
        state.exits_on_close.set(true);
        (
            Self {
                pid,
                state: state.clone(),
            },
            state,
        )
    }

    /// 終了要求を無視するプロセス
    pub fn stubborn(pid: u32) -> (Self, Rc<ProcState>) {
        let (process, state) = Self::running(pid);
        state.exits_on_close.set(false);
        (process, state)
    }

    pub fn exited(pid: u32) -> (Self, Rc<ProcState>) {
        let (process, state) = Self::running(pid);
        state.exited.set(true);
        (process, state)
    }
}

impl TargetProcess for FakeProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn has_exited(&self) -> bool {
        self.state.exited.get()
    }

    fn request_close(&self) -> bool {
        self.state.closes.set(self.state.closes.get() + 1);
        if self.state.exits_on_close.get() {
            self.state.exited.set(true);
        }
        true
    }

    fn wait_for_exit(&self, _timeout: Option<Duration>) -> bool {
        self.state.exited.get()
    }

    fn kill(&self) -> Result<(), DomainError> {
        self.state.kills.set(self.state.kills.get() + 1);
        self.state.exited.set(true);
        Ok(())
    }
}

pub struct CountingToken(pub Rc<Cell<u32>>);

impl TokenHandle for CountingToken {
    fn raw(&self) -> isize {
        0x1234
    }
}

impl Drop for CountingToken {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

/// 発見済みレコードを組み立てる
pub fn record(
    pid: u32,
    path: Option<&str>,
    process: FakeProcess,
    releases: Option<Rc<Cell<u32>>>,
) -> ProcessRecord {
    let executable_path = path.map(PathBuf::from);
    let discovered = mu_domain::model::DiscoveredProcess {
        pid,
        image_name: "ProScan".into(),
        known_path: executable_path.clone(),
        title: format!("ProScan {}", pid),
        started_at: None,
        process: Box::new(process),
    };
    let context = SecurityContext {
        working_directory: executable_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf),
        executable_path,
        arguments: "-auto".into(),
        owner: Some("HOST\\scanner".into()),
        token: releases.map(|c| SecurityToken::new(Box::new(CountingToken(c)))),
    };
    ProcessRecord::new(discovered, "11.2", context)
}

pub struct StubScanner {
    entries: RefCell<Option<Vec<ScanEntry>>>,
    fail: bool,
    pub queried: RefCell<Vec<String>>,
}

impl StubScanner {
    pub fn new(entries: Vec<ScanEntry>) -> Self {
        Self {
            entries: RefCell::new(Some(entries)),
            fail: false,
            queried: RefCell::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }
}

impl ProcessScanner for StubScanner {
    fn scan(&self, image_name: &str) -> Result<Vec<ScanEntry>, DomainError> {
        self.queried.borrow_mut().push(image_name.to_string());
        if self.fail {
            return Err(DomainError::EnumerationFailed("snapshot failed".into()));
        }
        Ok(self.entries.borrow_mut().take().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct StubCapture {
    pub captured: RefCell<Vec<u32>>,
}

impl SecurityContextCapture for StubCapture {
    fn capture(&self, process: &dyn TargetProcess, known_path: Option<&Path>) -> SecurityContext {
        self.captured.borrow_mut().push(process.pid());
        SecurityContext {
            executable_path: known_path.map(Path::to_path_buf),
            working_directory: known_path.and_then(Path::parent).map(Path::to_path_buf),
            arguments: String::new(),
            owner: Some("HOST\\scanner".into()),
            token: None,
        }
    }
}

pub struct StubMetadata {
    manifest: Option<Vec<u8>>,
    product: Option<String>,
    copyrights: Vec<(String, String)>,
}

impl StubMetadata {
    pub fn genuine() -> Self {
        Self {
            manifest: Some(INNO_MANIFEST.as_bytes().to_vec()),
            product: Some("ProScan".into()),
            copyrights: Vec::new(),
        }
    }

    pub fn forged() -> Self {
        Self {
            manifest: Some(INNO_MANIFEST.replace("JR.Inno.Setup", "Evil.Setup").into_bytes()),
            ..Self::genuine()
        }
    }

    pub fn with_copyright(mut self, path_fragment: &str, copyright: &str) -> Self {
        self.copyrights
            .push((path_fragment.to_string(), copyright.to_string()));
        self
    }
}

impl ImageMetadataReader for StubMetadata {
    fn manifest(&self, _path: &Path) -> Result<Vec<u8>, DomainError> {
        self.manifest
            .clone()
            .ok_or_else(|| DomainError::ResourceUnavailable("no manifest".into()))
    }

    fn version_strings(&self, path: &Path) -> Result<VersionStrings, DomainError> {
        let text = path.to_string_lossy();
        let copyright = self
            .copyrights
            .iter()
            .find(|(fragment, _)| text.contains(fragment.as_str()))
            .map(|(_, c)| c.clone())
            .unwrap_or_else(|| "ProScan (c) 2008-2025 Bob Aune".into());
        Ok(VersionStrings {
            product_name: self.product.clone(),
            product_version: Some(" 11.2".into()),
            legal_copyright: Some(copyright),
        })
    }
}

pub struct StubFiles {
    existing: Vec<PathBuf>,
}

impl StubFiles {
    pub fn with(paths: &[&str]) -> Self {
        Self {
            existing: paths.iter().map(PathBuf::from).collect(),
        }
    }
}

impl FileInspector for StubFiles {
    fn is_file(&self, path: &Path) -> bool {
        self.existing.iter().any(|p| p == path)
    }

    fn sha256_hex(&self, _path: &Path) -> Result<String, DomainError> {
        Ok("0123abcd".into())
    }
}

#[derive(Default)]
pub struct RecordingRunner {
    pub runs: RefCell<Vec<(PathBuf, String)>>,
    pub fail_directory: Option<String>,
}

impl InstallerRunner for RecordingRunner {
    fn run(&self, installer: &Path, args: &InstallerArguments) -> Result<i32, DomainError> {
        self.runs
            .borrow_mut()
            .push((installer.to_path_buf(), args.directory().to_string()));
        if self.fail_directory.as_deref() == Some(args.directory()) {
            return Err(DomainError::ProcessLaunchFailed("error 2".into()));
        }
        Ok(0)
    }
}

#[derive(Default)]
pub struct RecordingLauncher {
    pub calls: RefCell<Vec<(&'static str, PathBuf)>>,
    pub fail: bool,
}

impl RecordingLauncher {
    fn record(&self, how: &'static str, request: &RelaunchRequest) -> Result<Option<u32>, LaunchError> {
        self.calls
            .borrow_mut()
            .push((how, request.executable.clone()));
        if self.fail {
            Err(LaunchError::Failed("CreateProcessWithTokenW: 1314".into()))
        } else {
            Ok(Some(900))
        }
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn launch_with_token(
        &self,
        _token: &SecurityToken,
        request: &RelaunchRequest,
    ) -> Result<Option<u32>, LaunchError> {
        self.record("token", request)
    }

    fn launch_as_shell_owner(&self, request: &RelaunchRequest) -> Result<Option<u32>, LaunchError> {
        self.record("shell", request)
    }

    fn launch_as_caller(&self, request: &RelaunchRequest) -> Result<Option<u32>, LaunchError> {
        self.record("caller", request)
    }
}

pub struct Probe(pub bool);

impl PrivilegeProbe for Probe {
    fn is_elevated(&self) -> bool {
        self.0
    }

    fn current_identity(&self) -> Option<String> {
        Some("HOST\\admin".into())
    }
}

#[derive(Default)]
pub struct StubUnblocker {
    pub unblocked: RefCell<Vec<PathBuf>>,
}

impl FileUnblocker for StubUnblocker {
    fn unblock(&self, path: &Path) -> Result<bool, DomainError> {
        self.unblocked.borrow_mut().push(path.to_path_buf());
        Ok(true)
    }
}

pub struct StubOperator {
    selection: Option<Vec<u32>>,
    confirm: bool,
    download: bool,
    pub select_calls: Cell<u32>,
    pub confirm_calls: Cell<u32>,
}

impl StubOperator {
    pub fn accept_all() -> Self {
        Self {
            selection: None,
            confirm: true,
            download: true,
            select_calls: Cell::new(0),
            confirm_calls: Cell::new(0),
        }
    }

    pub fn selecting(pids: &[u32]) -> Self {
        Self {
            selection: Some(pids.to_vec()),
            ..Self::accept_all()
        }
    }

    pub fn declining() -> Self {
        Self {
            confirm: false,
            download: false,
            ..Self::accept_all()
        }
    }
}

impl Operator for StubOperator {
    fn select(&self, records: &[ProcessRecord]) -> Vec<u32> {
        self.select_calls.set(self.select_calls.get() + 1);
        match &self.selection {
            Some(pids) => pids.clone(),
            None => records.iter().map(|r| r.pid).collect(),
        }
    }

    fn confirm_update(&self, _count: usize, _installer: &Path) -> bool {
        self.confirm_calls.set(self.confirm_calls.get() + 1);
        self.confirm
    }

    fn confirm_download(&self, _file_name: &str) -> bool {
        self.download
    }
}

#[derive(Default)]
pub struct MemoryLog {
    pub lines: RefCell<Vec<String>>,
}

impl MemoryLog {
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.borrow().iter().any(|l| l.contains(needle))
    }
}

impl SessionLog for MemoryLog {
    fn append(&self, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }
}

pub struct FixedClock;

impl Clock for FixedClock {
    fn now_ms(&self) -> u64 {
        1_700_000_000_000
    }

    fn now_iso8601(&self) -> String {
        "2023-11-14T22:13:20.000Z".into()
    }
}

pub struct StubDiscovery {
    report: RefCell<Option<Result<DiscoveryReport, DomainError>>>,
}

impl StubDiscovery {
    pub fn with(records: Vec<ProcessRecord>) -> Self {
        Self {
            report: RefCell::new(Some(Ok(DiscoveryReport {
                records,
                ..DiscoveryReport::default()
            }))),
        }
    }

    pub fn failing() -> Self {
        Self {
            report: RefCell::new(Some(Err(DomainError::EnumerationFailed(
                "snapshot failed".into(),
            )))),
        }
    }
}

impl DiscoveryUseCase for StubDiscovery {
    fn discover(&self) -> Result<DiscoveryReport, DomainError> {
        self.report
            .borrow_mut()
            .take()
            .unwrap_or_else(|| Ok(DiscoveryReport::default()))
    }
}

pub struct StubSource {
    pub url: Option<String>,
    pub outcome: DownloadOutcome,
    pub extracted: Option<PathBuf>,
    pub downloads: RefCell<Vec<PathBuf>>,
    pub extracts: RefCell<Vec<(PathBuf, PathBuf, String)>>,
}

impl StubSource {
    pub fn serving(url: &str, extracted: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            outcome: DownloadOutcome::Completed,
            extracted: Some(PathBuf::from(extracted)),
            downloads: RefCell::new(Vec::new()),
            extracts: RefCell::new(Vec::new()),
        }
    }
}

impl InstallerSource for StubSource {
    fn find_installer_url(&self, _site_url: &str) -> Option<String> {
        self.url.clone()
    }

    fn download(
        &self,
        _url: &str,
        dest: &Path,
        progress: &mut dyn FnMut(DownloadProgress),
        cancel: &CancelToken,
    ) -> DownloadOutcome {
        self.downloads.borrow_mut().push(dest.to_path_buf());
        progress(DownloadProgress {
            received: 50,
            total: Some(100),
        });
        if cancel.is_canceled() {
            return DownloadOutcome::Canceled;
        }
        progress(DownloadProgress {
            received: 100,
            total: Some(100),
        });
        self.outcome.clone()
    }

    fn extract_installer(&self, archive: &Path, dir: &Path, exe_name: &str) -> Option<PathBuf> {
        self.extracts.borrow_mut().push((
            archive.to_path_buf(),
            dir.to_path_buf(),
            exe_name.to_string(),
        ));
        self.extracted.clone()
    }
}
