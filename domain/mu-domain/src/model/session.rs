//! 更新セッション
//!
//! 発見→選択→検証→停止→インストール→再起動の1サイクル。
//! 結果ログは追記のみで、ロールバックはしない。

use std::fmt;
use std::path::PathBuf;

use super::{InstallGroup, InstallResult, InstallerRejection, ProcessRecord, RelaunchStrategy};

/// セッション状態（前進のみ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Idle,
    Discovering,
    AwaitingSelection,
    AuthenticatingInstaller,
    Terminating,
    Installing,
    Relaunching,
    Complete,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering",
            Self::AwaitingSelection => "awaiting-selection",
            Self::AuthenticatingInstaller => "authenticating-installer",
            Self::Terminating => "terminating",
            Self::Installing => "installing",
            Self::Relaunching => "relaunching",
            Self::Complete => "complete",
        }
    }
}

/// 項目ごとの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    DiscoveryError(String),
    Skipped,
    AlreadyTerminated,
    Terminated { forced: bool },
    TerminationFailed(String),
    /// インストール先が求まらず、インストーラーを実行していない
    InstallSkipped(String),
    RelaunchSucceeded {
        strategy: RelaunchStrategy,
        pid: Option<u32>,
    },
    RelaunchFailed(String),
    RelaunchDeclined,
    TokenReleased,
}

impl ItemStatus {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::DiscoveryError(_)
                | Self::TerminationFailed(_)
                | Self::InstallSkipped(_)
                | Self::RelaunchFailed(_)
        )
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DiscoveryError(msg) => write!(f, "discovery error: {}", msg),
            Self::Skipped => f.write_str("skipped"),
            Self::AlreadyTerminated => f.write_str("already terminated"),
            Self::Terminated { forced: false } => f.write_str("terminated"),
            Self::Terminated { forced: true } => f.write_str("terminated (forced)"),
            Self::TerminationFailed(msg) => write!(f, "termination failed: {}", msg),
            Self::InstallSkipped(msg) => write!(f, "install skipped: {}", msg),
            Self::RelaunchSucceeded { strategy, pid: Some(pid) } => {
                write!(f, "relaunched via {} (pid {})", strategy, pid)
            }
            Self::RelaunchSucceeded { strategy, pid: None } => {
                write!(f, "relaunched via {}", strategy)
            }
            Self::RelaunchFailed(msg) => write!(f, "relaunch failed: {}", msg),
            Self::RelaunchDeclined => f.write_str("relaunch declined"),
            Self::TokenReleased => f.write_str("token released"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeEntry {
    pub pid: u32,
    pub status: ItemStatus,
}

/// 停止前の中断理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAbort {
    /// 列挙そのものに失敗
    DiscoveryFailed(String),
    NoProcessesFound,
    NoSelection,
    /// 取得も指定もされなかった
    InstallerMissing(String),
    InstallerNotFound(PathBuf),
    InstallerRejected(InstallerRejection),
    Declined,
}

impl fmt::Display for SessionAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DiscoveryFailed(msg) => write!(f, "process discovery failed: {}", msg),
            Self::NoProcessesFound => f.write_str("no target processes found"),
            Self::NoSelection => f.write_str("no processes selected for update"),
            Self::InstallerMissing(detail) => write!(f, "no installer available ({})", detail),
            Self::InstallerNotFound(path) => {
                write!(f, "installer does not exist: {}", path.display())
            }
            Self::InstallerRejected(reason) => write!(f, "installer rejected: {}", reason),
            Self::Declined => f.write_str("update declined by operator"),
        }
    }
}

/// 実行中のセッション
#[derive(Debug)]
pub struct UpdateSession {
    state: SessionState,
    pub selected: Vec<ProcessRecord>,
    pub unselected: Vec<ProcessRecord>,
    pub installer: Option<PathBuf>,
    pub installer_sha256: Option<String>,
    pub groups: Vec<InstallGroup>,
    pub installs: Vec<InstallResult>,
    discovered: usize,
    outcomes: Vec<OutcomeEntry>,
    abort: Option<SessionAbort>,
}

impl Default for UpdateSession {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            selected: Vec::new(),
            unselected: Vec::new(),
            installer: None,
            installer_sha256: None,
            groups: Vec::new(),
            installs: Vec::new(),
            discovered: 0,
            outcomes: Vec::new(),
            abort: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 状態を進める。後退は無視
    pub fn enter(&mut self, next: SessionState) {
        if next > self.state {
            self.state = next;
        }
    }

    pub fn set_discovered(&mut self, count: usize) {
        self.discovered = count;
    }

    pub fn record(&mut self, pid: u32, status: ItemStatus) {
        self.outcomes.push(OutcomeEntry { pid, status });
    }

    pub fn outcomes(&self) -> &[OutcomeEntry] {
        &self.outcomes
    }

    pub fn outcomes_for(&self, pid: u32) -> impl Iterator<Item = &ItemStatus> {
        self.outcomes
            .iter()
            .filter(move |e| e.pid == pid)
            .map(|e| &e.status)
    }

    pub fn abort(&mut self, reason: SessionAbort) {
        self.abort = Some(reason);
        self.state = SessionState::Complete;
    }

    pub fn abort_reason(&self) -> Option<&SessionAbort> {
        self.abort.as_ref()
    }

    /// 残っているトークンをすべて解放する（選択外も含む）
    pub fn release_remaining_tokens(&mut self) -> usize {
        let mut released = Vec::new();
        for rec in self.selected.iter_mut().chain(self.unselected.iter_mut()) {
            if rec.release_token() {
                released.push(rec.pid);
            }
        }
        let count = released.len();
        for pid in released {
            self.record(pid, ItemStatus::TokenReleased);
        }
        count
    }

    pub fn into_report(mut self) -> SessionReport {
        self.release_remaining_tokens();
        self.state = SessionState::Complete;
        SessionReport {
            state: self.state,
            abort: self.abort,
            discovered: self.discovered,
            selected: self.selected.len(),
            installer: self.installer,
            installer_sha256: self.installer_sha256,
            groups: self.groups,
            installs: self.installs,
            outcomes: self.outcomes,
        }
    }
}

/// 完了したセッションの報告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub state: SessionState,
    pub abort: Option<SessionAbort>,
    pub discovered: usize,
    pub selected: usize,
    pub installer: Option<PathBuf>,
    pub installer_sha256: Option<String>,
    pub groups: Vec<InstallGroup>,
    pub installs: Vec<InstallResult>,
    pub outcomes: Vec<OutcomeEntry>,
}

impl SessionReport {
    pub fn is_aborted(&self) -> bool {
        self.abort.is_some()
    }

    pub fn error_count(&self) -> usize {
        self.outcomes.iter().filter(|e| e.status.is_error()).count()
            + self.installs.iter().filter(|r| !r.succeeded()).count()
    }

    pub fn count(&self, pred: impl Fn(&ItemStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|e| pred(&e.status)).count()
    }
}
