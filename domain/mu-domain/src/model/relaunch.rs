use std::fmt;
use std::path::PathBuf;

/// 再起動要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaunchRequest {
    pub executable: PathBuf,
    pub arguments: String,
    /// 空なら実行ファイルのディレクトリ
    pub working_directory: Option<PathBuf>,
}

impl RelaunchRequest {
    /// `"exe" args` 形式
    pub fn command_line(&self) -> String {
        let exe = self.executable.display();
        let args = self.arguments.trim();
        if args.is_empty() {
            format!("\"{}\"", exe)
        } else {
            format!("\"{}\" {}", exe, args)
        }
    }

    pub fn effective_working_directory(&self) -> Option<PathBuf> {
        match &self.working_directory {
            Some(dir) if !dir.as_os_str().is_empty() => Some(dir.clone()),
            _ => self.executable.parent().map(|p| p.to_path_buf()),
        }
    }
}

/// 再起動戦略（閉じた列挙、純粋関数で選ぶ）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaunchStrategy {
    /// 取得済みトークンで起動
    DirectToken,
    /// シェル（explorer）所有者のトークンで起動
    ShellOwnerToken,
    /// 呼び出し元のまま起動
    Unelevated,
}

impl RelaunchStrategy {
    pub fn select(elevated: bool, token_present: bool) -> Self {
        match (elevated, token_present) {
            (true, true) => Self::DirectToken,
            (true, false) => Self::ShellOwnerToken,
            (false, _) => Self::Unelevated,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DirectToken => "captured token",
            Self::ShellOwnerToken => "shell owner token",
            Self::Unelevated => "caller identity",
        }
    }
}

impl fmt::Display for RelaunchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 起動ポートの失敗
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    /// 使えるトークンが得られない（フォールバック対象）
    TokenUnavailable(String),
    Failed(String),
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenUnavailable(msg) => write!(f, "token unavailable: {}", msg),
            Self::Failed(msg) => write!(f, "launch failed: {}", msg),
        }
    }
}

/// 再起動の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaunchOutcome {
    /// 実際に使った戦略
    pub strategy: RelaunchStrategy,
    /// フォールバック元
    pub fallback_from: Option<RelaunchStrategy>,
    pub pid: Option<u32>,
    pub error: Option<String>,
}

impl RelaunchOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}
