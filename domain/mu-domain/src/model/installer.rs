use std::fmt;
use std::path::{Path, PathBuf};

/// バージョン情報リソースから読む文字列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionStrings {
    pub product_name: Option<String>,
    pub product_version: Option<String>,
    pub legal_copyright: Option<String>,
}

/// インストーラー検証の拒否理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallerRejection {
    MissingFile,
    ManifestUnavailable(String),
    ManifestMalformed(String),
    ManifestIdentityMismatch { found: Option<String> },
    VersionInfoUnavailable(String),
    ProductNameMismatch { found: Option<String> },
}

impl fmt::Display for InstallerRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFile => write!(f, "installer file does not exist"),
            Self::ManifestUnavailable(msg) => write!(f, "manifest resource unavailable: {}", msg),
            Self::ManifestMalformed(msg) => write!(f, "manifest is malformed: {}", msg),
            Self::ManifestIdentityMismatch { found: Some(name) } => {
                write!(f, "manifest identity mismatch (found {})", name)
            }
            Self::ManifestIdentityMismatch { found: None } => {
                write!(f, "manifest has no assemblyIdentity name")
            }
            Self::VersionInfoUnavailable(msg) => write!(f, "version info unavailable: {}", msg),
            Self::ProductNameMismatch { found: Some(name) } => {
                write!(f, "product name mismatch (found {})", name)
            }
            Self::ProductNameMismatch { found: None } => write!(f, "product name missing"),
        }
    }
}

/// サイレントインストールの引数（インストール先1件分）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerArguments {
    directory: String,
    log_path: String,
}

impl InstallerArguments {
    pub fn for_directory(directory: &Path, log_name: &str) -> Self {
        let directory = directory.to_string_lossy().into_owned();
        let base = directory.trim_end_matches(['\\', '/']);
        let log_path = format!("{}\\{}", base, log_name);
        Self {
            directory,
            log_path,
        }
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }

    pub fn log_path(&self) -> &str {
        &self.log_path
    }

    pub fn to_args(&self) -> Vec<String> {
        vec![
            "/VERYSILENT".into(),
            format!("/LOG=\"{}\"", self.log_path),
            format!("/DIR=\"{}\"", self.directory),
            "/MERGETASKS=\"!desktopicon\"".into(),
            "/NOICONS".into(),
            "/NORESTART".into(),
            "/FORCECLOSEAPPLICATIONS".into(),
        ]
    }

    /// CreateProcess にそのまま渡すコマンドライン（プログラム部分を除く）
    pub fn to_command_line(&self) -> String {
        self.to_args().join(" ")
    }
}

/// インストール先1件の実行結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallResult {
    pub directory: PathBuf,
    pub exit_code: Option<i32>,
    /// 起動できなかった場合の理由
    pub error: Option<String>,
}

impl InstallResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}
