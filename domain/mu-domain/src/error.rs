//! ドメインエラー型
//!
//! 標準ライブラリのみ使用（外部エラーハンドリングクレートなし）。
//! 想定内の否定結果（対象なし、終了済み等）は各モデルの列挙型で返し、
//! ここには実際の失敗だけを置く。

use std::fmt;

/// ドメイン層のエラー型
/// 各バリアントは特定の失敗シナリオを表現
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// アクセス拒否（権限不足）
    AccessDenied(String),

    /// プロセスが見つからない
    ProcessNotFound(u32),

    /// プロセス列挙の失敗
    EnumerationFailed(String),

    /// プロセス終了の失敗
    TerminationFailed(String),

    /// プロセス起動失敗
    ProcessLaunchFailed(String),

    /// リソース（マニフェスト/バージョン情報）の読み取り失敗
    ResourceUnavailable(String),

    /// 設定値が無効
    InvalidConfig(String),

    /// 設定ファイルの読み込み失敗
    ConfigLoadFailed(String),

    /// バリデーションエラー
    ValidationError(String),

    /// ファイルI/Oエラー
    IoError(String),

    /// 不明なエラー
    Unknown(String),
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessDenied(msg) => write!(f, "Access denied: {}", msg),
            Self::ProcessNotFound(pid) => write!(f, "Process not found: PID {}", pid),
            Self::EnumerationFailed(msg) => write!(f, "Process enumeration failed: {}", msg),
            Self::TerminationFailed(msg) => write!(f, "Process termination failed: {}", msg),
            Self::ProcessLaunchFailed(msg) => write!(f, "Process launch failed: {}", msg),
            Self::ResourceUnavailable(msg) => write!(f, "Resource unavailable: {}", msg),
            Self::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Self::ConfigLoadFailed(msg) => write!(f, "Configuration load failed: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::IoError(msg) => write!(f, "IO error: {}", msg),
            Self::Unknown(msg) => write!(f, "Unknown error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_pid() {
        assert_eq!(
            DomainError::ProcessNotFound(42).to_string(),
            "Process not found: PID 42"
        );
    }

    #[test]
    fn display_prefixes_category() {
        let err = DomainError::TerminationFailed("TerminateProcess: 5".into());
        assert_eq!(
            err.to_string(),
            "Process termination failed: TerminateProcess: 5"
        );
    }
}
