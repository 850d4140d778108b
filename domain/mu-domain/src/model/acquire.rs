//! インストーラー取得（ダウンロード→展開）のモデル

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 共有キャンセルフラグ。インストーラー取得だけが参照する
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// ダウンロード進捗
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub received: u64,
    pub total: Option<u64>,
}

impl DownloadProgress {
    /// 0-100。総量不明なら None
    pub fn percent(&self) -> Option<u8> {
        let total = self.total.filter(|t| *t > 0)?;
        let pct = self.received.min(total).saturating_mul(100) / total;
        Some(pct as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed,
    Canceled,
    Failed(String),
}

/// 取得ユースケースの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired(PathBuf),
    /// サイト上にパッケージが見つからない、または展開後に実行ファイルがない
    NotFound(String),
    Declined,
    Canceled,
    Failed(String),
}

impl AcquireOutcome {
    pub fn installer(&self) -> Option<&PathBuf> {
        match self {
            Self::Acquired(path) => Some(path),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Acquired(path) => format!("acquired {}", path.display()),
            Self::NotFound(msg) => format!("not found: {}", msg),
            Self::Declined => "declined by operator".into(),
            Self::Canceled => "canceled".into(),
            Self::Failed(msg) => format!("failed: {}", msg),
        }
    }
}
