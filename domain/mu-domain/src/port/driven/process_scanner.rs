//! プロセス列挙とコンテキスト取得のポート

use std::path::Path;

use crate::error::DomainError;
use crate::model::{ScanEntry, SecurityContext, TargetProcess};

pub trait ProcessScanner {
    /// イメージ名（拡張子なし、大文字小文字無視）で列挙
    fn scan(&self, image_name: &str) -> Result<Vec<ScanEntry>, DomainError>;
}

/// 停止前に起動コンテキストを取得する。失敗しない（各項目は既定値へ落ちる）
pub trait SecurityContextCapture {
    fn capture(&self, process: &dyn TargetProcess, known_path: Option<&Path>) -> SecurityContext;
}
