use std::path::Path;

use crate::error::DomainError;

/// ファイルの存在確認とダイジェスト計算
pub trait FileInspector {
    fn is_file(&self, path: &Path) -> bool;

    /// SHA-256（小文字16進）
    fn sha256_hex(&self, path: &Path) -> Result<String, DomainError>;
}
