//! インストーラー取得ポート
//!
//! サイトの解析・ダウンロード・アーカイブ展開は外部コラボレータが担う。

use std::path::{Path, PathBuf};

use crate::error::DomainError;
use crate::model::{CancelToken, DownloadOutcome, DownloadProgress};

pub trait InstallerSource {
    /// パッケージサイトから最新アーカイブの URL を探す
    fn find_installer_url(&self, site_url: &str) -> Option<String>;

    /// `dest` へダウンロードする。キャンセルは `cancel` で通知される
    fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: &mut dyn FnMut(DownloadProgress),
        cancel: &CancelToken,
    ) -> DownloadOutcome;

    /// アーカイブを `dir` へ展開し、`exe_name` のパスを返す
    fn extract_installer(&self, archive: &Path, dir: &Path, exe_name: &str) -> Option<PathBuf>;
}

/// インターネット由来マーク（Zone.Identifier）の除去
pub trait FileUnblocker {
    /// 除去したら true、マークがなければ false
    fn unblock(&self, path: &Path) -> Result<bool, DomainError>;
}
