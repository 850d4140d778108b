//! オペレーター（対話）ポート

use std::path::Path;

use crate::model::ProcessRecord;

/// 選択と確認を行うオペレーター
pub trait Operator {
    /// 更新対象の pid を返す
    fn select(&self, records: &[ProcessRecord]) -> Vec<u32>;

    /// 停止とインストールの最終確認
    fn confirm_update(&self, count: usize, installer: &Path) -> bool;

    /// 見つかったパッケージをダウンロードするか
    fn confirm_download(&self, file_name: &str) -> bool;
}
