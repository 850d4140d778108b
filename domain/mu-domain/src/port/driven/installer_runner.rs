use std::path::Path;

use crate::error::DomainError;
use crate::model::InstallerArguments;

/// インストーラー実行ポート。ウィンドウなしで起動し、終了まで待つ
pub trait InstallerRunner {
    /// 終了コードを返す。起動できなければ Err
    fn run(&self, installer: &Path, args: &InstallerArguments) -> Result<i32, DomainError>;
}
