//! 更新ユースケースポート

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::{CancelToken, InstallerRejection, SessionReport};

/// ダウンロード先の指定（取得を試みる場合のみ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    pub site_url: String,
    pub directory: PathBuf,
}

/// 更新要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    /// オペレーター指定のインストーラー（取得に失敗した場合の代替でもある）
    pub installer: Option<PathBuf>,
    pub download: Option<DownloadPlan>,
    pub restart: bool,
    pub close_timeout: Duration,
}

/// 更新セッション一式
pub trait UpdateUseCase {
    fn run(&self, request: &UpdateRequest, cancel: &CancelToken) -> SessionReport;
}

/// インストーラー単体の検証
pub trait VerifyInstallerUseCase {
    fn verify(&self, installer: &Path) -> Result<(), InstallerRejection>;
}
