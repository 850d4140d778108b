//! 設定リポジトリポート

use crate::error::DomainError;
use crate::model::UpdaterConfig;

/// 設定ストレージポート
pub trait ConfigRepository {
    /// 設定を読込（ファイルがなければ既定値）
    fn load(&self) -> Result<UpdaterConfig, DomainError>;

    fn save(&self, config: &UpdaterConfig) -> Result<(), DomainError>;

    fn exists(&self) -> bool;
}
