use crate::DomainError;

pub const DEFAULT_TARGET_IMAGE_NAME: &str = "ProScan";
pub const DEFAULT_COPYRIGHT_PREFIX: &str = "ProScan";
pub const DEFAULT_COPYRIGHT_SUFFIX: &str = "Bob Aune";
pub const DEFAULT_MANIFEST_IDENTITY: &str = "JR.Inno.Setup";
pub const DEFAULT_INSTALLER_PRODUCT_NAME: &str = "ProScan";
pub const DEFAULT_CLOSE_TIMEOUT_MS: u32 = 10_000;
pub const MAX_CLOSE_TIMEOUT_MS: u32 = 600_000;
pub const DEFAULT_INSTALL_LOG_NAME: &str = "ProScanMultiUpdater-install.log";
pub const DEFAULT_PACKAGE_SITE_URL: &str = "https://www.proscan.org";

/// 更新処理全体の設定。
/// 起動時に一度だけ構築し、参照で受け渡す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdaterConfig {
    /// 対象プロセスのイメージ名（拡張子なし）
    pub target_image_name: String,
    pub copyright_prefix: String,
    pub copyright_suffix: String,
    /// インストーラーのマニフェスト assemblyIdentity@name 期待値
    pub manifest_identity: String,
    /// インストーラーのバージョン情報 ProductName 期待値
    pub installer_product_name: String,
    /// 穏当な終了を待つ上限（ミリ秒）
    pub close_timeout_ms: u32,
    /// インストール先ごとに書き出すインストーラーログ名
    pub install_log_name: String,
    /// 更新後に再起動するか（既定値）
    pub restart_after_update: bool,
    pub package_site_url: String,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            target_image_name: DEFAULT_TARGET_IMAGE_NAME.into(),
            copyright_prefix: DEFAULT_COPYRIGHT_PREFIX.into(),
            copyright_suffix: DEFAULT_COPYRIGHT_SUFFIX.into(),
            manifest_identity: DEFAULT_MANIFEST_IDENTITY.into(),
            installer_product_name: DEFAULT_INSTALLER_PRODUCT_NAME.into(),
            close_timeout_ms: DEFAULT_CLOSE_TIMEOUT_MS,
            install_log_name: DEFAULT_INSTALL_LOG_NAME.into(),
            restart_after_update: true,
            package_site_url: DEFAULT_PACKAGE_SITE_URL.into(),
        }
    }
}

impl UpdaterConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            ("target_image_name", &self.target_image_name),
            ("copyright_prefix", &self.copyright_prefix),
            ("copyright_suffix", &self.copyright_suffix),
            ("manifest_identity", &self.manifest_identity),
            ("installer_product_name", &self.installer_product_name),
            ("install_log_name", &self.install_log_name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DomainError::InvalidConfig(format!(
                    "{field} must not be empty"
                )));
            }
        }
        if self.close_timeout_ms == 0 || self.close_timeout_ms > MAX_CLOSE_TIMEOUT_MS {
            return Err(DomainError::InvalidConfig(format!(
                "close_timeout_ms must be within 1-{} (got {})",
                MAX_CLOSE_TIMEOUT_MS, self.close_timeout_ms
            )));
        }
        if self.target_image_name.contains(['\\', '/']) {
            return Err(DomainError::InvalidConfig(
                "target_image_name must be a bare image name".into(),
            ));
        }
        if self.install_log_name.contains(['\\', '/']) {
            return Err(DomainError::InvalidConfig(
                "install_log_name must be a file name".into(),
            ));
        }
        Ok(())
    }

    pub fn close_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(u64::from(self.close_timeout_ms))
    }
}

/// 実行時情報（起動時に一度だけ計算）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInfo {
    pub app_name: String,
    pub app_version: String,
    pub os_description: String,
    pub elevated: bool,
    /// `DOMAIN\user` 形式
    pub identity: Option<String>,
}

impl RuntimeInfo {
    pub fn banner(&self) -> String {
        format!("{} v{}", self.app_name, self.app_version)
    }
}
