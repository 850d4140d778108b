//! 実行環境の情報（権限・ユーザー・OS）

use mu_adapter_process::os_description;
use mu_domain::model::RuntimeInfo;
use mu_domain::port::driven::PrivilegeProbe;

pub const APP_NAME: &str = "ProScan Multi Updater";

/// 起動時に一度だけ取得する
pub fn detect_runtime_info(privilege: &dyn PrivilegeProbe) -> RuntimeInfo {
    RuntimeInfo {
        app_name: APP_NAME.to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        os_description: os_description(),
        elevated: privilege.is_elevated(),
        identity: privilege.current_identity(),
    }
}

/// セッション冒頭に出す環境情報
pub fn describe(info: &RuntimeInfo) -> Vec<String> {
    vec![
        info.banner(),
        format!("OS: {}", info.os_description),
        format!(
            "Running as: {}{}",
            info.identity.as_deref().unwrap_or("<unknown>"),
            if info.elevated { " (elevated)" } else { "" }
        ),
    ]
}
