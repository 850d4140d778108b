//! mu-adapter-process: 対象プロセスの列挙・コンテキスト取得・停止・再起動と
//! インストーラー実行を行うアダプタ。
//!
//! Windows 以外では何もしない実装になる（列挙は空、昇格なし、起動は通常起動のみ）。

mod capture;
mod installer;
mod launch;
mod os;
mod scan;
#[cfg(windows)]
mod win;

pub use capture::{ContextCaptureAdapter, PrivilegeProbeAdapter};
pub use installer::InstallerRunnerAdapter;
pub use launch::ProcessLauncherAdapter;
pub use os::{format_windows_version, os_description};
pub use scan::ProcessScannerAdapter;

#[cfg(windows)]
const COMPONENT: &str = "PROCESS";

/// 1601-01-01 から 1970-01-01 までの 100ns 単位
#[cfg_attr(not(windows), allow(dead_code))]
const FILETIME_UNIX_EPOCH: u64 = 116_444_736_000_000_000;

/// `ProScan` → `ProScan.exe`（拡張子が付いていればそのまま）
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn image_file_name(image_name: &str) -> String {
    let name = image_name.trim();
    if name.to_ascii_lowercase().ends_with(".exe") {
        name.to_string()
    } else {
        format!("{}.exe", name)
    }
}

/// スナップショットの実行ファイル名がイメージ名に一致するか（大文字小文字無視）
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn matches_image(exe_file: &str, image_name: &str) -> bool {
    !image_name.trim().is_empty() && exe_file.eq_ignore_ascii_case(&image_file_name(image_name))
}

/// `ProScan.exe` → `ProScan`
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn image_stem(exe_file: &str) -> &str {
    let split = exe_file.len().saturating_sub(4);
    match exe_file.get(split..) {
        Some(ext) if split > 0 && ext.eq_ignore_ascii_case(".exe") => &exe_file[..split],
        _ => exe_file,
    }
}

/// FILETIME（100ns 単位）→ (UNIX 秒, ミリ秒)。1970 年より前は None
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn filetime_to_unix(ticks: u64) -> Option<(u64, u32)> {
    let since_epoch = ticks.checked_sub(FILETIME_UNIX_EPOCH)?;
    let millis_total = since_epoch / 10_000;
    Some((millis_total / 1000, (millis_total % 1000) as u32))
}

/// `DOMAIN\user`。ドメインが空ならユーザー名のみ
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn qualified_account(domain: &str, name: &str) -> String {
    if domain.is_empty() {
        name.to_string()
    } else {
        format!("{}\\{}", domain, name)
    }
}
