//! OS の表示名（HKLM\SOFTWARE\Microsoft\Windows NT\CurrentVersion）

/// Windows 11 以降の最初のビルド番号
const WINDOWS_11_FIRST_BUILD: u32 = 22000;

/// レジストリ値から表示名を組み立てる。
/// ProductName はビルド 22000 以降でも "Windows 10" のままなので置き換える
pub fn format_windows_version(
    product_name: Option<&str>,
    current_build: Option<&str>,
    display_version: Option<&str>,
) -> String {
    let build: u32 = current_build
        .and_then(|b| b.trim().parse().ok())
        .unwrap_or(0);
    let mut product = product_name.unwrap_or("Windows").to_string();
    if build >= WINDOWS_11_FIRST_BUILD {
        product = product.replace("Windows 10", "Windows 11");
    }
    match display_version {
        Some(version) => format!("{} {} (Build {})", product, version, build),
        None => format!("{} (Build {})", product, build),
    }
}

/// 実行中 OS の説明文字列
#[cfg(windows)]
pub fn os_description() -> String {
    match win::CurrentVersionKey::open() {
        Some(key) => {
            let display = key
                .string("DisplayVersion")
                .or_else(|| key.string("ReleaseId"));
            format_windows_version(
                key.string("ProductName").as_deref(),
                key.string("CurrentBuild").as_deref(),
                display.as_deref(),
            )
        }
        None => "Unknown Windows".to_string(),
    }
}

#[cfg(not(windows))]
pub fn os_description() -> String {
    format!("{} ({})", std::env::consts::OS, std::env::consts::ARCH)
}

#[cfg(windows)]
mod win {
    use windows::Win32::Foundation::ERROR_SUCCESS;
    use windows::Win32::System::Registry::{
        HKEY, HKEY_LOCAL_MACHINE, KEY_QUERY_VALUE, REG_VALUE_TYPE, RRF_RT_REG_SZ, RegCloseKey,
        RegGetValueW, RegOpenKeyExW,
    };
    use windows::core::PCWSTR;

    use crate::win::to_wide;

    const CURRENT_VERSION_PATH: &str = r"SOFTWARE\Microsoft\Windows NT\CurrentVersion";

    pub(super) struct CurrentVersionKey(HKEY);

    impl CurrentVersionKey {
        pub(super) fn open() -> Option<Self> {
            let wide_path = to_wide(CURRENT_VERSION_PATH);
            let mut key = HKEY::default();
            let status = unsafe {
                RegOpenKeyExW(
                    HKEY_LOCAL_MACHINE,
                    PCWSTR(wide_path.as_ptr()),
                    Some(0),
                    KEY_QUERY_VALUE,
                    &mut key,
                )
            };
            (status == ERROR_SUCCESS).then_some(Self(key))
        }

        /// REG_SZ を読む。存在しない・型違いは None
        pub(super) fn string(&self, name: &str) -> Option<String> {
            let wide_name = to_wide(name);
            let mut value_type = REG_VALUE_TYPE(0);
            let mut size_bytes: u32 = 0;
            let status = unsafe {
                RegGetValueW(
                    self.0,
                    PCWSTR::null(),
                    PCWSTR(wide_name.as_ptr()),
                    RRF_RT_REG_SZ,
                    Some(&mut value_type),
                    None,
                    Some(&mut size_bytes),
                )
            };
            if status != ERROR_SUCCESS {
                return None;
            }

            let mut buffer: Vec<u16> = vec![0u16; (size_bytes as usize / 2).max(1)];
            let status = unsafe {
                RegGetValueW(
                    self.0,
                    PCWSTR::null(),
                    PCWSTR(wide_name.as_ptr()),
                    RRF_RT_REG_SZ,
                    Some(&mut value_type),
                    Some(buffer.as_mut_ptr() as *mut _),
                    Some(&mut size_bytes),
                )
            };
            if status != ERROR_SUCCESS {
                return None;
            }
            let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
            Some(String::from_utf16_lossy(&buffer[..len]))
        }
    }

    impl Drop for CurrentVersionKey {
        fn drop(&mut self) {
            let _ = unsafe { RegCloseKey(self.0) };
        }
    }
}
