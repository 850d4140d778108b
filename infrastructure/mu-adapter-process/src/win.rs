//! Win32 共通ヘルパー（ハンドルガード、ワイド文字列、トークン照会）

use std::ffi::OsStr;
use std::path::PathBuf;

use mu_domain::DomainError;
use mu_log_utils::write_lifecycle_line;
use windows::Win32::Foundation::{CloseHandle, ERROR_INSUFFICIENT_BUFFER, GetLastError, HANDLE};
use windows::Win32::Security::{
    GetTokenInformation, LookupAccountSidW, SID_NAME_USE, TOKEN_ELEVATION, TOKEN_QUERY,
    TOKEN_USER, TokenElevation, TokenUser,
};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
    TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Threading::{
    GetCurrentProcess, OpenProcessToken, PROCESS_NAME_WIN32, QueryFullProcessImageNameW,
};
use windows::core::{PCWSTR, PWSTR};

use crate::{COMPONENT, matches_image, qualified_account};

/// スコープ終了時に CloseHandle する
pub(crate) struct HandleGuard(pub(crate) HANDLE);

impl Drop for HandleGuard {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

pub(crate) fn to_wide(s: &str) -> Vec<u16> {
    let mut wide: Vec<u16> = s.encode_utf16().collect();
    wide.push(0);
    wide
}

pub(crate) fn to_wide_os(s: &OsStr) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;
    let mut wide: Vec<u16> = s.encode_wide().collect();
    wide.push(0);
    wide
}

fn wchar_to_string(chars: &[u16]) -> String {
    let len = chars.iter().position(|&c| c == 0).unwrap_or(chars.len());
    String::from_utf16_lossy(&chars[..len])
}

pub(crate) fn log_last_error(prefix: &str) {
    let err = unsafe { GetLastError().0 };
    write_lifecycle_line(COMPONENT, &format!("{} (GetLastError={})", prefix, err));
}

/// イメージ名に一致するプロセスの (pid, 実行ファイル名)
pub(crate) fn find_processes(image_name: &str) -> Result<Vec<(u32, String)>, DomainError> {
    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0).map_err(|e| {
            DomainError::EnumerationFailed(format!(
                "CreateToolhelp32Snapshot failed: {}",
                e.message()
            ))
        })?;
        let _guard = HandleGuard(snapshot);

        let mut entry = PROCESSENTRY32W {
            dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };
        let mut found = Vec::new();
        if Process32FirstW(snapshot, &mut entry).is_ok() {
            loop {
                let exe = wchar_to_string(&entry.szExeFile);
                if matches_image(&exe, image_name) {
                    found.push((entry.th32ProcessID, exe));
                }
                if Process32NextW(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }
        Ok(found)
    }
}

/// QueryFullProcessImageNameW（バッファ不足なら拡張して再試行）
pub(crate) fn query_image_path(handle: HANDLE) -> Option<PathBuf> {
    unsafe {
        let mut cap: usize = 260;
        loop {
            let mut buffer = vec![0u16; cap];
            let mut size = buffer.len() as u32;
            let result = QueryFullProcessImageNameW(
                handle,
                PROCESS_NAME_WIN32,
                PWSTR(buffer.as_mut_ptr()),
                &mut size,
            );

            if result.is_ok() && size > 0 {
                return Some(PathBuf::from(String::from_utf16_lossy(
                    &buffer[..size as usize],
                )));
            }

            let err = GetLastError();
            if err == ERROR_INSUFFICIENT_BUFFER && cap < 32768 {
                let required = (size as usize).saturating_add(1);
                cap = cap.saturating_mul(2).max(required).min(32768);
                continue;
            }
            return None;
        }
    }
}

pub(crate) fn is_current_process_elevated() -> bool {
    unsafe {
        let mut token = HANDLE::default();
        if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token).is_err() {
            return false;
        }
        let _guard = HandleGuard(token);

        let mut elevation = TOKEN_ELEVATION::default();
        let mut ret_len = 0u32;
        let ok = GetTokenInformation(
            token,
            TokenElevation,
            Some(&mut elevation as *mut _ as *mut _),
            std::mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut ret_len,
        )
        .is_ok();

        ok && elevation.TokenIsElevated != 0
    }
}

pub(crate) fn current_identity() -> Option<String> {
    unsafe {
        let mut token = HANDLE::default();
        if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token).is_err() {
            return None;
        }
        let _guard = HandleGuard(token);
        token_user_name(token)
    }
}

/// トークンの TokenUser を `DOMAIN\user` へ解決する
pub(crate) fn token_user_name(token: HANDLE) -> Option<String> {
    unsafe {
        let mut len = 0u32;
        let _ = GetTokenInformation(token, TokenUser, None, 0, &mut len);
        if len == 0 {
            return None;
        }
        // TOKEN_USER はポインタを含むので 8 バイト境界に置く
        let mut buffer = vec![0u64; (len as usize).div_ceil(8)];
        GetTokenInformation(
            token,
            TokenUser,
            Some(buffer.as_mut_ptr() as *mut _),
            len,
            &mut len,
        )
        .ok()?;
        let user = &*(buffer.as_ptr() as *const TOKEN_USER);
        let sid = user.User.Sid;

        let mut name_len = 0u32;
        let mut domain_len = 0u32;
        let mut sid_use = SID_NAME_USE::default();
        let _ = LookupAccountSidW(
            PCWSTR::null(),
            sid,
            None,
            &mut name_len,
            None,
            &mut domain_len,
            &mut sid_use,
        );
        if name_len == 0 {
            return None;
        }
        let mut name = vec![0u16; name_len as usize];
        let mut domain = vec![0u16; domain_len.max(1) as usize];
        if LookupAccountSidW(
            PCWSTR::null(),
            sid,
            Some(PWSTR(name.as_mut_ptr())),
            &mut name_len,
            Some(PWSTR(domain.as_mut_ptr())),
            &mut domain_len,
            &mut sid_use,
        )
        .is_err()
        {
            log_last_error("LookupAccountSidW failed");
            return None;
        }
        Some(qualified_account(
            &wchar_to_string(&domain),
            &wchar_to_string(&name),
        ))
    }
}
