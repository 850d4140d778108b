//! 起動コンテキストの取得と権限照会

use std::path::{Path, PathBuf};

use mu_domain::model::{SecurityContext, TargetProcess};
use mu_domain::port::driven::{PrivilegeProbe, SecurityContextCapture};

/// 停止前のコンテキスト取得。トークンは昇格時のみ複製する
#[derive(Debug)]
pub struct ContextCaptureAdapter {
    elevated: bool,
}

impl ContextCaptureAdapter {
    pub fn new(elevated: bool) -> Self {
        Self { elevated }
    }
}

impl SecurityContextCapture for ContextCaptureAdapter {
    fn capture(&self, process: &dyn TargetProcess, known_path: Option<&Path>) -> SecurityContext {
        let executable_path =
            platform::image_path(process).or_else(|| known_path.map(Path::to_path_buf));
        let working_directory = executable_path
            .as_deref()
            .and_then(Path::parent)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(PathBuf::from);
        let arguments = platform::arguments(process);

        let (owner, token) = if self.elevated {
            platform::duplicate_token(process.pid())
        } else {
            (platform::current_identity(), None)
        };

        SecurityContext {
            executable_path,
            working_directory,
            arguments,
            owner,
            token,
        }
    }
}

#[derive(Debug, Default)]
pub struct PrivilegeProbeAdapter;

impl PrivilegeProbeAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl PrivilegeProbe for PrivilegeProbeAdapter {
    fn is_elevated(&self) -> bool {
        platform::is_elevated()
    }

    fn current_identity(&self) -> Option<String> {
        platform::current_identity()
    }
}

#[cfg(windows)]
mod platform {
    use std::path::PathBuf;

    use mu_domain::model::{SecurityToken, TargetProcess, TokenHandle};
    use mu_domain::service::split_program;
    use windows::Wdk::System::Threading::{NtQueryInformationProcess, PROCESSINFOCLASS};
    use windows::Win32::Foundation::{CloseHandle, HANDLE, UNICODE_STRING};
    use windows::Win32::Security::{
        DuplicateTokenEx, SecurityImpersonation, TOKEN_ALL_ACCESS, TOKEN_DUPLICATE, TOKEN_QUERY,
        TokenPrimary,
    };
    use windows::Win32::System::Threading::{
        OpenProcess, OpenProcessToken, PROCESS_QUERY_INFORMATION,
        PROCESS_QUERY_LIMITED_INFORMATION,
    };

    use crate::win::{self, HandleGuard, log_last_error, query_image_path};

    const PROCESS_COMMAND_LINE_INFORMATION: PROCESSINFOCLASS = PROCESSINFOCLASS(60);

    /// 複製したプライマリトークン。Drop で一度だけ閉じる
    struct OwnedToken(HANDLE);

    impl TokenHandle for OwnedToken {
        fn raw(&self) -> isize {
            self.0.0 as isize
        }
    }

    impl Drop for OwnedToken {
        fn drop(&mut self) {
            unsafe {
                let _ = CloseHandle(self.0);
            }
        }
    }

    fn handle_of(process: &dyn TargetProcess) -> Option<HANDLE> {
        process
            .raw_handle()
            .map(|raw| HANDLE(raw as *mut core::ffi::c_void))
    }

    pub fn image_path(process: &dyn TargetProcess) -> Option<PathBuf> {
        query_image_path(handle_of(process)?)
    }

    pub fn arguments(process: &dyn TargetProcess) -> String {
        handle_of(process)
            .and_then(command_line)
            .map(|cmdline| split_program(&cmdline).1.to_string())
            .unwrap_or_default()
    }

    fn command_line(handle: HANDLE) -> Option<String> {
        unsafe {
            let mut len = 0u32;
            let _ = NtQueryInformationProcess(
                handle,
                PROCESS_COMMAND_LINE_INFORMATION,
                std::ptr::null_mut(),
                0,
                &mut len,
            );
            if len == 0 || len > 1 << 20 {
                return None;
            }
            // UNICODE_STRING の直後に文字列本体が続く
            let mut buffer = vec![0u64; (len as usize).div_ceil(8)];
            let status = NtQueryInformationProcess(
                handle,
                PROCESS_COMMAND_LINE_INFORMATION,
                buffer.as_mut_ptr() as *mut _,
                len,
                &mut len,
            );
            if status.is_err() {
                return None;
            }
            let text = &*(buffer.as_ptr() as *const UNICODE_STRING);
            if text.Buffer.is_null() || text.Length == 0 {
                return Some(String::new());
            }
            let chars = std::slice::from_raw_parts(text.Buffer.0, text.Length as usize / 2);
            Some(String::from_utf16_lossy(chars))
        }
    }

    /// 対象のトークンを複製し、所有者名と共に返す。
    /// 元トークンとプロセスハンドルは結果に関わらずここで閉じる。
    pub fn duplicate_token(pid: u32) -> (Option<String>, Option<SecurityToken>) {
        unsafe {
            let process = match OpenProcess(PROCESS_QUERY_INFORMATION, false, pid)
                .or_else(|_| OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid))
            {
                Ok(handle) => handle,
                Err(_) => {
                    log_last_error(&format!("capture {}: OpenProcess failed", pid));
                    return (None, None);
                }
            };
            let _process_guard = HandleGuard(process);

            let mut source = HANDLE::default();
            if OpenProcessToken(process, TOKEN_QUERY | TOKEN_DUPLICATE, &mut source).is_err() {
                log_last_error(&format!("capture {}: OpenProcessToken failed", pid));
                return (None, None);
            }
            let _source_guard = HandleGuard(source);
            let owner = win::token_user_name(source);

            let mut primary = HANDLE::default();
            if DuplicateTokenEx(
                source,
                TOKEN_ALL_ACCESS,
                None,
                SecurityImpersonation,
                TokenPrimary,
                &mut primary,
            )
            .is_err()
            {
                log_last_error(&format!("capture {}: DuplicateTokenEx failed", pid));
                return (owner, None);
            }
            (owner, Some(SecurityToken::new(Box::new(OwnedToken(primary)))))
        }
    }

    pub fn is_elevated() -> bool {
        win::is_current_process_elevated()
    }

    pub fn current_identity() -> Option<String> {
        win::current_identity()
    }
}

#[cfg(not(windows))]
mod platform {
    use std::path::PathBuf;

    use mu_domain::model::{SecurityToken, TargetProcess};

    pub fn image_path(_process: &dyn TargetProcess) -> Option<PathBuf> {
        None
    }

    pub fn arguments(_process: &dyn TargetProcess) -> String {
        String::new()
    }

    pub fn duplicate_token(_pid: u32) -> (Option<String>, Option<SecurityToken>) {
        (None, None)
    }

    pub fn is_elevated() -> bool {
        false
    }

    pub fn current_identity() -> Option<String> {
        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .ok()
            .filter(|name| !name.is_empty())
    }
}
