//! 再起動用の起動アダプタ
//!
//! トークン起動は CreateProcessWithTokenW（ログオンフラグなし、
//! `"exe" args` のコマンドライン、作業ディレクトリ指定）で行う。

use std::process::Command;

use mu_domain::model::{LaunchError, RelaunchRequest, SecurityToken};
use mu_domain::port::driven::ProcessLauncher;

#[derive(Debug, Default)]
pub struct ProcessLauncherAdapter;

impl ProcessLauncherAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for ProcessLauncherAdapter {
    fn launch_with_token(
        &self,
        token: &SecurityToken,
        request: &RelaunchRequest,
    ) -> Result<Option<u32>, LaunchError> {
        #[cfg(windows)]
        {
            windows_launch::with_token(token.raw(), request)
        }
        #[cfg(not(windows))]
        {
            let _ = (token, request);
            Err(LaunchError::Failed(
                "token launch is only available on Windows".into(),
            ))
        }
    }

    fn launch_as_shell_owner(&self, request: &RelaunchRequest) -> Result<Option<u32>, LaunchError> {
        #[cfg(windows)]
        {
            windows_launch::as_shell_owner(request)
        }
        #[cfg(not(windows))]
        {
            let _ = request;
            Err(LaunchError::TokenUnavailable("no desktop shell".into()))
        }
    }

    fn launch_as_caller(&self, request: &RelaunchRequest) -> Result<Option<u32>, LaunchError> {
        let mut command = Command::new(&request.executable);
        append_arguments(&mut command, &request.arguments);
        if let Some(dir) = request.effective_working_directory() {
            command.current_dir(dir);
        }
        let child = command.spawn().map_err(|e| {
            LaunchError::Failed(format!("{}: {}", request.executable.display(), e))
        })?;
        Ok(Some(child.id()))
    }
}

/// 引数文字列はそのまま渡す（分解すると引用符が崩れる）
#[cfg(windows)]
fn append_arguments(command: &mut Command, arguments: &str) {
    use std::os::windows::process::CommandExt;
    let arguments = arguments.trim();
    if !arguments.is_empty() {
        command.raw_arg(arguments);
    }
}

#[cfg(not(windows))]
fn append_arguments(command: &mut Command, arguments: &str) {
    command.args(arguments.split_whitespace());
}

#[cfg(windows)]
mod windows_launch {
    use mu_domain::model::{LaunchError, RelaunchRequest};
    use mu_log_utils::write_lifecycle_line;
    use windows::Win32::Foundation::{
        CloseHandle, ERROR_NOT_ALL_ASSIGNED, GetLastError, HANDLE, LUID,
    };
    use windows::Win32::Security::{
        AdjustTokenPrivileges, DuplicateTokenEx, LUID_AND_ATTRIBUTES, LookupPrivilegeValueW,
        SE_PRIVILEGE_ENABLED, SecurityImpersonation, TOKEN_ADJUST_DEFAULT,
        TOKEN_ADJUST_PRIVILEGES, TOKEN_ADJUST_SESSIONID, TOKEN_ASSIGN_PRIMARY, TOKEN_DUPLICATE,
        TOKEN_PRIVILEGES, TOKEN_QUERY, TokenPrimary,
    };
    use windows::Win32::System::Threading::{
        CREATE_PROCESS_LOGON_FLAGS, CreateProcessWithTokenW, GetCurrentProcess, OpenProcess,
        OpenProcessToken, PROCESS_INFORMATION, PROCESS_QUERY_LIMITED_INFORMATION, STARTUPINFOW,
    };
    use windows::Win32::UI::WindowsAndMessaging::{GetShellWindow, GetWindowThreadProcessId};
    use windows::core::{PCWSTR, PWSTR};

    use crate::COMPONENT;
    use crate::win::{HandleGuard, find_processes, log_last_error, to_wide, to_wide_os};

    const TOKEN_PRIVILEGES_NEEDED: [&str; 3] = [
        "SeIncreaseQuotaPrivilege",
        "SeImpersonatePrivilege",
        "SeAssignPrimaryTokenPrivilege",
    ];

    pub fn with_token(raw: isize, request: &RelaunchRequest) -> Result<Option<u32>, LaunchError> {
        enable_launch_privileges();
        let token = HANDLE(raw as *mut core::ffi::c_void);
        create_with_token(token, request, "captured")
    }

    pub fn as_shell_owner(request: &RelaunchRequest) -> Result<Option<u32>, LaunchError> {
        enable_launch_privileges();
        let token = shell_owner_token()?;
        create_with_token(token.0, request, "shell")
    }

    fn enable_launch_privileges() {
        for name in TOKEN_PRIVILEGES_NEEDED {
            enable_privilege(name);
        }
    }

    fn enable_privilege(name: &str) {
        unsafe {
            let mut token = HANDLE::default();
            if OpenProcessToken(
                GetCurrentProcess(),
                TOKEN_ADJUST_PRIVILEGES | TOKEN_QUERY,
                &mut token,
            )
            .is_err()
            {
                log_last_error("enable_privilege: OpenProcessToken failed");
                return;
            }
            let _guard = HandleGuard(token);

            let name_w = to_wide(name);
            let mut luid = LUID::default();
            if LookupPrivilegeValueW(None, PCWSTR(name_w.as_ptr()), &mut luid).is_err() {
                log_last_error("enable_privilege: LookupPrivilegeValueW failed");
                return;
            }

            let mut privileges = TOKEN_PRIVILEGES {
                PrivilegeCount: 1,
                Privileges: [LUID_AND_ATTRIBUTES {
                    Luid: luid,
                    Attributes: SE_PRIVILEGE_ENABLED,
                }],
            };
            if AdjustTokenPrivileges(token, false, Some(&mut privileges), 0, None, None).is_err() {
                log_last_error("enable_privilege: AdjustTokenPrivileges failed");
                return;
            }
            if GetLastError() == ERROR_NOT_ALL_ASSIGNED {
                write_lifecycle_line(
                    COMPONENT,
                    &format!("enable_privilege: {} not assigned", name),
                );
            }
        }
    }

    /// シェルウィンドウの所有プロセス、なければ最初の explorer.exe
    fn shell_owner_pid() -> Option<u32> {
        unsafe {
            let shell = GetShellWindow();
            if shell.0 != std::ptr::null_mut() {
                let mut pid = 0u32;
                GetWindowThreadProcessId(shell, Some(&mut pid));
                if pid != 0 {
                    return Some(pid);
                }
            }
        }
        write_lifecycle_line(COMPONENT, "relaunch: no shell window, looking for explorer.exe");
        find_processes("explorer")
            .ok()
            .and_then(|found| found.first().map(|(pid, _)| *pid))
    }

    fn shell_owner_token() -> Result<HandleGuard, LaunchError> {
        let pid = shell_owner_pid()
            .ok_or_else(|| LaunchError::TokenUnavailable("no shell process".into()))?;
        unsafe {
            let process = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).map_err(|e| {
                LaunchError::TokenUnavailable(format!(
                    "OpenProcess({}) failed: {}",
                    pid,
                    e.message()
                ))
            })?;
            let _process_guard = HandleGuard(process);

            let mut token = HANDLE::default();
            if OpenProcessToken(process, TOKEN_DUPLICATE | TOKEN_QUERY, &mut token).is_err() {
                log_last_error("relaunch: OpenProcessToken(shell) failed");
                return Err(LaunchError::TokenUnavailable(
                    "OpenProcessToken(shell) failed".into(),
                ));
            }
            let _token_guard = HandleGuard(token);

            let primary_access = TOKEN_DUPLICATE
                | TOKEN_ASSIGN_PRIMARY
                | TOKEN_QUERY
                | TOKEN_ADJUST_DEFAULT
                | TOKEN_ADJUST_SESSIONID;
            let mut dup = HANDLE::default();
            if DuplicateTokenEx(
                token,
                primary_access,
                None,
                SecurityImpersonation,
                TokenPrimary,
                &mut dup,
            )
            .is_err()
            {
                log_last_error("relaunch: DuplicateTokenEx(shell) failed");
                return Err(LaunchError::TokenUnavailable(
                    "DuplicateTokenEx(shell) failed".into(),
                ));
            }
            Ok(HandleGuard(dup))
        }
    }

    fn create_with_token(
        token: HANDLE,
        request: &RelaunchRequest,
        context: &str,
    ) -> Result<Option<u32>, LaunchError> {
        let mut cmdline = to_wide(&request.command_line());
        let cwd = request
            .effective_working_directory()
            .map(|dir| to_wide_os(dir.as_os_str()));
        let cwd_ptr = cwd
            .as_ref()
            .map(|w| PCWSTR(w.as_ptr()))
            .unwrap_or(PCWSTR::null());

        let si = STARTUPINFOW {
            cb: std::mem::size_of::<STARTUPINFOW>() as u32,
            ..Default::default()
        };
        let mut pi = PROCESS_INFORMATION::default();

        unsafe {
            match CreateProcessWithTokenW(
                token,
                CREATE_PROCESS_LOGON_FLAGS(0),
                PCWSTR::null(),
                Some(PWSTR(cmdline.as_mut_ptr())),
                Default::default(),
                None,
                cwd_ptr,
                &si,
                &mut pi,
            ) {
                Ok(()) => {
                    let _ = CloseHandle(pi.hProcess);
                    let _ = CloseHandle(pi.hThread);
                    Ok(Some(pi.dwProcessId))
                }
                Err(e) => {
                    log_last_error(&format!(
                        "relaunch {}: CreateProcessWithTokenW failed",
                        context
                    ));
                    Err(LaunchError::Failed(format!(
                        "CreateProcessWithTokenW ({}) failed: {}",
                        context,
                        e.message()
                    )))
                }
            }
        }
    }
}
