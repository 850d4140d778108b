//! 対象プロセスの列挙と、発見時に開いたハンドルによる停止操作

use mu_domain::DomainError;
use mu_domain::model::ScanEntry;
use mu_domain::port::driven::ProcessScanner;

#[derive(Debug, Default)]
pub struct ProcessScannerAdapter;

impl ProcessScannerAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessScanner for ProcessScannerAdapter {
    fn scan(&self, image_name: &str) -> Result<Vec<ScanEntry>, DomainError> {
        #[cfg(windows)]
        {
            windows_scan::scan(image_name)
        }
        #[cfg(not(windows))]
        {
            let _ = image_name;
            Ok(Vec::new())
        }
    }
}

#[cfg(windows)]
mod windows_scan {
    use std::time::Duration;

    use mu_domain::DomainError;
    use mu_domain::model::{DiscoveredProcess, ScanEntry, TargetProcess};
    use mu_log_utils::format_utc_millis;
    use windows::Win32::Foundation::{FILETIME, HANDLE, HWND, LPARAM, WAIT_OBJECT_0, WPARAM};
    use windows::Win32::System::Threading::{
        GetProcessTimes, INFINITE, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
        PROCESS_SYNCHRONIZE, PROCESS_TERMINATE, TerminateProcess, WaitForSingleObject,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        EnumWindows, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId,
        IsWindowVisible, PostMessageW, WM_CLOSE,
    };
    use windows::core::BOOL;

    use crate::win::{HandleGuard, find_processes, query_image_path};
    use crate::{filetime_to_unix, image_stem};

    pub fn scan(image_name: &str) -> Result<Vec<ScanEntry>, DomainError> {
        let mut entries = Vec::new();
        for (pid, exe_file) in find_processes(image_name)? {
            match WinProcess::open(pid) {
                Ok(process) => {
                    let handle = process.handle.0;
                    entries.push(ScanEntry::Found(DiscoveredProcess {
                        pid,
                        image_name: image_stem(&exe_file).to_string(),
                        known_path: query_image_path(handle),
                        title: main_window_title(pid),
                        started_at: start_time(handle),
                        process: Box::new(process),
                    }));
                }
                Err(reason) => entries.push(ScanEntry::Unreadable { pid, reason }),
            }
        }
        Ok(entries)
    }

    /// 発見時に開いたプロセスハンドル。pid で開き直さない
    struct WinProcess {
        pid: u32,
        handle: HandleGuard,
    }

    impl WinProcess {
        fn open(pid: u32) -> Result<Self, String> {
            let full = PROCESS_SYNCHRONIZE | PROCESS_TERMINATE | PROCESS_QUERY_LIMITED_INFORMATION;
            let handle = unsafe { OpenProcess(full, false, pid) }
                .or_else(|_| unsafe {
                    OpenProcess(
                        PROCESS_SYNCHRONIZE | PROCESS_QUERY_LIMITED_INFORMATION,
                        false,
                        pid,
                    )
                })
                .map_err(|e| format!("OpenProcess failed: {}", e.message()))?;
            Ok(Self {
                pid,
                handle: HandleGuard(handle),
            })
        }
    }

    impl TargetProcess for WinProcess {
        fn pid(&self) -> u32 {
            self.pid
        }

        fn has_exited(&self) -> bool {
            unsafe { WaitForSingleObject(self.handle.0, 0) == WAIT_OBJECT_0 }
        }

        fn request_close(&self) -> bool {
            let mut posted = false;
            for hwnd in visible_windows(self.pid) {
                if unsafe { PostMessageW(Some(hwnd), WM_CLOSE, WPARAM(0), LPARAM(0)) }.is_ok() {
                    posted = true;
                }
            }
            posted
        }

        fn wait_for_exit(&self, timeout: Option<Duration>) -> bool {
            let millis = match timeout {
                Some(t) => t.as_millis().min(u128::from(INFINITE - 1)) as u32,
                None => INFINITE,
            };
            unsafe { WaitForSingleObject(self.handle.0, millis) == WAIT_OBJECT_0 }
        }

        fn kill(&self) -> Result<(), DomainError> {
            unsafe { TerminateProcess(self.handle.0, 1) }.map_err(|e| {
                DomainError::TerminationFailed(format!(
                    "TerminateProcess failed for {}: {}",
                    self.pid,
                    e.message()
                ))
            })
        }

        fn raw_handle(&self) -> Option<isize> {
            Some(self.handle.0.0 as isize)
        }
    }

    struct WindowSearch {
        pid: u32,
        found: Vec<HWND>,
    }

    unsafe extern "system" fn collect_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
        unsafe {
            let search = &mut *(lparam.0 as *mut WindowSearch);
            let mut owner = 0u32;
            GetWindowThreadProcessId(hwnd, Some(&mut owner));
            if owner == search.pid && IsWindowVisible(hwnd).as_bool() {
                search.found.push(hwnd);
            }
        }
        BOOL(1)
    }

    /// pid が所有する可視トップレベルウィンドウ
    fn visible_windows(pid: u32) -> Vec<HWND> {
        let mut search = WindowSearch {
            pid,
            found: Vec::new(),
        };
        unsafe {
            let _ = EnumWindows(
                Some(collect_window),
                LPARAM(&mut search as *mut WindowSearch as isize),
            );
        }
        search.found
    }

    fn main_window_title(pid: u32) -> String {
        for hwnd in visible_windows(pid) {
            let len = unsafe { GetWindowTextLengthW(hwnd) };
            if len <= 0 {
                continue;
            }
            let mut buffer = vec![0u16; len as usize + 1];
            let copied = unsafe { GetWindowTextW(hwnd, &mut buffer) };
            if copied > 0 {
                return String::from_utf16_lossy(&buffer[..copied as usize]);
            }
        }
        String::new()
    }

    fn start_time(handle: HANDLE) -> Option<String> {
        let mut creation = FILETIME::default();
        let mut exit = FILETIME::default();
        let mut kernel = FILETIME::default();
        let mut user = FILETIME::default();
        unsafe { GetProcessTimes(handle, &mut creation, &mut exit, &mut kernel, &mut user) }
            .ok()?;
        let ticks = (u64::from(creation.dwHighDateTime) << 32) | u64::from(creation.dwLowDateTime);
        let (secs, millis) = filetime_to_unix(ticks)?;
        Some(format_utc_millis(secs, millis))
    }
}
