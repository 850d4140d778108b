//! 時刻アダプター
use mu_domain::port::driven::Clock;

#[derive(Debug, Default)]
pub struct ClockAdapter;

impl ClockAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for ClockAdapter {
    fn now_ms(&self) -> u64 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        now.as_millis() as u64
    }

    fn now_iso8601(&self) -> String {
        utc_rfc3339_now()
    }
}

fn utc_rfc3339_now() -> String {
    #[cfg(windows)]
    {
        use windows::Win32::System::SystemInformation::GetSystemTime;
        let st = unsafe { GetSystemTime() };
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
            st.wYear,
            st.wMonth,
            st.wDay,
            st.wHour,
            st.wMinute,
            st.wSecond,
            st.wMilliseconds
        )
    }
    #[cfg(not(windows))]
    {
        mu_log_utils::utc_rfc3339_millis()
    }
}
