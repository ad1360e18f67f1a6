//! Win32 probes.
#![allow(unsafe_code)]

use std::io;
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use windows_sys::Win32::Foundation::{CloseHandle, HWND};
use windows_sys::Win32::System::SystemInformation::GetTickCount;
use windows_sys::Win32::System::Threading::{
    OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
    QueryFullProcessImageNameW,
};
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{GetLastInputInfo, LASTINPUTINFO};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    GetForegroundWindow, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId,
};
use wt_core::{ProbeError, WindowSample};

use crate::UNKNOWN_APP;

const IMAGE_PATH_CAPACITY: usize = 1024;

#[allow(clippy::cast_possible_truncation)]
pub fn idle_duration() -> Result<Duration, ProbeError> {
    let mut info = LASTINPUTINFO {
        cbSize: std::mem::size_of::<LASTINPUTINFO>() as u32,
        dwTime: 0,
    };
    // SAFETY: `info` is a valid LASTINPUTINFO with cbSize set.
    let ok = unsafe { GetLastInputInfo(&mut info) };
    if ok == 0 {
        return Err(ProbeError::Command {
            command: "GetLastInputInfo",
            message: io::Error::last_os_error().to_string(),
        });
    }
    // SAFETY: no preconditions.
    let now = unsafe { GetTickCount() };
    // Both counters wrap after ~49.7 days.
    Ok(Duration::from_millis(u64::from(now.wrapping_sub(info.dwTime))))
}

pub fn active_window() -> Result<WindowSample, ProbeError> {
    // SAFETY: no preconditions.
    let hwnd = unsafe { GetForegroundWindow() };
    if hwnd.is_null() {
        return Err(ProbeError::Unavailable {
            probe: "GetForegroundWindow",
            reason: "no foreground window".to_string(),
        });
    }
    let sampled_at = Utc::now();
    let window_title = window_text(hwnd);

    let mut pid = 0_u32;
    // SAFETY: `hwnd` was just returned by GetForegroundWindow; `pid` is a valid out pointer.
    unsafe { GetWindowThreadProcessId(hwnd, &mut pid) };

    let process_path = process_image_path(pid).unwrap_or_default();
    let app_name = Path::new(&process_path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| UNKNOWN_APP.to_string());

    Ok(WindowSample {
        app_name,
        window_title,
        process_path,
        sampled_at,
    })
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
fn window_text(hwnd: HWND) -> String {
    // SAFETY: `hwnd` is a window handle; a stale handle yields 0.
    let len = unsafe { GetWindowTextLengthW(hwnd) };
    if len <= 0 {
        return String::new();
    }
    let mut buf = vec![0_u16; len as usize + 1];
    // SAFETY: `buf` holds `buf.len()` u16s, which is passed as the capacity.
    let copied = unsafe { GetWindowTextW(hwnd, buf.as_mut_ptr(), buf.len() as i32) };
    if copied <= 0 {
        return String::new();
    }
    String::from_utf16_lossy(&buf[..copied as usize])
}

#[allow(clippy::cast_possible_truncation)]
fn process_image_path(pid: u32) -> Option<String> {
    if pid == 0 {
        return None;
    }
    // SAFETY: OpenProcess has no pointer arguments; a null handle signals failure.
    let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid) };
    if handle.is_null() {
        tracing::debug!(pid, error = %io::Error::last_os_error(), "cannot open foreground process");
        return None;
    }

    let mut buf = [0_u16; IMAGE_PATH_CAPACITY];
    let mut size = IMAGE_PATH_CAPACITY as u32;
    // SAFETY: `handle` is open; `buf` has room for `size` u16s and `size` is a valid in/out pointer.
    let ok = unsafe { QueryFullProcessImageNameW(handle, PROCESS_NAME_WIN32, buf.as_mut_ptr(), &mut size) };
    // SAFETY: `handle` was opened above and is closed exactly once.
    unsafe { CloseHandle(handle) };

    (ok != 0).then(|| String::from_utf16_lossy(&buf[..size as usize]))
}
