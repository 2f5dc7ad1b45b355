/// Process and startup-entry records.
use super::size::format_size;
use compact_str::CompactString;
use std::path::PathBuf;

/// One running process as reported by the process inspector.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessInfo {
    pub pid: u32,
    /// Executable base name (e.g. `firefox`, `svchost.exe`).
    pub name: CompactString,
    /// Owning user, or `"Unknown"`.
    pub user: CompactString,
    /// Scheduler state (`running`, `sleeping`, …), or `"Unknown"`.
    pub status: CompactString,
    /// CPU usage in percent of one core. Zero where the platform does not report it.
    pub cpu_percent: f32,
    /// Resident memory in bytes.
    pub memory_bytes: u64,
    /// Resolved executable path. Never populated for protected processes.
    pub executable_path: Option<PathBuf>,
    /// `true` for kernel/session processes that must never be terminated.
    pub is_system_protected: bool,
}

impl ProcessInfo {
    pub fn memory_display(&self) -> String {
        format_size(self.memory_bytes)
    }

    pub fn memory_mb(&self) -> f64 {
        self.memory_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// An application configured to launch at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupItem {
    pub name: String,
    pub command: String,
    pub enabled: bool,
    /// Where the entry lives: an autostart directory on Linux, a registry
    /// location string on Windows.
    pub location: String,
}
