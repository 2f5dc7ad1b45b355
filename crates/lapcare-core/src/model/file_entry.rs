/// File records returned by the temp, trash, and large-file scanners.
use super::size::format_size;
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// A single file found in a temp or trash directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Full path to the file.
    pub path: PathBuf,
    /// Logical size in bytes.
    pub size: u64,
    /// Last access time, if the filesystem reports one.
    pub last_access: Option<SystemTime>,
}

impl FileEntry {
    pub fn size_display(&self) -> String {
        format_size(self.size)
    }

    /// Local-time rendering of `last_access`, or `"Unknown"`.
    pub fn last_access_display(&self) -> String {
        self.last_access
            .map(format_timestamp)
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// A file that is both large and has not been accessed recently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LargeFile {
    pub path: PathBuf,
    pub size: u64,
    pub last_access: SystemTime,
    /// Whole days between `last_access` and the moment the file was examined.
    pub days_unused: u64,
}

impl LargeFile {
    pub fn new(path: PathBuf, size: u64, last_access: SystemTime, now: SystemTime) -> Self {
        let days_unused = now
            .duration_since(last_access)
            .unwrap_or(Duration::ZERO)
            .as_secs()
            / SECS_PER_DAY;
        Self {
            path,
            size,
            last_access,
            days_unused,
        }
    }

    pub fn size_display(&self) -> String {
        format_size(self.size)
    }

    pub fn last_access_display(&self) -> String {
        format_timestamp(self.last_access)
    }
}

fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
