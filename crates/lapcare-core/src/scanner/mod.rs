/// Scanner collaborators: the slow, blocking functions the executor runs on
/// worker threads.
///
/// Each concern sits behind a trait so coordinators can be driven by fakes in
/// tests:
/// - [`FileInventory`]: temp files, trash items, large/unused files.
/// - [`ProcessInspector`]: running processes and startup entries.
/// - [`PowerInspector`]: battery status and health.
///
/// Every method is synchronous and may block for seconds. Long enumerations
/// take a [`CancelSignal`] and return their partial result as `Ok` when it is
/// set.
pub mod battery;
pub mod files;
pub mod large_files;
pub mod processes;
pub mod startup;

pub use large_files::LargeFileQuery;

use crate::error::ScanError;
use crate::executor::CancelSignal;
use crate::model::{BatteryHealth, BatteryStatus, FileEntry, LargeFile, ProcessInfo, StartupItem};
use crate::platform::{Platform, PlatformPaths};
use battery::Sysfs;
use tracing::info;

pub trait FileInventory: Send + Sync {
    fn temp_files(&self, signal: &CancelSignal) -> Result<Vec<FileEntry>, ScanError>;

    fn trash_items(&self, signal: &CancelSignal) -> Result<Vec<FileEntry>, ScanError>;

    fn large_unused_files(
        &self,
        query: &LargeFileQuery,
        signal: &CancelSignal,
    ) -> Result<Vec<LargeFile>, ScanError>;
}

pub trait ProcessInspector: Send + Sync {
    /// Running processes by CPU descending, at most `limit` of them.
    fn processes(&self, limit: usize) -> Result<Vec<ProcessInfo>, ScanError>;

    fn startup_items(&self) -> Result<Vec<StartupItem>, ScanError>;
}

pub trait PowerInspector: Send + Sync {
    fn status(&self) -> Result<BatteryStatus, ScanError>;

    fn health(&self) -> Result<BatteryHealth, ScanError>;
}

/// Filesystem-backed [`FileInventory`].
#[derive(Debug, Clone)]
pub struct SystemFiles {
    paths: PlatformPaths,
}

impl SystemFiles {
    pub fn new(paths: PlatformPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &PlatformPaths {
        &self.paths
    }
}

impl FileInventory for SystemFiles {
    fn temp_files(&self, signal: &CancelSignal) -> Result<Vec<FileEntry>, ScanError> {
        let files = files::list_files(&self.paths.temp_dir, signal)?;
        info!("Found {} temp files in {}", files.len(), self.paths.temp_dir.display());
        Ok(files)
    }

    fn trash_items(&self, signal: &CancelSignal) -> Result<Vec<FileEntry>, ScanError> {
        let dir = self
            .paths
            .trash_files_dir()
            .ok_or(ScanError::Unsupported("trash location"))?;
        let files = files::list_files(&dir, signal)?;
        info!("Found {} trash items in {}", files.len(), dir.display());
        Ok(files)
    }

    fn large_unused_files(
        &self,
        query: &LargeFileQuery,
        signal: &CancelSignal,
    ) -> Result<Vec<LargeFile>, ScanError> {
        large_files::find_large_unused_files(query, &self.paths.skip_rules(), signal)
    }
}

/// Command/procfs-backed [`ProcessInspector`].
#[derive(Debug, Clone)]
pub struct SystemProcesses {
    paths: PlatformPaths,
}

impl SystemProcesses {
    pub fn new(paths: PlatformPaths) -> Self {
        Self { paths }
    }
}

impl ProcessInspector for SystemProcesses {
    fn processes(&self, limit: usize) -> Result<Vec<ProcessInfo>, ScanError> {
        processes::list_processes(self.paths.platform, limit)
    }

    fn startup_items(&self) -> Result<Vec<StartupItem>, ScanError> {
        match self.paths.platform {
            Platform::Linux => Ok(startup::list_desktop_entries(&self.paths.autostart_dirs())),
            Platform::Windows => startup::list_windows_startup_items(),
            Platform::MacOs | Platform::Unknown => Err(ScanError::Unsupported("startup items")),
        }
    }
}

/// Platform telemetry-backed [`PowerInspector`].
#[derive(Debug, Clone)]
pub struct SystemPower {
    platform: Platform,
    sysfs: Sysfs,
}

impl SystemPower {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            sysfs: Sysfs::default(),
        }
    }

    /// Read Linux telemetry from a different `power_supply` directory.
    pub fn with_sysfs(mut self, sysfs: Sysfs) -> Self {
        self.sysfs = sysfs;
        self
    }
}

impl PowerInspector for SystemPower {
    fn status(&self) -> Result<BatteryStatus, ScanError> {
        match self.platform {
            Platform::Linux => Ok(self.sysfs.status()),
            Platform::MacOs => battery::macos_status(),
            Platform::Windows => battery::windows_status(),
            Platform::Unknown => Ok(BatteryStatus::unavailable()),
        }
    }

    fn health(&self) -> Result<BatteryHealth, ScanError> {
        match self.platform {
            Platform::Linux => Ok(self.sysfs.health()),
            Platform::Windows => battery::windows_health(),
            Platform::MacOs | Platform::Unknown => Ok(BatteryHealth::default()),
        }
    }
}
