/// Application state management.
///
/// Centralises all consumer state: the inventories, process and startup
/// lists, battery readings, and recent errors. Scanner work runs on executor
/// workers; results are applied in `process_messages()`, which a frontend
/// calls once per frame and a headless sweep calls via `wait_until_idle()`.
use lapcare_core::actions::{self, DeleteReport};
use lapcare_core::analysis::{power_usage, recommendations};
use lapcare_core::config::Config;
use lapcare_core::error::{ActionError, ExecutorError, ScanError};
use lapcare_core::executor::{CancelSignal, Delivered, TaskExecutor, TaskFn, TaskResult};
use lapcare_core::model::{
    BatteryHealth, BatteryStatus, FileEntry, LargeFile, PowerUsage, ProcessInfo, Recommendation,
    StartupItem,
};
use lapcare_core::platform::{self, PlatformPaths};
use lapcare_core::scanner::processes::filter_high_resource;
use lapcare_core::scanner::{
    FileInventory, LargeFileQuery, PowerInspector, ProcessInspector, SystemFiles, SystemPower,
    SystemProcesses,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Task ids used with the executor. One live task per id.
pub mod task_ids {
    pub const TEMP_FILES: &str = "temp_files";
    pub const TRASH_ITEMS: &str = "trash_items";
    pub const LARGE_FILES: &str = "large_files";
    pub const PROCESSES: &str = "processes";
    pub const HIGH_RESOURCE: &str = "high_resource";
    pub const STARTUP_ITEMS: &str = "startup_items";
    pub const BATTERY_STATUS: &str = "battery_status";
    pub const BATTERY_HEALTH: &str = "battery_health";
}

/// Maximum number of task errors kept for display.
pub const MAX_ERRORS: usize = 1_000;

/// Output of any background task the coordinator runs.
#[derive(Debug, Clone)]
pub enum Report {
    TempFiles(Vec<FileEntry>),
    TrashItems(Vec<FileEntry>),
    LargeFiles(Vec<LargeFile>),
    Processes(Vec<ProcessInfo>),
    HighResource(Vec<ProcessInfo>),
    StartupItems(Vec<StartupItem>),
    BatteryStatus(BatteryStatus),
    BatteryHealth(BatteryHealth),
}

/// The scanner implementations the coordinator delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub files: Arc<dyn FileInventory>,
    pub processes: Arc<dyn ProcessInspector>,
    pub power: Arc<dyn PowerInspector>,
}

impl Collaborators {
    /// The real, OS-backed scanners.
    pub fn system(paths: &PlatformPaths) -> Self {
        Self {
            files: Arc::new(SystemFiles::new(paths.clone())),
            processes: Arc::new(SystemProcesses::new(paths.clone())),
            power: Arc::new(SystemPower::new(paths.platform)),
        }
    }
}

/// All coordinator state.
pub struct AppState {
    executor: TaskExecutor<Report>,
    collaborators: Collaborators,
    config: Config,
    paths: PlatformPaths,

    // ── File cleanup ───────────────────────────────────
    pub temp_files: Vec<FileEntry>,
    pub trash_items: Vec<FileEntry>,
    pub large_files: Vec<LargeFile>,
    /// Set by `cancel_large_file_scan`; the next large-file delivery is partial.
    large_scan_cancelled: bool,

    // ── Processes ──────────────────────────────────────
    pub processes: Vec<ProcessInfo>,
    pub high_resource: Vec<ProcessInfo>,
    pub startup_items: Vec<StartupItem>,

    // ── Power ──────────────────────────────────────────
    pub battery_status: Option<BatteryStatus>,
    pub battery_health: Option<BatteryHealth>,
    pub power_usage: Option<PowerUsage>,
    pub recommendations: Vec<Recommendation>,

    // ── Status ─────────────────────────────────────────
    /// `(source, message)` pairs, oldest first, capped at [`MAX_ERRORS`].
    pub errors: Vec<(String, String)>,
    /// Total failures seen, including those beyond the cap.
    pub error_count: u64,
    pub status: String,
    pub is_elevated: bool,
}

impl AppState {
    /// Coordinator backed by the real platform scanners.
    pub fn new(config: Config) -> Self {
        let paths = PlatformPaths::detect();
        let collaborators = Collaborators::system(&paths);
        Self::with_collaborators(config, paths, collaborators)
    }

    pub fn with_collaborators(
        config: Config,
        paths: PlatformPaths,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            executor: TaskExecutor::with_config(&config.executor),
            collaborators,
            config,
            paths,
            temp_files: Vec::new(),
            trash_items: Vec::new(),
            large_files: Vec::new(),
            large_scan_cancelled: false,
            processes: Vec::new(),
            high_resource: Vec::new(),
            startup_items: Vec::new(),
            battery_status: None,
            battery_health: None,
            power_usage: None,
            recommendations: Vec::new(),
            errors: Vec::new(),
            error_count: 0,
            status: "Ready".to_string(),
            is_elevated: platform::is_elevated(),
        }
    }

    pub fn paths(&self) -> &PlatformPaths {
        &self.paths
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ── Refreshes ──────────────────────────────────────

    pub fn refresh_temp_files(&mut self) {
        let files = Arc::clone(&self.collaborators.files);
        self.start(
            task_ids::TEMP_FILES,
            TaskFn::cancellable(move |signal: &CancelSignal| {
                files.temp_files(signal).map(Report::TempFiles)
            }),
            "Scanning temporary files...",
        );
    }

    pub fn refresh_trash(&mut self) {
        let files = Arc::clone(&self.collaborators.files);
        self.start(
            task_ids::TRASH_ITEMS,
            TaskFn::cancellable(move |signal: &CancelSignal| {
                files.trash_items(signal).map(Report::TrashItems)
            }),
            "Scanning trash...",
        );
    }

    /// Start a large/unused scan. `None` uses the configured roots and
    /// thresholds (home directory when no roots are configured).
    pub fn start_large_file_scan(&mut self, query: Option<LargeFileQuery>) {
        let query = query.unwrap_or_else(|| {
            LargeFileQuery::from_config(&self.config.large_files, self.paths.home_dir.as_deref())
        });
        info!(roots = ?query.roots, max_results = query.max_results, "Starting large-file scan");
        self.large_scan_cancelled = false;
        let files = Arc::clone(&self.collaborators.files);
        self.start(
            task_ids::LARGE_FILES,
            TaskFn::cancellable(move |signal: &CancelSignal| {
                files
                    .large_unused_files(&query, signal)
                    .map(Report::LargeFiles)
            }),
            "Searching for large unused files...",
        );
    }

    /// Stop the running scan. Files found so far arrive with the next
    /// `process_messages`. Returns `true` if a scan was running.
    pub fn cancel_large_file_scan(&mut self) -> bool {
        let cancelled = self.executor.cancel(task_ids::LARGE_FILES);
        if cancelled {
            self.large_scan_cancelled = true;
            self.status = "Cancelling large-file scan...".to_string();
        }
        cancelled
    }

    pub fn is_large_file_scan_running(&self) -> bool {
        self.executor.is_running(task_ids::LARGE_FILES)
    }

    pub fn refresh_processes(&mut self) {
        let inspector = Arc::clone(&self.collaborators.processes);
        let limit = self.config.processes.max_listed;
        self.start(
            task_ids::PROCESSES,
            TaskFn::plain(move || inspector.processes(limit).map(Report::Processes)),
            "Loading processes...",
        );
    }

    pub fn refresh_high_resource(&mut self) {
        let inspector = Arc::clone(&self.collaborators.processes);
        let limits = self.config.processes.clone();
        self.start(
            task_ids::HIGH_RESOURCE,
            TaskFn::plain(move || {
                let all = inspector.processes(usize::MAX)?;
                Ok::<_, ScanError>(Report::HighResource(filter_high_resource(
                    &all,
                    limits.cpu_threshold,
                    limits.memory_threshold_mb,
                    limits.max_high_resource,
                )))
            }),
            "Finding high-resource processes...",
        );
    }

    pub fn refresh_startup_items(&mut self) {
        let inspector = Arc::clone(&self.collaborators.processes);
        self.start(
            task_ids::STARTUP_ITEMS,
            TaskFn::plain(move || inspector.startup_items().map(Report::StartupItems)),
            "Loading startup items...",
        );
    }

    pub fn refresh_battery(&mut self) {
        let power = Arc::clone(&self.collaborators.power);
        self.start(
            task_ids::BATTERY_STATUS,
            TaskFn::plain(move || power.status().map(Report::BatteryStatus)),
            "Reading battery status...",
        );
        let power = Arc::clone(&self.collaborators.power);
        self.start(
            task_ids::BATTERY_HEALTH,
            TaskFn::plain(move || power.health().map(Report::BatteryHealth)),
            "Reading battery health...",
        );
    }

    /// Everything except the large-file scan, which is user-initiated.
    pub fn refresh_all(&mut self) {
        self.refresh_temp_files();
        self.refresh_trash();
        self.refresh_processes();
        self.refresh_high_resource();
        self.refresh_startup_items();
        self.refresh_battery();
    }

    fn start(&mut self, task_id: &str, task: TaskFn<Report>, status: &str) {
        match self.executor.submit(task_id, task, None) {
            Ok(()) => self.status = status.to_string(),
            Err(ExecutorError::Spawn { source, .. }) => {
                self.record_error(task_id, &format!("could not start: {source}"));
            }
        }
    }

    // ── Delivery ───────────────────────────────────────

    /// Apply every finished task's result. Called once per frame.
    ///
    /// Returns `true` if any state changed.
    pub fn process_messages(&mut self) -> bool {
        let delivered = self.executor.process_completions();
        let changed = !delivered.is_empty();
        for d in delivered {
            self.apply(d);
        }
        changed
    }

    /// Block until every running task has been delivered or `timeout`
    /// elapses. Returns `true` when idle.
    pub fn wait_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.process_messages();
        while self.executor.has_pending() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            for d in self.executor.wait_for_completions(remaining) {
                self.apply(d);
            }
        }
        true
    }

    /// Ids of tasks whose worker is still executing.
    pub fn running_tasks(&self) -> Vec<String> {
        self.executor.running_tasks()
    }

    /// Ids of tasks whose result has not been applied yet.
    pub fn pending_tasks(&self) -> Vec<String> {
        self.executor.pending_tasks()
    }

    /// Cancel everything still running.
    pub fn shutdown(&mut self) {
        self.executor.shutdown();
    }

    fn apply(&mut self, delivered: Delivered<Report>) {
        let report = match &*delivered.result {
            TaskResult::Success(report) => report,
            TaskResult::Failure(message) => {
                self.record_error(&delivered.task_id, message);
                return;
            }
        };

        match report {
            Report::TempFiles(files) => {
                self.status = format!("Found {} temporary files", files.len());
                self.temp_files = files.clone();
            }
            Report::TrashItems(items) => {
                self.status = format!("Found {} items in trash", items.len());
                self.trash_items = items.clone();
            }
            Report::LargeFiles(files) => {
                self.status = if std::mem::take(&mut self.large_scan_cancelled) {
                    format!("Scan cancelled. Found {} large unused files so far", files.len())
                } else {
                    format!("Found {} large unused files", files.len())
                };
                self.large_files = files.clone();
            }
            Report::Processes(list) => {
                self.status = format!("Loaded {} processes", list.len());
                self.processes = list.clone();
            }
            Report::HighResource(list) => {
                self.status = format!("Found {} high-resource processes", list.len());
                self.high_resource = list.clone();
            }
            Report::StartupItems(items) => {
                self.status = format!("Loaded {} startup items", items.len());
                self.startup_items = items.clone();
            }
            Report::BatteryStatus(status) => {
                self.power_usage = Some(power_usage(status));
                self.recommendations = recommendations(status, self.paths.platform);
                self.battery_status = Some(status.clone());
            }
            Report::BatteryHealth(health) => {
                self.battery_health = Some(health.clone());
            }
        }
    }

    fn record_error(&mut self, source: &str, message: &str) {
        warn!(task = %source, error = %message, "Recording failure");
        self.error_count += 1;
        if self.errors.len() < MAX_ERRORS {
            self.errors.push((source.to_string(), message.to_string()));
        }
        self.status = format!("Error in {source}: {message}");
    }

    // ── Actions ────────────────────────────────────────

    /// Delete files and drop the removed ones from every file list.
    pub fn delete_files(&mut self, paths: &[PathBuf], simulate: bool) -> DeleteReport {
        let report = actions::delete_files(paths, simulate, &self.paths);
        for error in &report.errors {
            self.record_error("delete", error);
        }

        if !simulate {
            let removed: Vec<&PathBuf> = paths
                .iter()
                .filter(|p| std::fs::symlink_metadata(p).is_err())
                .collect();
            self.temp_files.retain(|f| !removed.contains(&&f.path));
            self.trash_items.retain(|f| !removed.contains(&&f.path));
            self.large_files.retain(|f| !removed.contains(&&f.path));
        }

        let verb = if simulate { "Would delete" } else { "Deleted" };
        self.status = format!("{verb} {} files ({} failed)", report.deleted, report.failed);
        report
    }

    pub fn empty_trash(&mut self, simulate: bool) -> Result<usize, ActionError> {
        match actions::empty_trash(&self.paths, simulate) {
            Ok(removed) => {
                if !simulate {
                    self.trash_items.clear();
                }
                self.status = format!("Trash emptied ({removed} entries)");
                Ok(removed)
            }
            Err(err) => {
                self.record_error("empty_trash", &err.to_string());
                Err(err)
            }
        }
    }

    pub fn terminate_process(&mut self, pid: u32, force: bool) -> Result<(), ActionError> {
        match actions::terminate_process(pid, force, self.paths.platform) {
            Ok(()) => {
                self.processes.retain(|p| p.pid != pid);
                self.high_resource.retain(|p| p.pid != pid);
                self.status = format!("Terminated process {pid}");
                Ok(())
            }
            Err(err) => {
                self.record_error("terminate", &err.to_string());
                Err(err)
            }
        }
    }

    pub fn disable_startup_item(&mut self, name: &str, location: &str) -> Result<(), ActionError> {
        match actions::disable_startup_item(name, location, self.paths.platform) {
            Ok(()) => {
                for item in self
                    .startup_items
                    .iter_mut()
                    .filter(|i| i.name == name && i.location == location)
                {
                    item.enabled = false;
                }
                self.status = format!("Disabled startup item '{name}'");
                Ok(())
            }
            Err(err) => {
                self.record_error("disable_startup", &err.to_string());
                Err(err)
            }
        }
    }
}
