/// End-to-end tests for `AppState`, the single-threaded coordinator.
///
/// Scanners are replaced by in-memory fakes so every refresh is
/// deterministic; the executor, delivery path and error bookkeeping are real.
use lapcare_app::state::{task_ids, MAX_ERRORS};
use lapcare_app::{AppState, Collaborators};
use lapcare_core::config::Config;
use lapcare_core::error::{ActionError, ScanError};
use lapcare_core::executor::CancelSignal;
use lapcare_core::model::{
    BatteryDetails, BatteryHealth, BatteryStatus, FileEntry, LargeFile, ProcessInfo, StartupItem,
};
use lapcare_core::platform::{Platform, PlatformPaths};
use lapcare_core::scanner::{FileInventory, LargeFileQuery, PowerInspector, ProcessInspector};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

// ── Helpers ───────────────────────────────────────────────────────────────────

const IDLE: Duration = Duration::from_secs(10);

/// Stale-days value that makes the fake large-file scan block until cancelled,
/// then return the one file it had found.
const BLOCKING_SCAN: u64 = 9_999;

fn write_bytes(path: &Path, n: usize) {
    let mut f = fs::File::create(path).unwrap();
    f.write_all(&vec![0u8; n]).unwrap();
}

fn entry(path: PathBuf, size: u64) -> FileEntry {
    FileEntry {
        path,
        size,
        last_access: None,
    }
}

fn process(pid: u32, name: &str, cpu: f32, memory_mb: u64) -> ProcessInfo {
    ProcessInfo {
        pid,
        name: name.into(),
        user: "alice".into(),
        status: "running".into(),
        cpu_percent: cpu,
        memory_bytes: memory_mb * 1024 * 1024,
        executable_path: None,
        is_system_protected: false,
    }
}

struct FakeFiles {
    temp: Vec<FileEntry>,
}

impl FileInventory for FakeFiles {
    fn temp_files(&self, _signal: &CancelSignal) -> Result<Vec<FileEntry>, ScanError> {
        Ok(self.temp.clone())
    }

    fn trash_items(&self, _signal: &CancelSignal) -> Result<Vec<FileEntry>, ScanError> {
        Ok(vec![entry(PathBuf::from("/trash/old.iso"), 4_096)])
    }

    fn large_unused_files(
        &self,
        query: &LargeFileQuery,
        signal: &CancelSignal,
    ) -> Result<Vec<LargeFile>, ScanError> {
        if query.stale_days == BLOCKING_SCAN {
            while !signal.is_cancelled() {
                thread::sleep(Duration::from_millis(2));
            }
            let now = SystemTime::now();
            return Ok(vec![LargeFile::new(PathBuf::from("/home/a/partial.iso"), 123, now, now)]);
        }
        let now = SystemTime::now();
        Ok(vec![LargeFile::new(PathBuf::from("/home/a/movie.mkv"), 900, now, now)])
    }
}

struct FakeProcesses;

impl ProcessInspector for FakeProcesses {
    fn processes(&self, limit: usize) -> Result<Vec<ProcessInfo>, ScanError> {
        let mut all = vec![
            process(10, "browser", 42.0, 900),
            process(11, "editor", 6.0, 120),
            process(12, "daemon", 0.1, 700),
            process(13, "shell", 0.0, 8),
        ];
        all.truncate(limit);
        Ok(all)
    }

    fn startup_items(&self) -> Result<Vec<StartupItem>, ScanError> {
        Ok(vec![StartupItem {
            name: "Syncer".to_string(),
            command: "syncer --tray".to_string(),
            enabled: true,
            location: "/home/a/.config/autostart".to_string(),
        }])
    }
}

struct BrokenProcesses;

impl ProcessInspector for BrokenProcesses {
    fn processes(&self, _limit: usize) -> Result<Vec<ProcessInfo>, ScanError> {
        Err(ScanError::Command {
            program: "ps".to_string(),
            message: "not installed".to_string(),
        })
    }

    fn startup_items(&self) -> Result<Vec<StartupItem>, ScanError> {
        Err(ScanError::Unsupported("startup items"))
    }
}

struct FakePower {
    percent: f32,
}

impl PowerInspector for FakePower {
    fn status(&self) -> Result<BatteryStatus, ScanError> {
        Ok(BatteryStatus {
            available: true,
            percent: self.percent,
            plugged_in: false,
            seconds_remaining: Some(5_400),
            details: BatteryDetails::default(),
        })
    }

    fn health(&self) -> Result<BatteryHealth, ScanError> {
        Ok(BatteryHealth {
            design_capacity: Some(50_000),
            current_capacity: Some(40_000),
            cycle_count: Some(312),
        })
    }
}

fn paths_under(root: &Path, platform: Platform) -> PlatformPaths {
    PlatformPaths {
        platform,
        temp_dir: root.join("tmp"),
        trash_dir: Some(root.join("Trash")),
        home_dir: Some(root.join("home")),
    }
}

fn state_with(root: &Path, processes: Arc<dyn ProcessInspector>, temp: Vec<FileEntry>) -> AppState {
    let collaborators = Collaborators {
        files: Arc::new(FakeFiles { temp }),
        processes,
        power: Arc::new(FakePower { percent: 15.0 }),
    };
    AppState::with_collaborators(
        Config::default(),
        paths_under(root, Platform::Linux),
        collaborators,
    )
}

fn idle(state: &mut AppState) {
    assert!(state.wait_until_idle(IDLE), "tasks did not finish within {IDLE:?}");
}

// ── Refresh lifecycle ─────────────────────────────────────────────────────────

/// A fresh coordinator has nothing running and empty lists.
#[test]
fn new_state_is_empty() {
    let tmp = TempDir::new().unwrap();
    let state = state_with(tmp.path(), Arc::new(FakeProcesses), Vec::new());
    assert!(state.running_tasks().is_empty());
    assert!(state.processes.is_empty());
    assert!(state.battery_status.is_none());
    assert_eq!(state.status, "Ready");
}

/// `refresh_all` fills every list and derives power statistics.
#[test]
fn refresh_all_populates_every_view() {
    let tmp = TempDir::new().unwrap();
    let temp = vec![entry(tmp.path().join("a.tmp"), 10)];
    let mut state = state_with(tmp.path(), Arc::new(FakeProcesses), temp);

    state.refresh_all();
    assert!(!state.pending_tasks().is_empty());
    idle(&mut state);

    assert_eq!(state.temp_files.len(), 1);
    assert_eq!(state.trash_items.len(), 1);
    assert_eq!(state.processes.len(), 4);
    assert_eq!(state.startup_items.len(), 1);
    assert_eq!(state.battery_health.as_ref().unwrap().health_percent(), Some(80.0));
    assert!(state.large_files.is_empty(), "large-file scan is user-initiated");
    assert!(state.errors.is_empty());

    let usage = state.power_usage.as_ref().unwrap();
    assert!(usage.available);
    assert_eq!(usage.estimated_hours_remaining, 1.5);
    assert_eq!(usage.discharge_rate_percent_per_hour, 10.0);
    assert_eq!(state.recommendations[0].title, "Critical Battery Level");
}

/// The process listing honours the configured cap.
#[test]
fn process_listing_is_capped() {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.processes.max_listed = 2;
    let mut state = AppState::with_collaborators(
        config,
        paths_under(tmp.path(), Platform::Linux),
        Collaborators {
            files: Arc::new(FakeFiles { temp: Vec::new() }),
            processes: Arc::new(FakeProcesses),
            power: Arc::new(FakePower { percent: 80.0 }),
        },
    );

    state.refresh_processes();
    idle(&mut state);
    let pids: Vec<u32> = state.processes.iter().map(|p| p.pid).collect();
    assert_eq!(pids, vec![10, 11]);
}

/// High-resource filtering uses the CPU and memory thresholds from config.
#[test]
fn high_resource_uses_thresholds() {
    let tmp = TempDir::new().unwrap();
    let mut state = state_with(tmp.path(), Arc::new(FakeProcesses), Vec::new());

    state.refresh_high_resource();
    idle(&mut state);

    let mut pids: Vec<u32> = state.high_resource.iter().map(|p| p.pid).collect();
    pids.sort_unstable();
    // browser: CPU and memory, editor: CPU, daemon: memory. shell: neither.
    assert_eq!(pids, vec![10, 11, 12]);
}

// ── Failures ──────────────────────────────────────────────────────────────────

/// A failing scanner is recorded against its task id; other views still load.
#[test]
fn failures_are_recorded_per_task() {
    let tmp = TempDir::new().unwrap();
    let mut state = state_with(tmp.path(), Arc::new(BrokenProcesses), Vec::new());

    state.refresh_all();
    idle(&mut state);

    let sources: Vec<&str> = state.errors.iter().map(|(s, _)| s.as_str()).collect();
    assert!(sources.contains(&task_ids::PROCESSES));
    assert!(sources.contains(&task_ids::HIGH_RESOURCE));
    assert!(sources.contains(&task_ids::STARTUP_ITEMS));
    assert_eq!(state.error_count, 3);
    assert!(state.processes.is_empty());
    assert!(state.battery_status.is_some());

    let (_, message) = state
        .errors
        .iter()
        .find(|(s, _)| s == task_ids::PROCESSES)
        .unwrap();
    assert!(message.contains("not installed"), "got: {message}");
}

/// The error list stops growing at `MAX_ERRORS`; the counter keeps going.
#[test]
fn error_list_is_capped() {
    let tmp = TempDir::new().unwrap();
    let mut state = state_with(tmp.path(), Arc::new(BrokenProcesses), Vec::new());

    for _ in 0..(MAX_ERRORS + 5) {
        state.refresh_startup_items();
        idle(&mut state);
    }

    assert_eq!(state.errors.len(), MAX_ERRORS);
    assert_eq!(state.error_count, (MAX_ERRORS + 5) as u64);
}

// ── Large-file scan ───────────────────────────────────────────────────────────

/// A cancelled scan shows the files found before it stopped.
#[test]
fn cancelled_large_file_scan_keeps_partial_result() {
    let tmp = TempDir::new().unwrap();
    let mut state = state_with(tmp.path(), Arc::new(FakeProcesses), Vec::new());

    state.start_large_file_scan(Some(LargeFileQuery {
        roots: vec![tmp.path().to_path_buf()],
        min_size_bytes: 1,
        stale_days: BLOCKING_SCAN,
        max_results: 10,
    }));
    thread::sleep(Duration::from_millis(20));
    assert!(state.is_large_file_scan_running());

    assert!(state.cancel_large_file_scan());
    assert!(!state.is_large_file_scan_running());
    assert!(!state.cancel_large_file_scan(), "second cancel is a no-op");

    assert!(state.process_messages());
    assert_eq!(state.large_files.len(), 1);
    assert_eq!(state.large_files[0].size, 123);
    assert_eq!(state.status, "Scan cancelled. Found 1 large unused files so far");
    assert!(state.pending_tasks().is_empty());

    // A later full scan reports normally again.
    state.start_large_file_scan(None);
    idle(&mut state);
    assert_eq!(state.large_files[0].size, 900);
    assert_eq!(state.status, "Found 1 large unused files");
}

/// Restarting the scan supersedes the running one; only the new result lands.
#[test]
fn restarted_scan_supersedes_running_one() {
    let tmp = TempDir::new().unwrap();
    let mut state = state_with(tmp.path(), Arc::new(FakeProcesses), Vec::new());

    state.start_large_file_scan(Some(LargeFileQuery {
        roots: vec![tmp.path().to_path_buf()],
        min_size_bytes: 1,
        stale_days: BLOCKING_SCAN,
        max_results: 10,
    }));
    thread::sleep(Duration::from_millis(20));

    let start = Instant::now();
    state.start_large_file_scan(None);
    assert!(start.elapsed() < Duration::from_secs(2));
    idle(&mut state);

    assert_eq!(state.large_files.len(), 1);
    assert_eq!(state.large_files[0].size, 900, "superseded partial result must not land");
}

// ── Actions ───────────────────────────────────────────────────────────────────

/// Deleting files removes them from disk and from the temp list.
#[test]
fn delete_files_updates_lists() {
    let tmp = TempDir::new().unwrap();
    let keep = tmp.path().join("keep.tmp");
    let drop = tmp.path().join("drop.tmp");
    write_bytes(&keep, 4);
    write_bytes(&drop, 4);

    let temp = vec![entry(keep.clone(), 4), entry(drop.clone(), 4)];
    let mut state = state_with(tmp.path(), Arc::new(FakeProcesses), temp);
    state.refresh_temp_files();
    idle(&mut state);
    assert_eq!(state.temp_files.len(), 2);

    let report = state.delete_files(&[drop.clone()], false);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.failed, 0);
    assert!(!drop.exists());
    assert!(keep.exists());
    assert_eq!(state.temp_files.len(), 1);
    assert_eq!(state.temp_files[0].path, keep);
}

/// A simulated delete touches neither disk nor state.
#[test]
fn simulated_delete_changes_nothing() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("a.tmp");
    write_bytes(&file, 4);

    let mut state = state_with(tmp.path(), Arc::new(FakeProcesses), vec![entry(file.clone(), 4)]);
    state.refresh_temp_files();
    idle(&mut state);

    let report = state.delete_files(&[file.clone()], true);
    assert_eq!(report.deleted, 1);
    assert!(file.exists());
    assert_eq!(state.temp_files.len(), 1);
    assert!(state.status.starts_with("Would delete"));
}

/// Emptying the trash clears the trash list.
#[test]
fn empty_trash_clears_list() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("Trash/files")).unwrap();
    write_bytes(&tmp.path().join("Trash/files/old.iso"), 16);

    let mut state = state_with(tmp.path(), Arc::new(FakeProcesses), Vec::new());
    state.refresh_trash();
    idle(&mut state);
    assert_eq!(state.trash_items.len(), 1);

    assert_eq!(state.empty_trash(false).unwrap(), 1);
    assert!(state.trash_items.is_empty());
}

/// Terminating a pid that does not exist fails and is recorded.
#[cfg(target_os = "linux")]
#[test]
fn terminate_missing_process_is_recorded() {
    let tmp = TempDir::new().unwrap();
    let mut state = state_with(tmp.path(), Arc::new(FakeProcesses), Vec::new());

    let err = state.terminate_process(4_194_305, false).unwrap_err();
    assert!(matches!(err, ActionError::NotFound(_)), "got: {err:?}");
    assert_eq!(state.error_count, 1);
}

/// Disabling startup items on an unsupported platform reports it.
#[test]
fn disable_startup_unsupported_platform() {
    let tmp = TempDir::new().unwrap();
    let mut state = AppState::with_collaborators(
        Config::default(),
        paths_under(tmp.path(), Platform::Unknown),
        Collaborators {
            files: Arc::new(FakeFiles { temp: Vec::new() }),
            processes: Arc::new(FakeProcesses),
            power: Arc::new(FakePower { percent: 50.0 }),
        },
    );
    state.refresh_startup_items();
    idle(&mut state);

    let err = state
        .disable_startup_item("Syncer", "/home/a/.config/autostart")
        .unwrap_err();
    assert!(matches!(err, ActionError::Unsupported(_)));
    assert!(state.startup_items[0].enabled);
}

/// Shutdown leaves nothing running.
#[test]
fn shutdown_cancels_everything() {
    let tmp = TempDir::new().unwrap();
    let mut state = state_with(tmp.path(), Arc::new(FakeProcesses), Vec::new());
    state.start_large_file_scan(Some(LargeFileQuery {
        roots: vec![tmp.path().to_path_buf()],
        min_size_bytes: 1,
        stale_days: BLOCKING_SCAN,
        max_results: 10,
    }));
    state.shutdown();
    assert!(state.running_tasks().is_empty());
    assert!(state.wait_until_idle(IDLE));
    assert!(state.pending_tasks().is_empty());
}
