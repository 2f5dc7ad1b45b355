/// Process enumeration and the protected-process policy.
///
/// Unix systems are read through `ps`, Windows through `tasklist` in CSV
/// mode. Parsing is kept separate from command execution so it can be tested
/// against captured output.
use crate::command;
use crate::error::ScanError;
use crate::model::ProcessInfo;
use crate::platform::Platform;
use compact_str::CompactString;
use std::path::PathBuf;
use tracing::{debug, trace};

/// PIDs at or below this are kernel/idle processes on every platform.
pub const MAX_RESERVED_PID: u32 = 4;

const WINDOWS_PROTECTED: [&str; 13] = [
    "System",
    "smss.exe",
    "csrss.exe",
    "wininit.exe",
    "services.exe",
    "lsass.exe",
    "winlogon.exe",
    "explorer.exe",
    "svchost.exe",
    "spoolsv.exe",
    "dwm.exe",
    "taskmgr.exe",
    "taskhost.exe",
];

/// Matched as case-insensitive prefixes (`kworker/0:1`, `rcu_sched`, …).
const UNIX_PROTECTED_PREFIXES: [&str; 18] = [
    "systemd",
    "init",
    "kthreadd",
    "kworker",
    "ksoftirqd",
    "watchdog",
    "migration",
    "rcu_",
    "kipmi",
    "sshd",
    "login",
    "bash",
    "sh",
    "Xorg",
    "x11",
    "gdm",
    "lightdm",
    "sddm",
];

const PS_ARGS: [&str; 2] = ["-axo", "pid=,user=,stat=,pcpu=,rss=,comm="];

/// Whether a process must never be terminated.
pub fn is_protected(pid: u32, name: &str, platform: Platform) -> bool {
    if pid <= MAX_RESERVED_PID {
        return true;
    }
    match platform {
        Platform::Windows => WINDOWS_PROTECTED
            .iter()
            .any(|p| p.eq_ignore_ascii_case(name)),
        Platform::Linux | Platform::MacOs => {
            let lower = name.to_lowercase();
            UNIX_PROTECTED_PREFIXES
                .iter()
                .any(|p| lower.starts_with(&p.to_lowercase()))
        }
        Platform::Unknown => false,
    }
}

/// Enumerate running processes, sorted by CPU usage (descending) and capped
/// at `limit`.
pub fn list_processes(platform: Platform, limit: usize) -> Result<Vec<ProcessInfo>, ScanError> {
    let mut processes = match platform {
        Platform::Windows => {
            let out = command::run("tasklist", &["/FO", "CSV", "/NH", "/V"])?;
            parse_tasklist_csv(&out)?
        }
        Platform::Linux | Platform::MacOs => {
            let out = command::run("ps", &PS_ARGS)?;
            out.lines().filter_map(parse_ps_line).collect()
        }
        Platform::Unknown => return Err(ScanError::Unsupported("process listing")),
    };

    for process in &mut processes {
        process.is_system_protected = is_protected(process.pid, &process.name, platform);
        if process.is_system_protected {
            process.executable_path = None;
        } else if platform == Platform::Linux {
            process.executable_path = std::fs::read_link(format!("/proc/{}/exe", process.pid)).ok();
        }
    }

    sort_by_cpu(&mut processes);
    debug!("Listed {} processes (cap {limit})", processes.len());
    processes.truncate(limit);
    Ok(processes)
}

/// Processes at or above either threshold, by CPU descending, capped at `cap`.
pub fn filter_high_resource(
    processes: &[ProcessInfo],
    cpu_threshold: f32,
    memory_threshold_mb: f64,
    cap: usize,
) -> Vec<ProcessInfo> {
    let mut heavy: Vec<ProcessInfo> = processes
        .iter()
        .filter(|p| p.cpu_percent >= cpu_threshold || p.memory_mb() >= memory_threshold_mb)
        .cloned()
        .collect();
    sort_by_cpu(&mut heavy);
    heavy.truncate(cap);
    heavy
}

fn sort_by_cpu(processes: &mut [ProcessInfo]) {
    processes.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent).then(a.pid.cmp(&b.pid)));
}

/// Parse one line of `ps -axo pid=,user=,stat=,pcpu=,rss=,comm=`.
///
/// `comm` is the remainder of the line and may contain spaces. On macOS it
/// is the full executable path; the name is then its last component.
pub fn parse_ps_line(line: &str) -> Option<ProcessInfo> {
    let mut rest = line.trim_start();
    let mut fields = [""; 5];
    for field in &mut fields {
        let end = rest.find(char::is_whitespace)?;
        *field = &rest[..end];
        rest = rest[end..].trim_start();
    }
    let comm = rest.trim_end();
    if comm.is_empty() {
        return None;
    }

    let [pid, user, stat, pcpu, rss] = fields;
    let pid: u32 = match pid.parse() {
        Ok(p) => p,
        Err(_) => {
            trace!("Unparseable ps line: {line}");
            return None;
        }
    };
    let rss_kib: u64 = rss.parse().unwrap_or(0);

    let (name, executable_path) = if comm.starts_with('/') {
        let path = PathBuf::from(comm);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| comm.to_string());
        (name, Some(path))
    } else {
        (comm.to_string(), None)
    };

    Some(ProcessInfo {
        pid,
        name: CompactString::new(&name),
        user: CompactString::new(user),
        status: CompactString::new(describe_stat(stat)),
        cpu_percent: pcpu.parse().unwrap_or(0.0),
        memory_bytes: rss_kib.saturating_mul(1024),
        executable_path,
        is_system_protected: false,
    })
}

/// First letter of a `ps` STAT column, spelled out.
fn describe_stat(stat: &str) -> &'static str {
    match stat.chars().next() {
        Some('R') => "running",
        Some('S') => "sleeping",
        Some('D') => "disk-sleep",
        Some('I') => "idle",
        Some('T') => "stopped",
        Some('t') => "tracing-stop",
        Some('Z') => "zombie",
        Some('U') => "waiting",
        _ => "Unknown",
    }
}

/// Parse `tasklist /FO CSV /NH /V` output.
///
/// Columns: image name, PID, session name, session #, memory usage
/// (`"12,345 K"`, locale-formatted), status, user name, CPU time, window title.
/// `tasklist` reports no CPU percentage, so `cpu_percent` is zero.
pub fn parse_tasklist_csv(output: &str) -> Result<Vec<ProcessInfo>, ScanError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(output.as_bytes());

    let mut processes = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ScanError::Parse(format!("tasklist CSV: {e}")))?;
        let (Some(name), Some(pid)) = (record.get(0), record.get(1)) else {
            continue;
        };
        let Ok(pid) = pid.trim().parse::<u32>() else {
            trace!("Skipping tasklist row with PID {pid:?}");
            continue;
        };
        let memory_kib: u64 = record
            .get(4)
            .map(|m| m.chars().filter(char::is_ascii_digit).collect::<String>())
            .and_then(|digits| digits.parse().ok())
            .unwrap_or(0);
        let status = record.get(5).filter(|s| !s.is_empty()).unwrap_or("Unknown");
        let user = record
            .get(6)
            .filter(|u| !u.is_empty() && *u != "N/A")
            .unwrap_or("Unknown");

        processes.push(ProcessInfo {
            pid,
            name: CompactString::new(name),
            user: CompactString::new(user),
            status: CompactString::new(status),
            cpu_percent: 0.0,
            memory_bytes: memory_kib.saturating_mul(1024),
            executable_path: None,
            is_system_protected: false,
        });
    }
    Ok(processes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proc(pid: u32, cpu: f32, mem_mb: u64) -> ProcessInfo {
        ProcessInfo {
            pid,
            name: CompactString::new(format!("p{pid}")),
            user: CompactString::new("u"),
            status: CompactString::new("running"),
            cpu_percent: cpu,
            memory_bytes: mem_mb * 1024 * 1024,
            executable_path: None,
            is_system_protected: false,
        }
    }

    #[test]
    fn parses_linux_ps_line() {
        let p = parse_ps_line("  4321 alice    Sl   12.5 204800 Web Content").unwrap();
        assert_eq!(p.pid, 4321);
        assert_eq!(p.user, "alice");
        assert_eq!(p.status, "sleeping");
        assert_eq!(p.cpu_percent, 12.5);
        assert_eq!(p.memory_bytes, 204_800 * 1024);
        assert_eq!(p.name, "Web Content");
        assert_eq!(p.executable_path, None);
    }

    #[test]
    fn macos_comm_path_yields_name_and_exe() {
        let p = parse_ps_line("  88 bob  S  0.0  1024 /Applications/Foo.app/Contents/MacOS/Foo").unwrap();
        assert_eq!(p.name, "Foo");
        assert_eq!(
            p.executable_path,
            Some(PathBuf::from("/Applications/Foo.app/Contents/MacOS/Foo"))
        );
    }

    #[test]
    fn malformed_ps_lines_are_skipped() {
        assert!(parse_ps_line("").is_none());
        assert!(parse_ps_line("abc user S 0.0 10 x").is_none());
        assert!(parse_ps_line("12 user S 0.0 10").is_none());
    }

    #[test]
    fn parses_tasklist_rows() {
        let out = concat!(
            "\"System Idle Process\",\"0\",\"Services\",\"0\",\"8 K\",\"Unknown\",\"NT AUTHORITY\\SYSTEM\",\"12:00:00\",\"N/A\"\r\n",
            "\"chrome.exe\",\"9876\",\"Console\",\"1\",\"245,112 K\",\"Running\",\"DESKTOP\\me\",\"0:01:02\",\"Inbox\"\r\n",
            "\"svc.exe\",\"77\",\"Services\",\"0\",\"1.024 K\",\"Unknown\",\"N/A\",\"0:00:00\",\"N/A\"\r\n",
        );
        let procs = parse_tasklist_csv(out).unwrap();
        assert_eq!(procs.len(), 3);
        assert_eq!(procs[1].name, "chrome.exe");
        assert_eq!(procs[1].pid, 9876);
        assert_eq!(procs[1].memory_bytes, 245_112 * 1024);
        assert_eq!(procs[1].status, "Running");
        assert_eq!(procs[2].user, "Unknown");
        assert_eq!(procs[2].memory_bytes, 1_024 * 1024);
    }

    #[test]
    fn protection_rules_per_platform() {
        assert!(is_protected(4, "anything", Platform::Linux));
        assert!(is_protected(500, "SVCHOST.EXE", Platform::Windows));
        assert!(!is_protected(500, "svchost.exe.bak", Platform::Windows));
        assert!(is_protected(500, "kworker/0:1", Platform::Linux));
        assert!(is_protected(500, "Xorg", Platform::MacOs));
        assert!(!is_protected(500, "firefox", Platform::Linux));
        assert!(!is_protected(500, "init", Platform::Unknown));
    }

    #[test]
    fn high_resource_filter_uses_either_threshold() {
        let all = vec![proc(10, 1.0, 10), proc(11, 30.0, 10), proc(12, 0.5, 900), proc(13, 6.0, 10)];
        let heavy = filter_high_resource(&all, 5.0, 500.0, 50);
        let pids: Vec<u32> = heavy.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![11, 13, 12]);

        let capped = filter_high_resource(&all, 5.0, 500.0, 1);
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].pid, 11);
    }

    #[cfg(unix)]
    #[test]
    fn live_listing_includes_this_process() {
        // Minimal containers may ship without procps.
        let Ok(procs) = list_processes(Platform::current(), usize::MAX) else {
            return;
        };
        assert!(procs.iter().any(|p| p.pid == std::process::id()));
        let capped = list_processes(Platform::current(), 3).unwrap();
        assert!(capped.len() <= 3);
        for pair in capped.windows(2) {
            assert!(pair[0].cpu_percent >= pair[1].cpu_percent);
        }
    }
}
