/// Process termination with the protected-process guard.
use crate::command;
use crate::error::ActionError;
use crate::platform::Platform;
use crate::scanner::processes::{is_protected, parse_tasklist_csv};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// How long to wait for the process to disappear after signalling it.
pub const EXIT_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Terminate `pid`. `force` sends SIGKILL (`taskkill /F` on Windows) instead
/// of a polite request. Protected processes are refused before any signal is
/// sent. Waits up to [`EXIT_TIMEOUT`] for the process to exit.
pub fn terminate_process(pid: u32, force: bool, platform: Platform) -> Result<(), ActionError> {
    let name = process_name(pid, platform)?
        .ok_or_else(|| ActionError::NotFound(format!("process with PID {pid}")))?;

    if is_protected(pid, &name, platform) {
        return Err(ActionError::Protected(format!("{name} (PID {pid})")));
    }

    info!(pid, %name, force, "Terminating process");
    send_terminate(pid, force, platform)?;

    let deadline = Instant::now() + EXIT_TIMEOUT;
    while Instant::now() < deadline {
        if !is_alive(pid, platform) {
            return Ok(());
        }
        thread::sleep(POLL_INTERVAL);
    }
    warn!(pid, "Process still running after {:?}", EXIT_TIMEOUT);
    Err(ActionError::StillRunning {
        pid,
        timeout_secs: EXIT_TIMEOUT.as_secs(),
    })
}

fn process_name(pid: u32, platform: Platform) -> Result<Option<String>, ActionError> {
    match platform {
        Platform::Windows => {
            let filter = format!("PID eq {pid}");
            let out = command::run("tasklist", &["/FI", &filter, "/FO", "CSV", "/NH"])?;
            // A miss prints an informational line, not CSV; treat unparseable as absent.
            let rows = parse_tasklist_csv(&out).unwrap_or_default();
            Ok(rows.into_iter().find(|p| p.pid == pid).map(|p| p.name.to_string()))
        }
        Platform::Linux => Ok(std::fs::read_to_string(format!("/proc/{pid}/comm"))
            .ok()
            .map(|s| s.trim().to_string())),
        Platform::MacOs => {
            let pid_arg = pid.to_string();
            // `ps` exits non-zero when the PID does not exist.
            Ok(command::run("ps", &["-p", &pid_arg, "-o", "comm="])
                .ok()
                .map(|out| out.trim().rsplit('/').next().unwrap_or_default().to_string())
                .filter(|n| !n.is_empty()))
        }
        Platform::Unknown => Err(ActionError::Unsupported("process termination")),
    }
}

#[cfg(unix)]
fn send_terminate(pid: u32, force: bool, _platform: Platform) -> Result<(), ActionError> {
    let pid_t = libc::pid_t::try_from(pid)
        .map_err(|_| ActionError::NotFound(format!("process with PID {pid}")))?;
    let signal = if force { libc::SIGKILL } else { libc::SIGTERM };

    // SAFETY: kill has no memory-safety preconditions.
    let result = unsafe { libc::kill(pid_t, signal) };
    if result == 0 {
        return Ok(());
    }

    let err = std::io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::ESRCH) => Err(ActionError::NotFound(format!("process with PID {pid}"))),
        Some(libc::EPERM) => Err(ActionError::PermissionDenied(format!("PID {pid}"))),
        _ => Err(ActionError::Command {
            program: "kill".into(),
            message: err.to_string(),
        }),
    }
}

#[cfg(not(unix))]
fn send_terminate(pid: u32, force: bool, _platform: Platform) -> Result<(), ActionError> {
    let pid_arg = pid.to_string();
    let mut args = vec!["/PID", pid_arg.as_str()];
    if force {
        args.push("/F");
    }
    command::run("taskkill", &args)?;
    Ok(())
}

#[cfg(unix)]
fn is_alive(pid: u32, _platform: Platform) -> bool {
    let Ok(pid_t) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: signal 0 only performs the existence/permission check.
    let result = unsafe { libc::kill(pid_t, 0) };
    if result != 0 {
        // EPERM means the process exists but belongs to someone else.
        return std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM);
    }
    // A zombie has exited; it only awaits reaping by its parent.
    process_state(pid) != Some('Z')
}

#[cfg(not(unix))]
fn is_alive(pid: u32, platform: Platform) -> bool {
    matches!(process_name(pid, platform), Ok(Some(_)))
}

/// State letter from `/proc/<pid>/stat`.
#[cfg(target_os = "linux")]
fn process_state(pid: u32) -> Option<char> {
    let content = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    // Format: pid (comm) state ...
    let comm_end = content.rfind(')')?;
    content.get(comm_end + 2..)?.chars().next()
}

#[cfg(all(unix, not(target_os = "linux")))]
fn process_state(_pid: u32) -> Option<char> {
    None
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn init_is_protected() {
        let err = terminate_process(1, false, Platform::Linux).unwrap_err();
        assert!(matches!(err, ActionError::Protected(_)));
    }

    #[test]
    fn unknown_pid_is_not_found() {
        // Above the kernel's maximum pid_max (2^22).
        let err = terminate_process(4_194_305, true, Platform::Linux).unwrap_err();
        assert!(matches!(err, ActionError::NotFound(_)));
    }

    #[test]
    fn terminates_own_child() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        terminate_process(child.id(), false, Platform::Linux).unwrap();
        let status = child.wait().unwrap();
        assert!(!status.success());
    }
}
