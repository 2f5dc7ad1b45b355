/// External command execution shared by scanners and actions.
use crate::error::{ActionError, ScanError};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A command that could not be started or exited unsuccessfully.
#[derive(Debug)]
pub(crate) struct CommandFailure {
    pub program: String,
    pub message: String,
}

impl From<CommandFailure> for ScanError {
    fn from(f: CommandFailure) -> Self {
        ScanError::Command {
            program: f.program,
            message: f.message,
        }
    }
}

impl From<CommandFailure> for ActionError {
    fn from(f: CommandFailure) -> Self {
        ActionError::Command {
            program: f.program,
            message: f.message,
        }
    }
}

/// How long an external command may run before it is killed.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause between SIGTERM and SIGKILL for a command that overran its timeout.
#[cfg(unix)]
const TERM_GRACE: Duration = Duration::from_millis(500);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Run `program` to completion with [`DEFAULT_TIMEOUT`] and return its stdout
/// (lossy UTF-8).
///
/// A non-zero exit status is a failure; the message is the trimmed stderr,
/// or the exit status when stderr is empty.
pub(crate) fn run(program: &str, args: &[&str]) -> Result<String, CommandFailure> {
    run_with_timeout(program, args, DEFAULT_TIMEOUT)
}

/// [`run`] with an explicit timeout. On expiry the child is terminated
/// (SIGTERM, then SIGKILL on Unix) and reaped before the failure is returned.
pub(crate) fn run_with_timeout(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String, CommandFailure> {
    debug!(program, ?args, ?timeout, "Running external command");
    let failure = |message: String| CommandFailure {
        program: program.to_string(),
        message,
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| failure(err.to_string()))?;

    // Drain both pipes on their own threads so a chatty child never blocks
    // on a full pipe while we poll for its exit.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                warn!(program, ?timeout, "Command timed out; terminating");
                terminate(&mut child);
                // Reader threads are left to finish once the pipes close.
                return Err(failure(format!("timed out after {}s", timeout.as_secs_f64())));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(err) => {
                terminate(&mut child);
                return Err(failure(err.to_string()));
            }
        }
    };

    let stdout = collect(stdout);
    let stderr = collect(stderr);

    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("exited with {status}")
        } else {
            stderr
        };
        return Err(failure(message));
    }

    Ok(String::from_utf8_lossy(&stdout).into_owned())
}

fn drain<R: Read + Send + 'static>(mut stream: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf);
        buf
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    let Ok(pid) = libc::pid_t::try_from(child.id()) else {
        let _ = child.kill();
        let _ = child.wait();
        return;
    };
    // SAFETY: `pid` is our own unreaped child, so it cannot have been recycled.
    unsafe {
        libc::kill(pid, libc::SIGTERM);
    }
    thread::sleep(TERM_GRACE);
    if let Ok(None) = child.try_wait() {
        warn!(pid, "Command ignored SIGTERM; sending SIGKILL");
        let _ = child.kill();
    }
    let _ = child.wait();
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Run a PowerShell snippet without loading the user profile.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn powershell(script: &str) -> Result<String, CommandFailure> {
    run(
        "powershell",
        &["-NoProfile", "-NonInteractive", "-Command", script],
    )
}
