/// Error types shared across the core crate.
///
/// Scanner errors are converted to `TaskResult::Failure` at the worker
/// boundary; they never reach the coordinator as a panic. Per-item I/O
/// errors inside enumeration loops are not represented here at all; they
/// are logged and the item is skipped.
use std::path::PathBuf;
use thiserror::Error;

/// A scanner-level failure that aborts the whole scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run {program}: {message}")]
    Command { program: String, message: String },

    #[error("failed to parse output: {0}")]
    Parse(String),

    #[error("not supported on this platform: {0}")]
    Unsupported(&'static str),
}

/// Failure to start a background task.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to spawn worker for task '{task_id}': {source}")]
    Spawn {
        task_id: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a user-initiated action (terminate, disable, empty trash).
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("refusing to touch protected target: {0}")]
    Protected(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("process {pid} did not exit within {timeout_secs} s")]
    StillRunning { pid: u32, timeout_secs: u64 },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run {program}: {message}")]
    Command { program: String, message: String },

    #[error("not supported on this platform: {0}")]
    Unsupported(&'static str),
}

/// Failure to load or validate the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
