/// Per-platform directories: temp, trash, home, autostart, plus the
/// directory deny-lists used by the large-file scan and the cleanup actions.
use super::Platform;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Lower-cased substrings that exclude a directory from the large-file walk.
pub const SKIP_NAME_PATTERNS: [&str; 8] = [
    "__pycache__",
    "node_modules",
    ".git",
    ".svn",
    "cache",
    "tmp",
    "temp",
    "logs",
];

const UNIX_SYSTEM_DIRS: [&str; 10] = [
    "/bin",
    "/sbin",
    "/usr/bin",
    "/usr/sbin",
    "/usr/local/bin",
    "/lib",
    "/usr/lib",
    "/etc",
    "/var/lib",
    "/opt",
];

const UNIX_SKIP_DIRS: [&str; 11] = [
    "/bin",
    "/sbin",
    "/usr/bin",
    "/usr/sbin",
    "/usr/local/bin",
    "/lib",
    "/usr/lib",
    "/etc",
    "/var/lib",
    "/proc",
    "/dev",
];

const SYSTEM_AUTOSTART_DIR: &str = "/etc/xdg/autostart";

/// Resolved locations for the running platform.
///
/// Fields are public so tests (and callers with unusual layouts) can point
/// the scanners at arbitrary directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformPaths {
    pub platform: Platform,
    pub temp_dir: PathBuf,
    /// `None` on platforms without a known trash location.
    pub trash_dir: Option<PathBuf>,
    pub home_dir: Option<PathBuf>,
}

impl PlatformPaths {
    /// Resolve the paths for the current platform and user.
    pub fn detect() -> Self {
        let platform = Platform::current();
        let home_dir = dirs::home_dir();

        let temp_dir = match platform {
            Platform::Windows => std::env::var_os("TEMP")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            _ => PathBuf::from("/tmp"),
        };

        let trash_dir = match platform {
            Platform::Windows => {
                let drive = std::env::var("SystemDrive").unwrap_or_else(|_| "C:".to_string());
                Some(PathBuf::from(format!("{drive}\\$Recycle.Bin")))
            }
            Platform::Linux => dirs::data_dir().map(|d| d.join("Trash")),
            Platform::MacOs => home_dir.as_ref().map(|h| h.join(".Trash")),
            Platform::Unknown => None,
        };

        Self {
            platform,
            temp_dir,
            trash_dir,
            home_dir,
        }
    }

    /// Directory where trashed file payloads live. On Linux the trash root
    /// holds `files/` and `info/`; only `files/` carries user data.
    pub fn trash_files_dir(&self) -> Option<PathBuf> {
        let trash = self.trash_dir.as_ref()?;
        Some(match self.platform {
            Platform::Linux => trash.join("files"),
            _ => trash.clone(),
        })
    }

    /// Directories the large-file scan never descends into (exact match).
    pub fn skip_directories(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        match self.platform {
            Platform::Windows => {
                let windir = windows_dir();
                dirs.push(windir.join("System32"));
                dirs.push(windir.join("SysWOW64"));
                dirs.push(windir);
                if let Some(appdata) = std::env::var_os("APPDATA") {
                    dirs.push(PathBuf::from(appdata));
                }
            }
            Platform::Linux | Platform::MacOs => {
                dirs.extend(UNIX_SKIP_DIRS.iter().map(PathBuf::from));
                if self.platform == Platform::MacOs {
                    dirs.push(PathBuf::from("/System"));
                    dirs.push(PathBuf::from("/Library/Caches"));
                }
                if let Some(home) = &self.home_dir {
                    dirs.push(home.join(".cache"));
                }
            }
            Platform::Unknown => {}
        }
        dirs.push(self.temp_dir.clone());
        if let Some(trash) = &self.trash_dir {
            dirs.push(trash.clone());
        }
        dirs
    }

    /// Directories whose contents the cleanup actions refuse to delete.
    pub fn system_directories(&self) -> Vec<PathBuf> {
        match self.platform {
            Platform::Windows => {
                let windir = windows_dir();
                let program_files = std::env::var_os("PROGRAMFILES")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("C:\\Program Files"));
                let program_files_x86 = std::env::var_os("PROGRAMFILES(X86)")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("C:\\Program Files (x86)"));
                vec![
                    windir.join("System32"),
                    windir.join("SysWOW64"),
                    windir,
                    program_files,
                    program_files_x86,
                ]
            }
            Platform::Linux | Platform::MacOs => {
                let mut dirs: Vec<PathBuf> = UNIX_SYSTEM_DIRS.iter().map(PathBuf::from).collect();
                if self.platform == Platform::MacOs {
                    dirs.push(PathBuf::from("/System"));
                    dirs.push(PathBuf::from("/Library"));
                }
                dirs
            }
            Platform::Unknown => Vec::new(),
        }
    }

    /// `true` if `path` is inside (or equal to) a protected system directory.
    pub fn is_system_path(&self, path: &Path) -> bool {
        let windows = self.platform == Platform::Windows;
        self.system_directories()
            .iter()
            .any(|dir| is_within(path, dir, windows))
    }

    /// Autostart directories scanned for `.desktop` entries (Linux only).
    pub fn autostart_dirs(&self) -> Vec<PathBuf> {
        if self.platform != Platform::Linux {
            return Vec::new();
        }
        let mut dirs = vec![PathBuf::from(SYSTEM_AUTOSTART_DIR)];
        if let Some(config) = dirs::config_dir() {
            dirs.push(config.join("autostart"));
        }
        dirs
    }

    /// Pruning rules for the large-file walk on this platform.
    pub fn skip_rules(&self) -> SkipRules {
        SkipRules::new(self.skip_directories())
    }
}

fn windows_dir() -> PathBuf {
    std::env::var_os("WINDIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("C:\\Windows"))
}

/// Component-wise prefix test. Windows paths compare case-insensitively.
fn is_within(path: &Path, dir: &Path, case_insensitive: bool) -> bool {
    if case_insensitive {
        let path = PathBuf::from(path.to_string_lossy().to_lowercase());
        let dir = PathBuf::from(dir.to_string_lossy().to_lowercase());
        path.starts_with(dir)
    } else {
        path.starts_with(dir)
    }
}

/// Directory pruning rules for recursive scans.
///
/// A directory is pruned when its name starts with `.`, when its full path is
/// on the deny-list, or when its lower-cased name contains one of
/// [`SKIP_NAME_PATTERNS`].
#[derive(Debug, Clone, Default)]
pub struct SkipRules {
    deny: HashSet<PathBuf>,
}

impl SkipRules {
    pub fn new(deny: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            deny: deny.into_iter().collect(),
        }
    }

    /// Name-based rules only, with an empty deny-list.
    pub fn names_only() -> Self {
        Self::default()
    }

    pub fn should_skip(&self, dir: &Path) -> bool {
        if self.deny.contains(dir) {
            return true;
        }
        match dir.file_name() {
            Some(name) => skip_by_name(&name.to_string_lossy()),
            None => false,
        }
    }
}

fn skip_by_name(name: &str) -> bool {
    if name.starts_with('.') {
        return true;
    }
    let lower = name.to_lowercase();
    SKIP_NAME_PATTERNS.iter().any(|p| lower.contains(p))
}
