/// Platform-specific functionality: OS family detection, per-OS paths and
/// deny-lists, and privilege checks. Scanners and actions consume this
/// instead of probing the environment themselves.

pub mod paths;
pub mod permissions;

pub use paths::{PlatformPaths, SkipRules};
pub use permissions::is_elevated;

/// Operating-system family the binary was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
    Unknown,
}

impl Platform {
    /// The platform this process runs on (fixed at compile time).
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Unknown
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::Linux => "Linux",
            Self::MacOs => "macOS",
            Self::Unknown => "Unknown",
        }
    }

    pub fn is_unix_like(self) -> bool {
        matches!(self, Self::Linux | Self::MacOs)
    }
}
