/// Configuration loading and validation.
///
/// Resolution order:
/// 1. `LAPCARE_CONFIG` environment variable (path to a JSON file; must exist)
/// 2. `<user config dir>/lapcare/config.json` if present
/// 3. Built-in defaults
///
/// Every section and field is optional in the file; missing values take the
/// defaults below.
use crate::error::ConfigError;
use crate::executor::DEFAULT_GRACE_PERIOD;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "LAPCARE_CONFIG";

const CONFIG_DIR_NAME: &str = "lapcare";
const CONFIG_FILE_NAME: &str = "config.json";

/// Largest-files bound kept by the large/unused scan.
pub const DEFAULT_MAX_RESULTS: usize = 1_000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub executor: ExecutorConfig,
    pub large_files: LargeFileConfig,
    pub processes: ProcessConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// How long `cancel` waits for a worker before detaching it.
    pub grace_period_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: DEFAULT_GRACE_PERIOD.as_millis() as u64,
        }
    }
}

impl ExecutorConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LargeFileConfig {
    /// Roots to search. Empty means the user's home directory.
    pub search_paths: Vec<PathBuf>,
    pub min_size_mb: f64,
    pub days_unused: u64,
    /// Top-K bound on the accumulator and the final result.
    pub max_results: usize,
}

impl Default for LargeFileConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            min_size_mb: 100.0,
            days_unused: 30,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Cap on the full process listing.
    pub max_listed: usize,
    pub cpu_threshold: f32,
    pub memory_threshold_mb: f64,
    /// Cap on the high-resource listing.
    pub max_high_resource: usize,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            max_listed: 100,
            cpu_threshold: 5.0,
            memory_threshold_mb: 500.0,
            max_high_resource: 50,
        }
    }
}

impl Config {
    /// Resolve and load the configuration (see module docs for order).
    pub fn resolve() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::load(Path::new(&path));
        }
        if let Some(dir) = dirs::config_dir() {
            let path = dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
            if path.is_file() {
                return Self::load(&path);
            }
        }
        debug!("No config file found; using defaults");
        Ok(Self::default())
    }

    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.executor.grace_period_ms == 0 {
            return Err(ConfigError::Invalid(
                "executor.grace_period_ms must be > 0".into(),
            ));
        }
        if self.large_files.max_results == 0 {
            return Err(ConfigError::Invalid(
                "large_files.max_results must be > 0".into(),
            ));
        }
        if invalid_threshold(self.large_files.min_size_mb) {
            return Err(ConfigError::Invalid(
                "large_files.min_size_mb must be >= 0".into(),
            ));
        }
        if invalid_threshold(f64::from(self.processes.cpu_threshold))
            || invalid_threshold(self.processes.memory_threshold_mb)
        {
            return Err(ConfigError::Invalid(
                "process thresholds must be >= 0".into(),
            ));
        }
        Ok(())
    }
}

fn invalid_threshold(value: f64) -> bool {
    value.is_nan() || value < 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_object_yields_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.executor.grace_period(), Duration::from_millis(1_000));
        assert_eq!(config.large_files.max_results, 1_000);
        assert_eq!(config.large_files.days_unused, 30);
        assert_eq!(config.processes.max_listed, 100);
        assert!(config.large_files.search_paths.is_empty());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_json(
            r#"{ "large_files": { "max_results": 250, "search_paths": ["/data"] },
                 "executor": { "grace_period_ms": 200 } }"#,
        )
        .unwrap();
        assert_eq!(config.large_files.max_results, 250);
        assert_eq!(config.large_files.min_size_mb, 100.0);
        assert_eq!(config.large_files.search_paths, vec![PathBuf::from("/data")]);
        assert_eq!(config.executor.grace_period_ms, 200);
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let err = Config::from_json(r#"{ "large_files": { "max_results": 0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_reports_path_on_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        match Config::load(file.path()) {
            Err(ConfigError::Parse { path, .. }) => assert_eq!(path, file.path()),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
