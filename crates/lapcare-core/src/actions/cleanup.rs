/// File deletion and trash emptying.
use crate::command;
use crate::error::ActionError;
use crate::platform::{Platform, PlatformPaths};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of a batch delete. Per-file problems never abort the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: usize,
    pub failed: usize,
    /// One human-readable line per failure.
    pub errors: Vec<String>,
}

/// Delete each path. Files inside protected system directories are refused
/// and counted as failures. With `simulate`, every check runs but nothing is
/// removed.
pub fn delete_files(paths: &[PathBuf], simulate: bool, platform: &PlatformPaths) -> DeleteReport {
    let mut report = DeleteReport::default();

    for path in paths {
        if platform.is_system_path(path) {
            report.failed += 1;
            report.errors.push(format!("Skipped system file: {}", path.display()));
            continue;
        }

        let outcome = if simulate {
            std::fs::symlink_metadata(path).map(|_| ())
        } else {
            std::fs::remove_file(path)
        };

        match outcome {
            Ok(()) => report.deleted += 1,
            Err(err) => {
                report.failed += 1;
                report.errors.push(format!("Failed to delete {}: {err}", path.display()));
            }
        }
    }

    info!(
        deleted = report.deleted,
        failed = report.failed,
        simulate,
        "Delete batch finished"
    );
    report
}

const CLEAR_RECYCLE_BIN: &str = "Clear-RecycleBin -Force -ErrorAction SilentlyContinue";

/// Empty the user's trash. Returns the number of top-level entries removed
/// (always 0 on Windows, where the shell does the work).
pub fn empty_trash(paths: &PlatformPaths, simulate: bool) -> Result<usize, ActionError> {
    match paths.platform {
        Platform::Windows => {
            if !simulate {
                command::powershell(CLEAR_RECYCLE_BIN)?;
                info!("Recycle bin emptied");
            }
            Ok(0)
        }
        Platform::Linux | Platform::MacOs => {
            let trash = paths
                .trash_dir
                .as_ref()
                .ok_or(ActionError::Unsupported("trash location"))?;
            let dirs = if paths.platform == Platform::Linux {
                vec![trash.join("files"), trash.join("info")]
            } else {
                vec![trash.clone()]
            };

            let mut removed = 0;
            for dir in &dirs {
                removed += clear_directory(dir, simulate)?;
            }
            info!(removed, simulate, "Trash emptied");
            Ok(removed)
        }
        Platform::Unknown => Err(ActionError::Unsupported("emptying trash")),
    }
}

/// Remove every entry directly inside `dir`, leaving `dir` itself.
/// A missing directory counts as already empty.
fn clear_directory(dir: &Path, simulate: bool) -> Result<usize, ActionError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(source) => {
            return Err(ActionError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|source| ActionError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if simulate {
            removed += 1;
            continue;
        }

        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let result = if is_dir {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        match result {
            Ok(()) => removed += 1,
            Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(ActionError::PermissionDenied(path.display().to_string()));
            }
            Err(err) => warn!("Could not remove {}: {err}", path.display()),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn linux_paths(root: &Path) -> PlatformPaths {
        PlatformPaths {
            platform: Platform::Linux,
            temp_dir: root.join("tmp"),
            trash_dir: Some(root.join("Trash")),
            home_dir: Some(root.to_path_buf()),
        }
    }

    #[test]
    fn deletes_files_and_reports_failures() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a.log");
        let b = tmp.path().join("b.log");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"b").unwrap();
        let missing = tmp.path().join("missing.log");

        let report = delete_files(
            &[a.clone(), missing, PathBuf::from("/etc/hosts"), b.clone()],
            false,
            &linux_paths(tmp.path()),
        );

        assert_eq!(report.deleted, 2);
        assert_eq!(report.failed, 2);
        assert!(report.errors.iter().any(|e| e.starts_with("Skipped system file")));
        assert!(!a.exists() && !b.exists());
    }

    #[test]
    fn simulate_removes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("keep.txt");
        fs::write(&a, b"x").unwrap();

        let report = delete_files(&[a.clone()], true, &linux_paths(tmp.path()));
        assert_eq!(report.deleted, 1);
        assert!(a.exists());
    }

    #[test]
    fn empties_linux_trash_files_and_info() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = linux_paths(tmp.path());
        let trash = tmp.path().join("Trash");
        fs::create_dir_all(trash.join("files/folder")).unwrap();
        fs::create_dir_all(trash.join("info")).unwrap();
        fs::write(trash.join("files/one.txt"), b"1").unwrap();
        fs::write(trash.join("files/folder/two.txt"), b"2").unwrap();
        fs::write(trash.join("info/one.txt.trashinfo"), b"[Trash Info]").unwrap();

        assert_eq!(empty_trash(&paths, true).unwrap(), 3);
        assert!(trash.join("files/one.txt").exists());

        assert_eq!(empty_trash(&paths, false).unwrap(), 3);
        assert_eq!(fs::read_dir(trash.join("files")).unwrap().count(), 0);
        assert_eq!(fs::read_dir(trash.join("info")).unwrap().count(), 0);
        assert!(trash.join("files").is_dir());
    }

    #[test]
    fn missing_trash_is_already_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(empty_trash(&linux_paths(tmp.path()), false).unwrap(), 0);
    }
}
