/// Recursive file listing for the temp and trash inventories.
use crate::error::ScanError;
use crate::executor::CancelSignal;
use crate::model::FileEntry;
use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, trace};

/// List every regular file under `dir`, recursively.
///
/// A missing directory is an empty inventory, not an error. An existing
/// directory whose top level cannot be read is a [`ScanError::Io`]; anything
/// unreadable below it is skipped. On cancellation the files found so far are
/// returned.
pub fn list_files(dir: &Path, signal: &CancelSignal) -> Result<Vec<FileEntry>, ScanError> {
    if signal.is_cancelled() {
        return Ok(Vec::new());
    }
    if !dir.is_dir() {
        debug!("{} does not exist; nothing to list", dir.display());
        return Ok(Vec::new());
    }
    std::fs::read_dir(dir).map_err(|source| ScanError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let walker = jwalk::WalkDir::new(dir)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(jwalk::Parallelism::RayonNewPool(num_cpus::get()));

    let mut files = Vec::new();
    let mut checkpoint = signal.checkpoint();

    for entry_result in walker {
        if checkpoint.tick() {
            debug!(
                "Listing of {} cancelled after {} entries",
                dir.display(),
                checkpoint.items()
            );
            break;
        }

        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                trace!("Skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        match std::fs::symlink_metadata(&path) {
            Ok(meta) => files.push(FileEntry {
                size: meta.len(),
                last_access: last_access(&meta),
                path,
            }),
            Err(err) => trace!("Skipping {}: {err}", path.display()),
        }
    }

    Ok(files)
}

/// Access time, falling back to modification time where the filesystem
/// does not track access.
pub(crate) fn last_access(meta: &Metadata) -> Option<SystemTime> {
    meta.accessed().or_else(|_| meta.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn lists_nested_files_with_sizes() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        fs::write(tmp.path().join("top.txt"), vec![0u8; 5]).unwrap();
        fs::write(tmp.path().join("a/b/deep.bin"), vec![0u8; 7]).unwrap();
        fs::write(tmp.path().join(".hidden"), vec![0u8; 3]).unwrap();

        let mut files = list_files(tmp.path(), &CancelSignal::new()).unwrap();
        files.sort_by_key(|f| f.size);
        let sizes: Vec<u64> = files.iter().map(|f| f.size).collect();
        assert_eq!(sizes, vec![3, 5, 7]);
        assert!(files.iter().all(|f| f.last_access.is_some()));
    }

    #[test]
    fn missing_directory_is_empty_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let files = list_files(&tmp.path().join("gone"), &CancelSignal::new()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn pre_cancelled_signal_returns_empty() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("x"), b"data").unwrap();
        let signal = CancelSignal::new();
        signal.cancel();
        assert!(list_files(tmp.path(), &signal).unwrap().is_empty());
    }
}
