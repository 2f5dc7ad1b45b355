/// Large/unused file finder.
///
/// Walks each search root with `jwalk`, pruning uninteresting directories
/// before their children are read, and keeps only the largest qualifying files
/// in a bounded [`TopK`] so memory stays flat on very large trees.
use crate::analysis::TopK;
use crate::config::LargeFileConfig;
use crate::error::ScanError;
use crate::executor::CancelSignal;
use crate::model::size::megabytes_to_bytes;
use crate::model::LargeFile;
use crate::platform::SkipRules;
use crate::scanner::files::last_access;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, trace};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Parameters of one large/unused scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LargeFileQuery {
    pub roots: Vec<PathBuf>,
    pub min_size_bytes: u64,
    /// A file qualifies only if it was last accessed at least this many days ago.
    pub stale_days: u64,
    /// Top-K bound.
    pub max_results: usize,
}

impl LargeFileQuery {
    /// Build a query from configuration. Empty `search_paths` fall back to `home`.
    pub fn from_config(config: &LargeFileConfig, home: Option<&Path>) -> Self {
        let roots = if config.search_paths.is_empty() {
            home.map(|h| vec![h.to_path_buf()]).unwrap_or_default()
        } else {
            config.search_paths.clone()
        };
        Self {
            roots,
            min_size_bytes: megabytes_to_bytes(config.min_size_mb),
            stale_days: config.days_unused,
            max_results: config.max_results,
        }
    }

    fn cutoff(&self, now: SystemTime) -> SystemTime {
        let stale_for = Duration::from_secs(self.stale_days.saturating_mul(SECS_PER_DAY));
        now.checked_sub(stale_for).unwrap_or(SystemTime::UNIX_EPOCH)
    }
}

/// Heap ordering: larger size wins; on equal size the lexically smaller path
/// wins, so the final descending order lists ties by ascending path.
struct Ranked(LargeFile);

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .size
            .cmp(&other.0.size)
            .then_with(|| other.0.path.cmp(&self.0.path))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// Find files that are at least `min_size_bytes` large and have not been
/// accessed for `stale_days`, largest first, at most `max_results` of them.
///
/// Roots that are missing or not directories are skipped. Cancellation
/// returns the best result accumulated so far.
pub fn find_large_unused_files(
    query: &LargeFileQuery,
    rules: &SkipRules,
    signal: &CancelSignal,
) -> Result<Vec<LargeFile>, ScanError> {
    let start = Instant::now();
    let now = SystemTime::now();
    let cutoff = query.cutoff(now);
    let rules = Arc::new(rules.clone());

    let mut top = TopK::new(query.max_results);
    let mut checkpoint = signal.checkpoint();
    let mut candidates: u64 = 0;

    'roots: for root in &query.roots {
        if signal.is_cancelled() {
            break;
        }
        if !root.is_dir() {
            debug!("Skipping search root {}: not a directory", root.display());
            continue;
        }

        let prune = Arc::clone(&rules);
        let walker = jwalk::WalkDir::new(root)
            .skip_hidden(false)
            .follow_links(false)
            .parallelism(jwalk::Parallelism::RayonNewPool(num_cpus::get()))
            .process_read_dir(move |depth, _parent, _state, children| {
                // `None` is the read that yields the root entry itself; only
                // directories below the root are pruned.
                if depth.is_none() {
                    return;
                }
                children.retain(|child| match child {
                    Ok(entry) if entry.file_type().is_dir() => !prune.should_skip(&entry.path()),
                    _ => true,
                });
            });

        for entry_result in walker {
            if checkpoint.tick() {
                debug!("Large-file scan cancelled after {} entries", checkpoint.items());
                break 'roots;
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
            let meta = match std::fs::symlink_metadata(&path) {
                Ok(m) => m,
                Err(err) => {
                    trace!("Skipping {}: {err}", path.display());
                    continue;
                }
            };
            let size = meta.len();
            if size < query.min_size_bytes {
                continue;
            }
            let Some(accessed) = last_access(&meta) else {
                continue;
            };
            if accessed > cutoff {
                continue;
            }

            candidates += 1;
            top.push(Ranked(LargeFile::new(path, size, accessed, now)));
        }
    }

    let files: Vec<LargeFile> = top.into_sorted_vec().into_iter().map(|r| r.0).collect();
    info!(
        "Large-file scan: {} candidates, {} kept, {} entries in {:?}",
        candidates,
        files.len(),
        checkpoint.items(),
        start.elapsed()
    );
    Ok(files)
}
