use crate::background_watcher::BackgroundWatcher;
use crate::config::Config;
use crate::error::Error;
use crate::frecency::FrecencyTracker;
use crate::git::GitTracker;
use crate::index::Index;
use crate::score::match_and_score_files;
use crate::types::{ScoredResult, ScoringContext, SearchResult};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use tracing::info;

/// Single façade exposing the public operations, owning the thread pool
/// (via `rayon`'s global pool), the watcher handle, the git tracker, and
/// the frecency store. A plain owned struct a caller constructs and holds,
/// rather than reaching through global mutable state.
pub struct Coordinator {
    index: Arc<Index>,
    git_tracker: RwLock<GitTracker>,
    frecency: Option<Arc<FrecencyTracker>>,
    watcher: Mutex<Option<BackgroundWatcher>>,
    search_generation: AtomicU64,
    frecency_write_failures: AtomicU64,
}

impl Coordinator {
    /// Opens the frecency store (if a db path is configured) and builds an
    /// empty index over `config.base_path`. Callers then call
    /// [`Coordinator::scan_files`] to populate it and start the watcher.
    pub fn new(config: &Config) -> Result<Self, Error> {
        if config.logging.enabled {
            if let Err(e) =
                crate::tracing_setup::init_tracing(&config.logging.log_file_path, &config.logging.level)
            {
                eprintln!("failed to initialize tracing from config: {e}");
            }
        }

        let base_path = PathBuf::from(&config.base_path);
        let index = Index::init(&base_path)?;
        let git_tracker = GitTracker::discover(&base_path);

        let frecency = if config.frecency.enabled && !config.frecency.db_path.is_empty() {
            Some(Arc::new(FrecencyTracker::new(
                &config.frecency.db_path,
                config.frecency.use_unsafe_no_lock,
                config.frecency.decay_half_life_days,
                config.frecency.max_history_days,
            )?))
        } else {
            None
        };

        Ok(Self {
            index: Arc::new(index),
            git_tracker: RwLock::new(git_tracker),
            frecency,
            watcher: Mutex::new(None),
            search_generation: AtomicU64::new(0),
            frecency_write_failures: AtomicU64::new(0),
        })
    }

    /// Triggers a full index scan and (re)attaches the background watcher.
    /// The scan itself returns immediately from the caller's perspective —
    /// the work happens on a background thread, and queries issued before
    /// it completes see the partial (possibly still-empty) index.
    pub fn scan_files(&self) -> Result<(), Error> {
        let index = Arc::clone(&self.index);
        let frecency = self.frecency.clone();

        std::thread::spawn(move || {
            if let Err(e) = index.rescan(frecency.as_deref()) {
                tracing::error!("initial scan failed: {:?}", e);
            }
        });

        self.attach_watcher()
    }

    fn attach_watcher(&self) -> Result<(), Error> {
        let watcher = BackgroundWatcher::new(Arc::clone(&self.index), self.frecency.clone())?;
        *self.watcher.lock().unwrap() = Some(watcher);
        Ok(())
    }

    /// Discards the current index and watcher, begins fresh over `new_base`.
    pub fn restart_index_in_path(&mut self, new_base: impl AsRef<Path>) -> Result<(), Error> {
        if let Some(watcher) = self.watcher.lock().unwrap().take() {
            watcher.stop();
        }

        let new_base = new_base.as_ref();
        if !new_base.exists() {
            return Err(Error::InvalidBase(new_base.to_path_buf()));
        }

        let new_index = Index::init(new_base)?;
        *self.git_tracker.write().unwrap() = GitTracker::discover(new_base);
        self.index = Arc::new(new_index);

        self.scan_files()
    }

    /// Runs a fuzzy search over the current index snapshot and returns the
    /// top `max_results` ranked matches. `current_file`, if given, feeds the
    /// scorer's directory-bias and current-file-demotion components for a
    /// non-empty query; `cwd`, if given, feeds the directory bias used for
    /// the empty-query "recent files near here" ranking instead.
    pub fn fuzzy_search_files(
        &self,
        query: &str,
        max_results: usize,
        current_file: Option<&str>,
        cwd: Option<&str>,
    ) -> SearchResult {
        let start = std::time::Instant::now();
        let snapshot = self.index.snapshot();

        let max_typos = (query.len() as u16 / 4).clamp(2, 6);
        let context = ScoringContext {
            query,
            max_typos,
            max_threads: rayon::current_num_threads(),
            max_results,
            current_file,
            cwd,
        };

        let (items, total_matched): (Vec<ScoredResult>, usize) =
            match_and_score_files(&snapshot.records, &context);

        SearchResult {
            items,
            total_matched,
            query_duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Records a file access for frecency purposes. Write failures are
    /// counted, never propagated, so a flaky cache never breaks interactive
    /// search.
    pub fn track_access(&self, absolute_path: impl AsRef<Path>) {
        let Some(ref frecency) = self.frecency else {
            return;
        };

        match frecency.track_access(absolute_path.as_ref()) {
            Ok(()) => {
                self.index
                    .refresh_frecency_for_path(absolute_path.as_ref(), frecency);
            }
            Err(e) => {
                tracing::warn!("frecency track_access failed: {:?}", e);
                self.frecency_write_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Full git status refresh against the current worktree, returning the
    /// number of records whose status changed.
    pub fn refresh_git_status(&self) -> Result<usize, Error> {
        let tracker = self.git_tracker.read().unwrap();
        self.index.refresh_git_status(&tracker, self.frecency.as_deref())
    }

    /// Current index snapshot, for hosts that need to map a
    /// [`ScoredResult::index_id`] back to its [`crate::types::FileRecord`].
    pub fn snapshot(&self) -> crate::index::IndexSnapshot {
        self.index.snapshot()
    }

    pub fn init_tracing(&self, log_file_path: &str, log_level: &str) -> Result<String, Error> {
        crate::tracing_setup::init_tracing(log_file_path, log_level)
    }

    /// Stops the watcher; the index and frecency store are dropped with
    /// the `Coordinator` itself.
    pub fn cleanup_file_picker(&self) {
        if let Some(watcher) = self.watcher.lock().unwrap().take() {
            watcher.stop();
            info!("coordinator cleanup: watcher stopped");
        }
    }

    /// Monotonically increasing token a caller can use to cancel a
    /// superseded in-flight search.
    pub fn next_search_generation(&self) -> u64 {
        self.search_generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn health(&self) -> CoordinatorHealth {
        CoordinatorHealth {
            scan_progress: self.index.scan_progress(),
            frecency_write_failures: self.frecency_write_failures.load(Ordering::Relaxed),
            record_count: self.index.snapshot().records.len(),
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.cleanup_file_picker();
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CoordinatorHealth {
    pub scan_progress: crate::index::ScanProgress,
    pub frecency_write_failures: u64,
    pub record_count: usize,
}

/// Thin opt-in process-wide registry for hosts that can't easily thread an
/// owned `Coordinator` value through their own callback-based API.
static GLOBAL: OnceLock<RwLock<Option<Arc<Coordinator>>>> = OnceLock::new();

pub fn install_global(coordinator: Coordinator) -> Arc<Coordinator> {
    let slot = GLOBAL.get_or_init(|| RwLock::new(None));
    let coordinator = Arc::new(coordinator);
    *slot.write().unwrap() = Some(Arc::clone(&coordinator));
    coordinator
}

pub fn global() -> Option<Arc<Coordinator>> {
    GLOBAL.get().and_then(|slot| slot.read().unwrap().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn test_config(base: &Path) -> Config {
        let mut config = Config::default();
        config.base_path = base.to_string_lossy().into_owned();
        config.frecency.db_path = String::new();
        config
    }

    #[test]
    fn scan_then_search_finds_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();

        let coordinator = Coordinator::new(&test_config(dir.path())).unwrap();
        coordinator.index.rescan(None).unwrap();

        let results = coordinator.fuzzy_search_files("main", 10, None, None);
        assert_eq!(results.items.len(), 1);
    }

    #[test]
    fn track_access_without_frecency_store_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = Coordinator::new(&test_config(dir.path())).unwrap();
        coordinator.track_access(dir.path().join("main.rs"));
        assert_eq!(coordinator.health().frecency_write_failures, 0);
    }
}
