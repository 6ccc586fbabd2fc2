use crate::error::Error;
use crate::frecency::FrecencyTracker;
use crate::git::GitTracker;
use crate::types::FileRecord;
use arc_swap::ArcSwap;
use git2::Repository;
use ignore::{WalkBuilder, WalkState};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// One filesystem change the background watcher (or a caller) reports to
/// the index.
#[derive(Debug, Clone)]
pub enum FileEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
    Renamed { from: PathBuf, to: PathBuf },
}

/// Immutable point-in-time view of the index. Readers hold a clone of the
/// `Arc` behind [`Index::snapshot`] and never block a concurrent writer.
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    pub generation: u64,
    pub records: Arc<Vec<FileRecord>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanProgress {
    pub scanned_files_count: usize,
    pub is_scanning: bool,
}

/// Live in-memory index over one base directory.
///
/// Reads go through [`ArcSwap`] so `snapshot()` never blocks on a writer.
/// Writes (`apply_event`, `rescan`) take the single writer lock implied by
/// `&mut self`-style access through the coordinator.
pub struct Index {
    base_path: PathBuf,
    snapshot: ArcSwap<IndexSnapshot>,
    path_to_id: RwLock<HashMap<PathBuf, u32>>,
    next_id: AtomicU32,
    generation: AtomicU64,
    is_scanning: Arc<AtomicBool>,
    scanned_files_count: Arc<AtomicUsize>,
    git_workdir: Mutex<Option<PathBuf>>,
}

impl Index {
    /// Fails with `InvalidBase` if `base_path` is not a directory. The
    /// initial snapshot is empty; call [`Index::rescan`] (the coordinator
    /// does this on a background thread) to populate it — queries issued
    /// before that completes simply see zero records.
    pub fn init(base_path: impl Into<PathBuf>) -> Result<Self, Error> {
        let base_path = base_path.into();
        if !base_path.is_dir() {
            return Err(Error::InvalidBase(base_path));
        }

        let base_path = base_path
            .canonicalize()
            .map_err(|_| Error::InvalidBase(base_path))?;

        Ok(Self {
            base_path,
            snapshot: ArcSwap::from_pointee(IndexSnapshot::default()),
            path_to_id: RwLock::new(HashMap::new()),
            next_id: AtomicU32::new(0),
            generation: AtomicU64::new(0),
            is_scanning: Arc::new(AtomicBool::new(false)),
            scanned_files_count: Arc::new(AtomicUsize::new(0)),
            git_workdir: Mutex::new(None),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Read-only view of the current index state, non-blocking for writers.
    pub fn snapshot(&self) -> IndexSnapshot {
        (**self.snapshot.load()).clone()
    }

    pub fn scan_progress(&self) -> ScanProgress {
        ScanProgress {
            scanned_files_count: self.scanned_files_count.load(Ordering::Relaxed),
            is_scanning: self.is_scanning.load(Ordering::Relaxed),
        }
    }

    pub fn git_workdir(&self) -> Option<PathBuf> {
        self.git_workdir.lock().unwrap().clone()
    }

    /// Full re-walk of the base directory: builds a fresh record set and
    /// swaps it in atomically. Parallel `ignore::WalkBuilder` walk, `.git`
    /// and hidden-entry filtering, per-record stat, sorted by path for
    /// deterministic lookups. Permission errors on individual entries are
    /// logged and skipped; a root-level walk failure is fatal.
    pub fn rescan(&self, frecency: Option<&FrecencyTracker>) -> Result<usize, Error> {
        if self
            .is_scanning
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("rescan already in progress, skipping");
            return Ok(self.snapshot().records.len());
        }

        self.scanned_files_count.store(0, Ordering::Relaxed);
        let result = self.scan_once(frecency);
        self.is_scanning.store(false, Ordering::Relaxed);
        result
    }

    fn scan_once(&self, frecency: Option<&FrecencyTracker>) -> Result<usize, Error> {
        let scan_start = std::time::Instant::now();
        let base_path = self.base_path.clone();

        let (git_workdir, records) = std::thread::scope(|scope| -> Result<_, Error> {
            let git_handle = scope.spawn(|| {
                let git_workdir = GitTracker::discover(&base_path);
                let status_cache = git_workdir.full_status();
                (git_workdir.workdir().map(Path::to_path_buf), status_cache)
            });

            let walker = WalkBuilder::new(&base_path)
                .hidden(false)
                .git_ignore(true)
                .git_exclude(true)
                .git_global(true)
                .ignore(true)
                .follow_links(false)
                .build_parallel();

            let files = Arc::new(Mutex::new(Vec::new()));
            walker.run(|| {
                let files = Arc::clone(&files);
                let counter = Arc::clone(&self.scanned_files_count);
                let base_path = base_path.clone();

                Box::new(move |result| {
                    match result {
                        Ok(entry) => {
                            if entry.file_type().is_some_and(|ft| ft.is_file())
                                && !is_ignored_path(entry.path())
                            {
                                let record = FileRecord::new(0, entry.path().to_path_buf(), &base_path);
                                if let Ok(mut v) = files.lock() {
                                    v.push(record);
                                    counter.fetch_add(1, Ordering::Relaxed);
                                }
                            }
                        }
                        Err(e) => warn!("walk entry error: {}", e),
                    }
                    WalkState::Continue
                })
            });

            let mut records = Arc::try_unwrap(files)
                .map_err(|_| Error::ScanFailed("walker left dangling references".into()))?
                .into_inner()
                .map_err(|_| Error::ScanFailed("walker mutex poisoned".into()))?;

            let (git_workdir, git_cache) = git_handle.join().map_err(|_| Error::ThreadPanic)?;

            records.par_iter_mut().for_each(|record| {
                if let Some(ref cache) = git_cache {
                    record.git_status = cache.lookup_status(&record.absolute_path).unwrap_or_default();
                }
                if let Some(frecency) = frecency {
                    record.access_frecency_score = frecency.score_for(&record.absolute_path);
                    record.modification_frecency_score = frecency.get_modification_score(
                        record.modified_at,
                        crate::git::is_modified_status(record.git_status),
                    );
                    record.total_frecency_score =
                        record.access_frecency_score + record.modification_frecency_score;
                }
            });

            records.par_sort_unstable_by(|a, b| a.absolute_path.cmp(&b.absolute_path));
            Ok((git_workdir, records))
        })?;

        let mut path_to_id = self.path_to_id.write().unwrap();
        path_to_id.clear();
        let mut records = records;
        for record in records.iter_mut() {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            record.index_id = id;
            path_to_id.insert(record.absolute_path.clone(), id);
        }
        drop(path_to_id);

        *self.git_workdir.lock().unwrap() = git_workdir;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let count = records.len();
        self.snapshot.store(Arc::new(IndexSnapshot {
            generation,
            records: Arc::new(records),
        }));

        info!(
            generation,
            count,
            elapsed = ?scan_start.elapsed(),
            "rescan complete"
        );

        Ok(count)
    }

    /// Consumes one filesystem event, updating records and the path→id
    /// map. Copy-on-write: the current record
    /// vector is cloned once, mutated, then atomically swapped in — cheap
    /// relative to a full rescan since the watcher already batches and
    /// coalesces events before calling this.
    pub fn apply_event(&self, event: FileEvent, frecency: Option<&FrecencyTracker>) -> Result<(), Error> {
        let current = self.snapshot();
        let mut records = (*current.records).clone();

        match event {
            FileEvent::Created(path) | FileEvent::Modified(path) => {
                self.upsert_record(&mut records, &path, frecency);
            }
            FileEvent::Deleted(path) => {
                self.remove_record(&mut records, &path);
            }
            FileEvent::Renamed { from, to } => {
                self.remove_record(&mut records, &from);
                self.upsert_record(&mut records, &to, frecency);
            }
        }

        records.sort_unstable_by(|a, b| a.absolute_path.cmp(&b.absolute_path));

        let generation = current.generation;
        self.snapshot.store(Arc::new(IndexSnapshot {
            generation,
            records: Arc::new(records),
        }));

        Ok(())
    }

    fn upsert_record(&self, records: &mut Vec<FileRecord>, path: &Path, frecency: Option<&FrecencyTracker>) {
        if !path.is_file() || is_ignored_path(path) {
            return;
        }

        let mut path_to_id = self.path_to_id.write().unwrap();
        if let Some(&id) = path_to_id.get(path) {
            if let Some(record) = records.iter_mut().find(|r| r.absolute_path == path) {
                record.refresh_metadata();
                if let Some(frecency) = frecency {
                    record.access_frecency_score = frecency.score_for(&record.absolute_path);
                    record.total_frecency_score =
                        record.access_frecency_score + record.modification_frecency_score;
                }
            } else {
                warn!(id, path = %path.display(), "path→id map out of sync with records");
            }
            return;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        path_to_id.insert(path.to_path_buf(), id);
        let mut record = FileRecord::new(id, path.to_path_buf(), &self.base_path);
        if let Some(frecency) = frecency {
            record.access_frecency_score = frecency.score_for(&record.absolute_path);
            record.total_frecency_score = record.access_frecency_score;
        }
        records.push(record);
    }

    fn remove_record(&self, records: &mut Vec<FileRecord>, path: &Path) {
        self.path_to_id.write().unwrap().remove(path);
        records.retain(|r| r.absolute_path != path);
    }

    /// Discards this index and begins a fresh scan against `new_base`.
    pub fn restart(&self, new_base: impl Into<PathBuf>, frecency: Option<&FrecencyTracker>) -> Result<Index, Error> {
        let _ = self; // the old index is discarded; restart yields a fresh one
        let fresh = Index::init(new_base)?;
        fresh.rescan(frecency)?;
        Ok(fresh)
    }

    /// Applies a full git status refresh against the current snapshot,
    /// returning the count of records whose status changed.
    pub fn refresh_git_status(&self, tracker: &GitTracker, frecency: Option<&FrecencyTracker>) -> Result<usize, Error> {
        let Some(cache) = tracker.full_status() else {
            return Ok(0);
        };

        let current = self.snapshot();
        let mut records = (*current.records).clone();
        let mut changed = 0usize;

        for record in records.iter_mut() {
            let new_status = cache.lookup_status(&record.absolute_path).unwrap_or_default();
            if new_status != record.git_status {
                record.git_status = new_status;
                changed += 1;
            }
            if let Some(frecency) = frecency {
                record.modification_frecency_score = frecency.get_modification_score(
                    record.modified_at,
                    crate::git::is_modified_status(record.git_status),
                );
                record.total_frecency_score =
                    record.access_frecency_score + record.modification_frecency_score;
            }
        }

        self.snapshot.store(Arc::new(IndexSnapshot {
            generation: current.generation,
            records: Arc::new(records),
        }));

        Ok(changed)
    }

    /// Pulls a freshly recorded access score for one path back into the
    /// live snapshot. Returns `true` if a matching record was found and
    /// updated.
    pub fn refresh_frecency_for_path(&self, path: &Path, frecency: &FrecencyTracker) -> bool {
        let current = self.snapshot();
        let Some(pos) = current
            .records
            .iter()
            .position(|r| r.absolute_path == path)
        else {
            return false;
        };

        let mut records = (*current.records).clone();
        let record = &mut records[pos];
        record.access_frecency_score = frecency.score_for(&record.absolute_path);
        record.total_frecency_score =
            record.access_frecency_score + record.modification_frecency_score;

        self.snapshot.store(Arc::new(IndexSnapshot {
            generation: current.generation,
            records: Arc::new(records),
        }));

        true
    }

    /// Targeted status refresh for a small set of touched paths, used by
    /// the watcher instead of a full `refresh_git_status` pass.
    pub fn refresh_git_status_for_paths(
        &self,
        repo: &Repository,
        relative_paths: &[String],
    ) -> Result<usize, Error> {
        use crate::git::GitStatusCache;

        let Some(cache) = GitStatusCache::git_status_for_paths(repo, relative_paths) else {
            return Ok(0);
        };

        let current = self.snapshot();
        let mut records = (*current.records).clone();
        let mut changed = 0usize;

        for record in records.iter_mut() {
            if let Some(new_status) = cache.lookup_status(&record.absolute_path) {
                if new_status != record.git_status {
                    record.git_status = new_status;
                    changed += 1;
                }
            }
        }

        self.snapshot.store(Arc::new(IndexSnapshot {
            generation: current.generation,
            records: Arc::new(records),
        }));

        Ok(changed)
    }
}

fn is_ignored_path(path: &Path) -> bool {
    path.components().any(|c| {
        let s = c.as_os_str().to_string_lossy();
        s == ".git" || (s.starts_with('.') && s.len() > 1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn init_rejects_non_directory() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("not_a_dir.txt");
        fs::write(&file_path, "x").unwrap();

        assert!(matches!(Index::init(file_path), Err(Error::InvalidBase(_))));
    }

    #[test]
    fn rescan_finds_files_and_excludes_dotfiles() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join(".hidden"), "x").unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git").join("config"), "x").unwrap();

        let index = Index::init(dir.path()).unwrap();
        let count = index.rescan(None).unwrap();
        assert_eq!(count, 1);

        let snapshot = index.snapshot();
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].name, "a.rs");
    }

    #[test]
    fn apply_event_created_then_deleted() {
        let dir = tempdir().unwrap();
        let index = Index::init(dir.path()).unwrap();
        index.rescan(None).unwrap();

        let new_file = dir.path().join("new.rs");
        fs::write(&new_file, "x").unwrap();
        index
            .apply_event(FileEvent::Created(new_file.clone()), None)
            .unwrap();
        assert_eq!(index.snapshot().records.len(), 1);

        fs::remove_file(&new_file).unwrap();
        index.apply_event(FileEvent::Deleted(new_file), None).unwrap();
        assert_eq!(index.snapshot().records.len(), 0);
    }

    #[test]
    fn rescan_bumps_generation() {
        let dir = tempdir().unwrap();
        let index = Index::init(dir.path()).unwrap();
        let gen0 = index.snapshot().generation;
        index.rescan(None).unwrap();
        let gen1 = index.snapshot().generation;
        assert!(gen1 > gen0);
    }
}
