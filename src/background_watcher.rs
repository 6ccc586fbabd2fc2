use crate::error::Error;
use crate::frecency::FrecencyTracker;
use crate::index::{FileEvent, Index};
use git2::Repository;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEvent};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

type Debouncer = notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>;

const DEBOUNCE_TIMEOUT: Duration = Duration::from_millis(500);
/// A single debounced batch affecting more paths than this triggers a full
/// rescan instead of applying events one at a time — the escape hatch for
/// a change large enough that per-path application would cost more than a
/// fresh walk.
const MAX_BATCH_EVENTS: usize = 50;

/// Recursive filesystem watcher feeding normalized events into the index.
pub struct BackgroundWatcher {
    debouncer: Arc<Mutex<Option<Debouncer>>>,
}

impl BackgroundWatcher {
    pub fn new(
        index: Arc<Index>,
        frecency: Option<Arc<FrecencyTracker>>,
    ) -> Result<Self, Error> {
        let base_path = index.base_path().to_path_buf();
        info!(path = %base_path.display(), "initializing background watcher");

        let git_workdir = index.git_workdir();
        let debouncer = Self::create_debouncer(base_path, git_workdir, index, frecency)?;

        Ok(Self {
            debouncer: Arc::new(Mutex::new(Some(debouncer))),
        })
    }

    fn create_debouncer(
        base_path: PathBuf,
        git_workdir: Option<PathBuf>,
        index: Arc<Index>,
        frecency: Option<Arc<FrecencyTracker>>,
    ) -> Result<Debouncer, Error> {
        let mut debouncer = new_debouncer(DEBOUNCE_TIMEOUT, {
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    if !events.is_empty() {
                        handle_debounced_events(events, &git_workdir, &index, frecency.as_deref());
                    }
                }
                Err(errors) => {
                    error!("file watcher errors: {:?}", errors);
                }
            }
        })?;

        debouncer
            .watcher()
            .watch(base_path.as_path(), RecursiveMode::Recursive)?;
        info!(path = %base_path.display(), "file watcher attached");

        Ok(debouncer)
    }

    pub fn stop(&self) {
        if let Ok(Some(debouncer)) = self.debouncer.lock().map(|mut d| d.take()) {
            drop(debouncer);
            info!("background watcher stopped");
        } else {
            error!("failed to stop background watcher");
        }
    }
}

impl Drop for BackgroundWatcher {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.debouncer.lock() {
            if let Some(debouncer) = guard.take() {
                drop(debouncer);
            }
        }
    }
}

fn handle_debounced_events(
    events: Vec<DebouncedEvent>,
    git_workdir: &Option<PathBuf>,
    index: &Arc<Index>,
    frecency: Option<&FrecencyTracker>,
) {
    debug!(count = events.len(), "processing debounced events");

    let repo = git_workdir.as_ref().and_then(|p| Repository::open(p).ok());
    let mut touched_relative_paths = Vec::with_capacity(events.len());
    let mut affected = 0usize;

    for event in &events {
        let path = &event.path;

        if is_ignore_definition_path(path) {
            info!(path = %path.display(), "ignore file changed, triggering full rescan");
            if let Err(e) = index.rescan(frecency) {
                error!("full rescan failed: {:?}", e);
            }
            return;
        }

        if is_dotgit_change_affecting_status(path, &repo) {
            debug!(path = %path.display(), "git metadata changed, will refresh git status");
        }

        if !should_include_file(path, &repo) {
            continue;
        }

        affected += 1;
        if affected > MAX_BATCH_EVENTS {
            warn!(affected, "too many affected paths in one batch, triggering full rescan");
            if let Err(e) = index.rescan(frecency) {
                error!("full rescan failed: {:?}", e);
            }
            return;
        }

        let fs_event = if path.exists() {
            FileEvent::Modified(path.clone())
        } else {
            FileEvent::Deleted(path.clone())
        };

        if let Err(e) = index.apply_event(fs_event, frecency) {
            error!("failed to apply event for {}: {:?}", path.display(), e);
            continue;
        }

        if let Some(relative) = pathdiff::diff_paths(path, index.base_path()) {
            touched_relative_paths.push(relative.to_string_lossy().into_owned());
        }
    }

    if let Some(repo) = repo.as_ref() {
        if let Err(e) = index.refresh_git_status_for_paths(repo, &touched_relative_paths) {
            error!("failed to refresh targeted git status: {:?}", e);
        }
    }
}

fn should_include_file(path: &Path, repo: &Option<Repository>) -> bool {
    if !path.is_file() || is_git_file(path) {
        return false;
    }

    // No repo means the git tracker is inert, not that the watcher stops working.
    match repo.as_ref() {
        Some(repo) => repo.is_path_ignored(path) == Ok(false),
        None => true,
    }
}

#[inline]
fn is_git_file(path: &Path) -> bool {
    path.components()
        .any(|component| component.as_os_str() == ".git")
}

fn is_dotgit_change_affecting_status(changed: &Path, repo: &Option<Repository>) -> bool {
    let Some(repo) = repo.as_ref() else {
        return false;
    };

    let git_dir = repo.path();
    let Ok(rel) = changed.strip_prefix(git_dir) else {
        return false;
    };

    if rel.starts_with("objects") || rel.starts_with("logs") || rel.starts_with("hooks") {
        return false;
    }
    if rel == Path::new("index") || rel == Path::new("index.lock") || rel == Path::new("HEAD") {
        return true;
    }
    if rel.starts_with("refs") || rel == Path::new("packed-refs") {
        return true;
    }

    matches!(
        rel.file_name().and_then(|f| f.to_str()),
        Some("MERGE_HEAD") | Some("CHERRY_PICK_HEAD") | Some("REVERT_HEAD")
    )
}

fn is_ignore_definition_path(path: &Path) -> bool {
    matches!(
        path.file_name().and_then(|f| f.to_str()),
        Some(".ignore") | Some(".gitignore")
    )
}
