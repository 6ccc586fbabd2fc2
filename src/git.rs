use git2::{Repository, Status, StatusOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::types::GitStatus;

/// Decodes a raw `git2::Status` bitmask into a closed taxonomy. Working-tree
/// bits take priority over index-only bits, but every combination now
/// resolves to exactly one variant instead of falling back to an open
/// string.
pub fn decode_status(status: Status) -> GitStatus {
    if status.is_conflicted() {
        GitStatus::Conflicted
    } else if status.contains(Status::WT_MODIFIED) || status.contains(Status::INDEX_MODIFIED) {
        GitStatus::Modified
    } else if status.contains(Status::INDEX_NEW) {
        GitStatus::Added
    } else if status.contains(Status::WT_NEW) {
        GitStatus::Untracked
    } else if status.contains(Status::WT_DELETED) || status.contains(Status::INDEX_DELETED) {
        GitStatus::Deleted
    } else if status.contains(Status::WT_RENAMED) || status.contains(Status::INDEX_RENAMED) {
        GitStatus::Renamed
    } else if status.contains(Status::IGNORED) {
        GitStatus::Ignored
    } else if status.contains(Status::CURRENT) || status.is_empty() {
        GitStatus::Clean
    } else {
        GitStatus::Unknown
    }
}

/// True for any status that represents uncommitted work the user cares
/// about (used by the scorer's current-file penalty and the frecency
/// tracker's modification bonus).
#[inline]
pub fn is_modified_status(status: GitStatus) -> bool {
    matches!(
        status,
        GitStatus::Modified | GitStatus::Added | GitStatus::Untracked | GitStatus::Renamed
    )
}

/// A snapshot of `{path -> status}` for one worktree, sorted by path so
/// lookups are a binary search rather than a hash probe — optimized for
/// "populate once, look up once per scanned file".
#[derive(Debug, Clone, Default)]
pub struct GitStatusCache {
    paths: Vec<PathBuf>,
    statuses: Vec<GitStatus>,
}

impl GitStatusCache {
    fn from_entries(mut entries: Vec<(PathBuf, GitStatus)>) -> Self {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let (paths, statuses) = entries.into_iter().unzip();
        Self { paths, statuses }
    }

    pub fn lookup_status(&self, full_path: &Path) -> Option<GitStatus> {
        self.paths
            .binary_search_by(|probe| probe.as_path().cmp(full_path))
            .ok()
            .and_then(|idx| self.statuses.get(idx).copied())
    }

    pub fn statuses_len(&self) -> usize {
        self.paths.len()
    }

    pub fn into_iter(self) -> impl Iterator<Item = (PathBuf, GitStatus)> {
        self.paths.into_iter().zip(self.statuses)
    }

    /// Locates the git worktree enclosing `base_path`, if any. When there is
    /// no repository, the tracker is inert and every file reports `unknown`.
    pub fn discover(base_path: &Path) -> Option<PathBuf> {
        Repository::discover(base_path)
            .ok()
            .and_then(|repo| repo.workdir().map(Path::to_path_buf))
    }

    /// Enumerates the full status set for a worktree.
    pub fn read_git_status(git_workdir: Option<&Path>, mut options: StatusOptions) -> Option<Self> {
        let git_start = std::time::Instant::now();
        let git_workdir = git_workdir?;
        let repository = Repository::open(git_workdir)
            .map_err(|e| {
                error!(
                    "failed to open git repository at {}: {}",
                    git_workdir.display(),
                    e
                );
                e
            })
            .ok()?;

        let statuses = repository
            .statuses(Some(&mut options))
            .map_err(|e| {
                error!("failed to read git statuses: {}", e);
                e
            })
            .ok()?;

        let mut entries = Vec::with_capacity(statuses.len());
        for entry in &statuses {
            if let Some(entry_path) = entry.path() {
                let full_path = git_workdir.join(entry_path);
                entries.push((full_path, decode_status(entry.status())));
            }
        }

        debug!(
            entries = entries.len(),
            elapsed = ?git_start.elapsed(),
            "read git status for worktree {}",
            git_workdir.display()
        );

        Some(Self::from_entries(entries))
    }

    /// Targeted status lookup for a small set of relative paths, used by the
    /// background watcher after a handful of files change instead of paying
    /// for a full repository status walk.
    pub fn git_status_for_paths(repo: &Repository, relative_paths: &[String]) -> Option<Self> {
        if relative_paths.is_empty() {
            return None;
        }

        let workdir = repo.workdir()?;
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);
        for path in relative_paths {
            opts.pathspec(path);
        }

        let statuses = repo.statuses(Some(&mut opts)).ok()?;
        let mut entries = Vec::with_capacity(statuses.len());
        for entry in &statuses {
            if let Some(entry_path) = entry.path() {
                entries.push((workdir.join(entry_path), decode_status(entry.status())));
            }
        }

        Some(Self::from_entries(entries))
    }
}

/// Tracks git status for one worktree and reports how many records changed
/// on refresh.
#[derive(Debug, Default)]
pub struct GitTracker {
    workdir: Option<PathBuf>,
}

impl GitTracker {
    pub fn discover(base_path: &Path) -> Self {
        let workdir = GitStatusCache::discover(base_path);
        if let Some(ref dir) = workdir {
            info!("git repository found at {}", dir.display());
        } else {
            info!("no git repository found for {}", base_path.display());
        }
        Self { workdir }
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    pub fn is_inert(&self) -> bool {
        self.workdir.is_none()
    }

    /// Full status enumeration: one pass over the status iterator, merging
    /// index-vs-HEAD and worktree-vs-index bits via [`decode_status`].
    pub fn full_status(&self) -> Option<GitStatusCache> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_unmodified(true)
            .exclude_submodules(true);
        GitStatusCache::read_git_status(self.workdir(), opts)
    }
}
