use std::path::PathBuf;

/// Closed git status taxonomy.
///
/// Decoded from a `git2::Status` bitmask by [`crate::git::decode_status`];
/// every bit combination resolves to exactly one of these variants instead
/// of falling through to an open-ended string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GitStatus {
    Clean,
    Untracked,
    Modified,
    Added,
    Deleted,
    Renamed,
    Conflicted,
    Ignored,
    #[default]
    Unknown,
}

impl GitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GitStatus::Clean => "clean",
            GitStatus::Untracked => "untracked",
            GitStatus::Modified => "modified",
            GitStatus::Added => "added",
            GitStatus::Deleted => "deleted",
            GitStatus::Renamed => "renamed",
            GitStatus::Conflicted => "conflicted",
            GitStatus::Ignored => "ignored",
            GitStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for GitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One indexed file and its cached scoring inputs.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub index_id: u32,
    pub absolute_path: PathBuf,
    pub relative_path: String,
    pub name: String,
    pub extension: String,
    pub size_bytes: u64,
    pub modified_at: u64,
    pub is_symlink: bool,
    pub git_status: GitStatus,
    pub access_frecency_score: i64,
    pub modification_frecency_score: i64,
    pub total_frecency_score: i64,
}

impl FileRecord {
    pub fn new(index_id: u32, absolute_path: PathBuf, base_path: &std::path::Path) -> Self {
        let relative_path = pathdiff::diff_paths(&absolute_path, base_path)
            .unwrap_or_else(|| absolute_path.clone())
            .to_string_lossy()
            .into_owned();

        let name = absolute_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();

        let extension = absolute_path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let is_symlink = absolute_path
            .symlink_metadata()
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);

        let (size_bytes, modified_at) = match std::fs::metadata(&absolute_path) {
            Ok(metadata) => {
                let size = metadata.len();
                let modified = metadata
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                    .map_or(0, |d| d.as_secs());
                (size, modified)
            }
            Err(_) => (0, 0),
        };

        Self {
            index_id,
            absolute_path,
            relative_path,
            name,
            extension,
            size_bytes,
            modified_at,
            is_symlink,
            git_status: GitStatus::Unknown,
            access_frecency_score: 0,
            modification_frecency_score: 0,
            total_frecency_score: 0,
        }
    }

    /// Re-stats the underlying file, bumping `modified_at` forward only —
    /// coalesced watcher events can arrive out of order, and a timestamp
    /// should never move backwards.
    pub fn refresh_metadata(&mut self) {
        if let Ok(metadata) = std::fs::metadata(&self.absolute_path) {
            self.size_bytes = metadata.len();
            if let Some(modified) = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            {
                let modified = modified.as_secs();
                if self.modified_at < modified {
                    self.modified_at = modified;
                }
            }
        }
    }
}

/// Component-score breakdown surfaced alongside every ranked result.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentScores {
    pub fuzzy: i32,
    pub path_bonus: i32,
    pub frecency: i32,
    pub git: i32,
    pub current_file: i32,
}

/// Total score plus the breakdown that produced it.
#[derive(Debug, Clone)]
pub struct Score {
    pub total: i32,
    pub components: ComponentScores,
    pub match_type: &'static str,
}

/// One ranked search result.
#[derive(Debug, Clone)]
pub struct ScoredResult {
    pub index_id: u32,
    pub total_score: i32,
    pub fuzzy_match_positions: Vec<u32>,
    pub component_scores: ComponentScores,
}

/// Inputs to a single search call.
#[derive(Debug, Clone)]
pub struct ScoringContext<'a> {
    pub query: &'a str,
    pub max_typos: u16,
    pub max_threads: usize,
    pub max_results: usize,
    pub current_file: Option<&'a str>,
    pub cwd: Option<&'a str>,
}

/// Result of one `fuzzy_search_files` call.
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    pub items: Vec<ScoredResult>,
    pub total_matched: usize,
    pub query_duration_ms: u64,
}
