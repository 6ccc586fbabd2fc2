use crate::fuzzy;
use crate::git::is_modified_status;
use crate::path_utils::directory_bias;
use crate::types::{ComponentScores, FileRecord, GitStatus, ScoredResult, ScoringContext};
use rayon::prelude::*;
use std::collections::BinaryHeap;

const FREQUENCY_WEIGHT_PERCENT: i32 = 100;
const FILENAME_OVERLAP_BONUS: i32 = 30;
const EXTENSION_MATCH_BONUS: i32 = 10;
const DEPTH_PENALTY_PER_SEGMENT: i32 = -2;
const CURRENT_FILE_PENALTY: i32 = -1000;

/// Fixed increments in priority order: `modified > added > untracked >
/// renamed > conflicted > clean > deleted > ignored > unknown`.
fn git_status_bonus(status: GitStatus) -> i32 {
    match status {
        GitStatus::Modified => 60,
        GitStatus::Added => 50,
        GitStatus::Untracked => 40,
        GitStatus::Renamed => 30,
        GitStatus::Conflicted => 20,
        GitStatus::Clean => 10,
        GitStatus::Deleted => 5,
        GitStatus::Ignored => -10,
        GitStatus::Unknown => 0,
    }
}

fn path_bonus(file: &FileRecord, query: &str) -> i32 {
    let segment_count = file
        .relative_path
        .chars()
        .filter(|&c| c == '/' || c == std::path::MAIN_SEPARATOR)
        .count() as i32;
    let mut bonus = segment_count * DEPTH_PENALTY_PER_SEGMENT;

    let query_lower = query.to_lowercase();
    if !query_lower.is_empty() && file.name.to_lowercase().contains(&query_lower) {
        bonus += FILENAME_OVERLAP_BONUS;
    }

    if query_lower.contains('.') {
        if let Some(query_ext) = query_lower.rsplit('.').next() {
            if !file.extension.is_empty() && file.extension == query_ext {
                bonus += EXTENSION_MATCH_BONUS;
            }
        }
    }

    bonus
}

fn current_file_bonus(file: &FileRecord, context: &ScoringContext) -> i32 {
    let Some(current) = context.current_file else {
        return 0;
    };

    if file.relative_path == current {
        return if is_modified_status(file.git_status) {
            CURRENT_FILE_PENALTY / 2
        } else {
            CURRENT_FILE_PENALTY
        };
    }

    directory_bias(Some(current), &file.relative_path)
}

/// Directory-proximity bias relative to the caller's working directory,
/// used only for the empty-query ranking where there is no current-file
/// signal to bias against.
fn cwd_bias(file: &FileRecord, context: &ScoringContext) -> i32 {
    directory_bias(context.cwd, &file.relative_path)
}

fn frecency_bonus(file: &FileRecord) -> i32 {
    (file.total_frecency_score as i32).saturating_mul(FREQUENCY_WEIGHT_PERCENT) / 100
}

/// One scored candidate plus the tie-break field (`relative_path`) that
/// doesn't belong on the public [`ScoredResult`].
struct Candidate {
    result: ScoredResult,
    relative_path: String,
}

/// Scores and ranks a set of files against a query: a short-circuit to
/// frecency-only ordering for empty/too-short queries, a `neo_frizbee`
/// fuzzy pass otherwise, then a component sum with `saturating_add`
/// throughout.
pub fn match_and_score_files(
    files: &[FileRecord],
    context: &ScoringContext,
) -> (Vec<ScoredResult>, usize) {
    if files.is_empty() {
        return (Vec::new(), 0);
    }

    let candidates: Vec<Candidate> = if context.query.trim().len() < 2 {
        score_all_by_frecency(files, context)
    } else {
        score_all_by_fuzzy(files, context)
    };

    let total_matched = candidates.len();
    (top_k(candidates, context.max_results), total_matched)
}

fn score_all_by_fuzzy(files: &[FileRecord], context: &ScoringContext) -> Vec<Candidate> {
    let haystack: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
    let matches = fuzzy::match_many_parallel(
        context.query,
        &haystack,
        context.max_typos,
        context.max_threads,
        0,
    );

    matches
        .into_par_iter()
        .map(|(idx, m)| {
            let file = &files[idx];

            let components = ComponentScores {
                fuzzy: m.score,
                path_bonus: path_bonus(file, context.query),
                frecency: frecency_bonus(file),
                git: git_status_bonus(file.git_status),
                current_file: current_file_bonus(file, context),
            };

            let total = components
                .fuzzy
                .saturating_add(components.path_bonus)
                .saturating_add(components.frecency)
                .saturating_add(components.git)
                .saturating_add(components.current_file);

            Candidate {
                result: ScoredResult {
                    index_id: file.index_id,
                    total_score: total,
                    fuzzy_match_positions: m.positions,
                    component_scores: components,
                },
                relative_path: file.relative_path.clone(),
            }
        })
        .collect()
}

/// Empty-query ranking: fuzzy is omitted, ranking is by
/// `frecency_bonus + current-directory bias + mtime`, reversed so the most
/// recently touched files surface first. The directory bias here keys off
/// `cwd` rather than `current_file` — there's no focused file to bias
/// against when the query is empty, just a working directory to favor.
fn score_all_by_frecency(files: &[FileRecord], context: &ScoringContext) -> Vec<Candidate> {
    files
        .par_iter()
        .map(|file| {
            let components = ComponentScores {
                fuzzy: 0,
                path_bonus: cwd_bias(file, context),
                frecency: frecency_bonus(file),
                git: git_status_bonus(file.git_status),
                current_file: current_file_bonus(file, context),
            };

            let mtime_bonus = (file.modified_at % 1_000_000) as i32 / 10_000;
            let total = components
                .frecency
                .saturating_add(components.path_bonus)
                .saturating_add(components.git)
                .saturating_add(components.current_file)
                .saturating_add(mtime_bonus);

            Candidate {
                result: ScoredResult {
                    index_id: file.index_id,
                    total_score: total,
                    fuzzy_match_positions: Vec::new(),
                    component_scores: components,
                },
                relative_path: file.relative_path.clone(),
            }
        })
        .collect()
}

/// Bounded min-heap top-K selection: push every scored candidate, evicting
/// the current worst (by total score, then fuzzy score, then shorter path,
/// then lexicographically smaller path, then lower `index_id`) once the
/// heap exceeds `max_results`, then drain in descending order. Avoids a
/// full sort over every candidate.
fn top_k(candidates: Vec<Candidate>, max_results: usize) -> Vec<ScoredResult> {
    if max_results == 0 || candidates.is_empty() {
        return Vec::new();
    }

    let mut heap: BinaryHeap<std::cmp::Reverse<(i32, i32, std::cmp::Reverse<usize>, std::cmp::Reverse<String>, std::cmp::Reverse<u32>, usize)>> =
        BinaryHeap::with_capacity(max_results + 1);
    let mut pool: Vec<Option<Candidate>> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let key = (
            candidate.result.total_score,
            candidate.result.component_scores.fuzzy,
            std::cmp::Reverse(candidate.relative_path.len()),
            std::cmp::Reverse(candidate.relative_path.clone()),
            std::cmp::Reverse(candidate.result.index_id),
            pool.len(),
        );
        pool.push(Some(candidate));
        heap.push(std::cmp::Reverse(key));

        if heap.len() > max_results {
            if let Some(std::cmp::Reverse((.., worst_idx))) = heap.pop() {
                pool[worst_idx] = None;
            }
        }
    }

    // `heap` holds `Reverse<K>` entries; `into_sorted_vec()` returns them in
    // ascending `Reverse<K>` order, which is descending `K` order — best
    // candidate first. No further reversal needed.
    let ordered: Vec<_> = heap.into_sorted_vec();

    ordered
        .into_iter()
        .filter_map(|std::cmp::Reverse((.., idx))| pool[idx].take().map(|c| c.result))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileRecord;
    use std::path::PathBuf;

    fn make_file(index_id: u32, relative_path: &str) -> FileRecord {
        let mut f = FileRecord::new(index_id, PathBuf::from(relative_path), std::path::Path::new(""));
        f.relative_path = relative_path.to_string();
        f.name = PathBuf::from(relative_path)
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        f
    }

    #[test]
    fn git_status_bonus_follows_the_documented_order() {
        assert!(git_status_bonus(GitStatus::Modified) > git_status_bonus(GitStatus::Added));
        assert!(git_status_bonus(GitStatus::Added) > git_status_bonus(GitStatus::Untracked));
        assert!(git_status_bonus(GitStatus::Untracked) > git_status_bonus(GitStatus::Renamed));
        assert!(git_status_bonus(GitStatus::Renamed) > git_status_bonus(GitStatus::Conflicted));
        assert!(git_status_bonus(GitStatus::Conflicted) > git_status_bonus(GitStatus::Clean));
        assert!(git_status_bonus(GitStatus::Clean) > git_status_bonus(GitStatus::Deleted));
        assert!(git_status_bonus(GitStatus::Deleted) > git_status_bonus(GitStatus::Ignored));
    }

    #[test]
    fn top_k_respects_max_results() {
        let files = vec![
            make_file(1, "src/main.rs"),
            make_file(2, "src/lib.rs"),
            make_file(3, "src/mainline.rs"),
        ];
        let context = ScoringContext {
            query: "main",
            max_typos: 1,
            max_threads: 2,
            max_results: 1,
            current_file: None,
            cwd: None,
        };

        let (results, total_matched) = match_and_score_files(&files, &context);
        assert_eq!(results.len(), 1);
        assert!(total_matched >= 1);
    }

    #[test]
    fn empty_query_ranks_by_frecency() {
        let mut files = vec![make_file(1, "a.rs"), make_file(2, "b.rs")];
        files[1].total_frecency_score = 50;

        let context = ScoringContext {
            query: "",
            max_typos: 0,
            max_threads: 2,
            max_results: 10,
            current_file: None,
            cwd: None,
        };

        let (results, _) = match_and_score_files(&files, &context);
        assert_eq!(results[0].index_id, 2);
    }

    #[test]
    fn current_file_is_heavily_deranked() {
        let files = vec![make_file(1, "src/main.rs")];
        let context = ScoringContext {
            query: "main",
            max_typos: 1,
            max_threads: 2,
            max_results: 10,
            current_file: Some("src/main.rs"),
            cwd: None,
        };

        let (results, _) = match_and_score_files(&files, &context);
        assert!(results[0].component_scores.current_file < 0);
    }
}
