use std::path::MAIN_SEPARATOR;

/// Result of matching one haystack string against one query.
#[derive(Debug, Clone)]
pub struct FuzzyMatch {
    pub score: i32,
    pub positions: Vec<u32>,
    pub exact: bool,
}

fn neo_frizbee_options(max_typos: u16) -> neo_frizbee::Options {
    neo_frizbee::Options {
        prefilter: true,
        max_typos: Some(max_typos),
        sort: false,
    }
}

/// Matches a single query against a single haystack, applying the
/// configured minimum-score cutoff. Returns `None` both for "no match" and
/// for "matched, but below the cutoff" — these are indistinguishable to
/// callers.
pub fn match_one(query: &str, haystack: &str, max_typos: u16, min_score: i32) -> Option<FuzzyMatch> {
    if query.contains(MAIN_SEPARATOR) || query.contains('/') {
        return match_path_pieces(query, haystack, max_typos, min_score);
    }

    let options = neo_frizbee_options(max_typos);
    let matched = neo_frizbee::match_list(query, &[haystack], options);
    let m = matched.into_iter().next()?;

    if (m.score as i32) < min_score {
        return None;
    }

    Some(FuzzyMatch {
        score: m.score as i32,
        positions: m.indices.iter().map(|&i| i as u32).collect(),
        exact: m.exact,
    })
}

/// Batch variant over many haystacks, used by the scorer to match a query
/// against the whole relative-path index at once.
pub fn match_many_parallel(
    query: &str,
    haystacks: &[&str],
    max_typos: u16,
    max_threads: usize,
    min_score: i32,
) -> Vec<(usize, FuzzyMatch)> {
    if query.is_empty() || haystacks.is_empty() {
        return Vec::new();
    }

    if query.contains(MAIN_SEPARATOR) || query.contains('/') {
        return haystacks
            .iter()
            .enumerate()
            .filter_map(|(idx, hay)| {
                match_path_pieces(query, hay, max_typos, min_score).map(|m| (idx, m))
            })
            .collect();
    }

    let options = neo_frizbee_options(max_typos);
    let matches = neo_frizbee::match_list_parallel(query, haystacks, options, max_threads);

    matches
        .into_iter()
        .filter(|m| (m.score as i32) >= min_score)
        .map(|m| {
            (
                m.index_in_haystack as usize,
                FuzzyMatch {
                    score: m.score as i32,
                    positions: m.indices.iter().map(|&i| i as u32).collect(),
                    exact: m.exact,
                },
            )
        })
        .collect()
}

/// Splits the query on `/` and matches each piece against path segments
/// from right to left, each piece confined to one segment; the overall
/// score is the sum of per-piece scores plus a boundary bonus.
const PATH_PIECE_BOUNDARY_BONUS: i32 = 4;

fn match_path_pieces(query: &str, haystack: &str, max_typos: u16, min_score: i32) -> Option<FuzzyMatch> {
    let pieces: Vec<&str> = query.split(['/', MAIN_SEPARATOR]).filter(|p| !p.is_empty()).collect();
    if pieces.is_empty() {
        return None;
    }

    let segments: Vec<&str> = haystack
        .split(['/', MAIN_SEPARATOR])
        .filter(|p| !p.is_empty())
        .collect();
    if segments.is_empty() || pieces.len() > segments.len() {
        return None;
    }

    let options = neo_frizbee_options(max_typos);
    let mut total_score = 0i32;
    let mut positions = Vec::new();
    let mut exact = true;

    // Walk both the query pieces and the haystack segments from the right,
    // each piece confined to the segment it lines up with.
    let mut segment_cursor = segments.len();
    for piece in pieces.iter().rev() {
        segment_cursor -= 1;
        let segment = segments[segment_cursor];

        let matched = neo_frizbee::match_list(piece, &[segment], options)
            .into_iter()
            .next()?;

        total_score = total_score.saturating_add(matched.score as i32);
        exact &= matched.exact;

        let segment_byte_offset: u32 = segments[..segment_cursor]
            .iter()
            .map(|s| s.len() as u32 + 1)
            .sum();
        positions.extend(
            matched
                .indices
                .iter()
                .map(|&i| segment_byte_offset + i as u32),
        );
    }

    total_score = total_score.saturating_add(PATH_PIECE_BOUNDARY_BONUS);

    if total_score < min_score {
        return None;
    }

    Some(FuzzyMatch {
        score: total_score,
        positions,
        exact,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_query_matches_and_scores_positively() {
        let m = match_one("main", "src/main.rs", 0, 0).unwrap();
        assert!(m.score > 0);
    }

    #[test]
    fn below_cutoff_is_rejected() {
        assert!(match_one("zzz", "src/main.rs", 0, 0).is_none());
    }

    #[test]
    fn path_piece_query_matches_right_to_left() {
        let m = match_one("src/main", "project/src/main.rs", 0, 0).unwrap();
        assert!(m.score > 0);
    }

    #[test]
    fn path_piece_query_fails_when_more_pieces_than_segments() {
        assert!(match_one("a/b/c/d", "a/b.rs", 0, 0).is_none());
    }

    #[test]
    fn batch_matching_returns_every_acceptable_haystack() {
        let haystacks = ["src/main.rs", "src/lib.rs", "README.md"];
        let results = match_many_parallel("main", &haystacks, 0, 1, 0);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 0);
    }
}
