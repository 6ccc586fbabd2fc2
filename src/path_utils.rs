const SAME_DIRECTORY_BONUS: i32 = 8;
const MAX_DISTANCE_PENALTY: i32 = -20;

/// Path-proximity bias relative to the currently focused file.
///
/// Files in the same directory as the focused file get a moderate positive
/// bias; everything else gets a penalty that grows with directory distance,
/// capped so a deeply unrelated file never dominates a weak fuzzy match.
pub fn directory_bias(current_file: Option<&str>, candidate_path: &str) -> i32 {
    let Some(current_path) = current_file else {
        return 0;
    };

    let current_dir = std::path::Path::new(current_path)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let candidate_dir = std::path::Path::new(candidate_path)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    if current_dir == candidate_dir {
        return SAME_DIRECTORY_BONUS;
    }

    let current_parts: Vec<&str> = current_dir
        .split(std::path::MAIN_SEPARATOR)
        .filter(|s| !s.is_empty())
        .collect();
    let candidate_parts: Vec<&str> = candidate_dir
        .split(std::path::MAIN_SEPARATOR)
        .filter(|s| !s.is_empty())
        .collect();

    let common_len = current_parts
        .iter()
        .zip(candidate_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let current_depth_from_common = current_parts.len() - common_len;
    let candidate_depth_from_common = candidate_parts.len() - common_len;
    let total_distance = current_depth_from_common + candidate_depth_from_common;

    if total_distance == 0 {
        return SAME_DIRECTORY_BONUS;
    }

    (-(total_distance as i32 * 2)).max(MAX_DISTANCE_PENALTY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn no_current_file_means_no_bias() {
        let other_path = Path::new("path").join("to").join("file.txt");
        assert_eq!(directory_bias(None, other_path.to_str().unwrap()), 0);
    }

    #[test]
    fn same_directory_is_bonused() {
        let base_path = Path::new("path").join("to").join("current");
        let current_path = base_path.join("file.txt");
        let other_path = base_path.join("other.txt");
        assert_eq!(
            directory_bias(
                Some(current_path.to_str().unwrap()),
                other_path.to_str().unwrap()
            ),
            SAME_DIRECTORY_BONUS
        );
    }

    #[test]
    fn sibling_directory_is_penalized() {
        let base_path = Path::new("path").join("to");
        let current_path = base_path.join("current").join("file.txt");
        let other_path = base_path.join("file.txt");
        assert_eq!(
            directory_bias(
                Some(current_path.to_str().unwrap()),
                other_path.to_str().unwrap()
            ),
            -2
        );
    }

    #[test]
    fn cousin_directory_penalty_grows() {
        let base_path = Path::new("path").join("to");
        let current_path = base_path.join("current").join("file.txt");
        let other_path = base_path.join("other").join("file.txt");
        assert_eq!(
            directory_bias(
                Some(current_path.to_str().unwrap()),
                other_path.to_str().unwrap()
            ),
            -4
        );
    }

    #[test]
    fn deeper_divergence_penalizes_more() {
        let base_path = Path::new("path").join("to");
        let current_path = base_path.join("current").join("file.txt");
        let other_path = base_path.join("another").join("dir").join("file.txt");
        assert_eq!(
            directory_bias(
                Some(current_path.to_str().unwrap()),
                other_path.to_str().unwrap()
            ),
            -6
        );
    }

    #[test]
    fn penalty_is_capped() {
        let current_path = Path::new("a").join("b").join("c").join("d").join("file.txt");
        let other_path = Path::new("x").join("y").join("z").join("w").join("file.txt");
        assert_eq!(
            directory_bias(
                Some(current_path.to_str().unwrap()),
                other_path.to_str().unwrap()
            ),
            -16
        );
    }

    #[test]
    fn files_at_root_are_same_directory() {
        let current_path = Path::new("file1.txt").to_str().unwrap();
        let other_path = Path::new("file2.txt").to_str().unwrap();
        assert_eq!(
            directory_bias(Some(current_path), other_path),
            SAME_DIRECTORY_BONUS
        );
    }
}
