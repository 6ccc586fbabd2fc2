use crate::error::Error;
use heed::{
    types::{Bytes, SerdeBincode},
    Database, Env, EnvFlags, EnvOpenOptions,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const SECONDS_PER_DAY: f64 = 86400.0;
/// Caps the retained timestamp list at a fixed small constant per entry.
const MAX_TRACKED_ACCESSES: usize = 10;
/// Weight for the `c · log(1 + access_count)` term in the frecency formula.
const ACCESS_COUNT_WEIGHT: f64 = 0.5;

const ACCESS_THRESHOLDS: [(i64, u64); 5] = [
    (12, 60 * 2),          // 2 minutes
    (6, 60 * 10),          // 10 minutes
    (4, 60 * 60),          // 1 hour
    (2, 60 * 60 * 24),     // 1 day
    (1, 60 * 60 * 24 * 7), // 1 week
];

/// Persisted access/count record for one path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedEntry {
    access_timestamps: VecDeque<u64>,
    access_count: u64,
}

#[derive(Debug)]
pub struct FrecencyTracker {
    env: Env,
    db: Database<Bytes, SerdeBincode<PersistedEntry>>,
    /// `τ` in `w(Δ) = ⌊base · exp(-Δ/τ)⌋`, derived from the configured
    /// half-life: `ln(2) / half_life_days`.
    decay_constant: f64,
    max_history_days: f64,
}

impl FrecencyTracker {
    pub fn new(
        db_path: &str,
        use_unsafe_no_lock: bool,
        decay_half_life_days: f64,
        max_history_days: f64,
    ) -> Result<Self, Error> {
        fs::create_dir_all(db_path).map_err(Error::CreateDir)?;
        let env = unsafe {
            let mut opts = EnvOpenOptions::new();
            if use_unsafe_no_lock {
                opts.flags(EnvFlags::NO_LOCK | EnvFlags::NO_SYNC | EnvFlags::NO_META_SYNC);
            }
            opts.open(db_path).map_err(Error::EnvOpen)?
        };
        env.clear_stale_readers()
            .map_err(Error::DbClearStaleReaders)?;

        let mut wtxn = env.write_txn().map_err(Error::DbStartWriteTxn)?;
        let db = env
            .create_database(&mut wtxn, None)
            .map_err(Error::DbCreate)?;
        wtxn.commit().map_err(Error::DbCommit)?;

        Ok(FrecencyTracker {
            db,
            env,
            decay_constant: std::f64::consts::LN_2 / decay_half_life_days,
            max_history_days,
        })
    }

    fn get_entry(&self, path: &Path) -> Result<Option<PersistedEntry>, Error> {
        let rtxn = self.env.read_txn().map_err(Error::DbStartReadTxn)?;
        let key_hash = Self::path_to_hash_bytes(path);
        self.db.get(&rtxn, &key_hash).map_err(Error::DbRead)
    }

    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn path_to_hash_bytes(path: &Path) -> [u8; 32] {
        *blake3::hash(path.to_string_lossy().as_bytes()).as_bytes()
    }

    /// Appends `now` to the path's access ring, evicting both entries older
    /// than `max_history_days` and entries beyond [`MAX_TRACKED_ACCESSES`].
    /// Writes are total-ordered per path — a heed write transaction already
    /// serializes this.
    pub fn track_access(&self, path: &Path) -> Result<(), Error> {
        let mut wtxn = self.env.write_txn().map_err(Error::DbStartWriteTxn)?;

        let key_hash = Self::path_to_hash_bytes(path);
        let mut entry = self.get_entry(path)?.unwrap_or_default();

        let now = self.now();
        let cutoff_time = now.saturating_sub((self.max_history_days * SECONDS_PER_DAY) as u64);
        while let Some(&front_time) = entry.access_timestamps.front() {
            if front_time < cutoff_time {
                entry.access_timestamps.pop_front();
            } else {
                break;
            }
        }
        while entry.access_timestamps.len() >= MAX_TRACKED_ACCESSES {
            entry.access_timestamps.pop_front();
        }

        entry.access_timestamps.push_back(now);
        entry.access_count = entry.access_count.saturating_add(1);

        self.db
            .put(&mut wtxn, &key_hash, &entry)
            .map_err(Error::DbWrite)?;
        wtxn.commit().map_err(Error::DbCommit)?;

        Ok(())
    }

    pub fn get_access_score(&self, path: &Path) -> i64 {
        let entry = self.get_entry(path).unwrap_or(None).unwrap_or_default();

        if entry.access_timestamps.is_empty() {
            return 0;
        }

        let now = self.now();
        let cutoff_time = now.saturating_sub((self.max_history_days * SECONDS_PER_DAY) as u64);

        let mut total_decay = 0.0;
        for &access_time in entry.access_timestamps.iter().rev() {
            if access_time < cutoff_time {
                break;
            }

            let days_ago = (now.saturating_sub(access_time) as f64) / SECONDS_PER_DAY;
            total_decay += (-self.decay_constant * days_ago).exp();
        }

        let normalized_decay = if total_decay <= 10.0 {
            total_decay
        } else {
            10.0 + (total_decay - 10.0).sqrt()
        };

        let count_bonus = ACCESS_COUNT_WEIGHT * (1.0 + entry.access_count as f64).ln();
        (normalized_decay + count_bonus).round().max(0.0) as i64
    }

    /// Alias over the access score; the modification score additionally
    /// needs git/mtime context the store itself doesn't hold, so it stays a
    /// separate call.
    pub fn score_for(&self, path: &Path) -> i64 {
        self.get_access_score(path)
    }

    /// A small recency bonus for files git already flags as touched.
    pub fn get_modification_score(&self, modified_time: u64, is_modified_in_git: bool) -> i64 {
        if !is_modified_in_git {
            return 0;
        }

        let now = self.now();
        let duration_since = now.saturating_sub(modified_time);

        for (base_points, threshold_seconds) in ACCESS_THRESHOLDS {
            if duration_since <= threshold_seconds {
                return base_points * 2;
            }
        }

        0
    }

    /// Truncates the store. Entries are otherwise never deleted by the core.
    pub fn clear(&self) -> Result<(), Error> {
        let mut wtxn = self.env.write_txn().map_err(Error::DbStartWriteTxn)?;
        self.db.clear(&mut wtxn).map_err(Error::DbWrite)?;
        wtxn.commit().map_err(Error::DbCommit)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculate_test_decay(access_timestamps: &[u64], current_time: u64) -> f64 {
        let mut total = 0.0;
        for &access_time in access_timestamps {
            let days_ago = (current_time.saturating_sub(access_time) as f64) / SECONDS_PER_DAY;
            total += (-(std::f64::consts::LN_2 / 10.0) * days_ago).exp();
        }
        total
    }

    #[test]
    fn decay_favors_recent_over_old_access() {
        let current_time = 1_000_000_000;

        assert_eq!(calculate_test_decay(&[], current_time), 0.0);

        let recent = calculate_test_decay(&[current_time], current_time);
        assert!((recent - 1.0).abs() < 1e-9);

        let ten_days_seconds = 10 * 86400;
        let ten_days_ago = calculate_test_decay(&[current_time - ten_days_seconds], current_time);
        assert!((ten_days_ago - 0.5).abs() < 0.01);

        let thirty_days_ago =
            calculate_test_decay(&[current_time - 30 * 86400], current_time);
        assert!(thirty_days_ago < ten_days_ago);
    }

    #[test]
    fn frequent_recent_access_beats_single_old_access() {
        let current_time = 1_000_000_000;
        let recent_frequent = calculate_test_decay(
            &[
                current_time,
                current_time - 86400,
                current_time - 172800,
            ],
            current_time,
        );
        let old_single =
            calculate_test_decay(&[current_time - 10 * 86400], current_time);

        assert!(recent_frequent > old_single);
    }

    #[test]
    fn track_access_then_score_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = FrecencyTracker::new(dir.path().to_str().unwrap(), false, 10.0, 30.0).unwrap();
        let path = Path::new("/repo/src/main.rs");

        assert_eq!(tracker.get_access_score(path), 0);
        tracker.track_access(path).unwrap();
        let score = tracker.get_access_score(path);
        assert!(score >= 1, "expected a positive score, got {score}");
    }

    #[test]
    fn access_ring_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = FrecencyTracker::new(dir.path().to_str().unwrap(), false, 10.0, 30.0).unwrap();
        let path = Path::new("/repo/src/main.rs");

        for _ in 0..(MAX_TRACKED_ACCESSES * 2) {
            tracker.track_access(path).unwrap();
        }

        let entry = tracker.get_entry(path).unwrap().unwrap();
        assert!(entry.access_timestamps.len() <= MAX_TRACKED_ACCESSES);
        assert_eq!(entry.access_count, (MAX_TRACKED_ACCESSES * 2) as u64);
    }

    #[test]
    fn clear_resets_scores() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = FrecencyTracker::new(dir.path().to_str().unwrap(), false, 10.0, 30.0).unwrap();
        let path = Path::new("/repo/src/main.rs");

        tracker.track_access(path).unwrap();
        assert!(tracker.get_access_score(path) > 0);

        tracker.clear().unwrap();
        assert_eq!(tracker.get_access_score(path), 0);
    }

    #[test]
    fn modification_score_requires_git_signal() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = FrecencyTracker::new(dir.path().to_str().unwrap(), false, 10.0, 30.0).unwrap();
        let now = tracker.now();

        assert_eq!(tracker.get_modification_score(now, false), 0);
        assert_eq!(tracker.get_modification_score(now, true), 24);
    }
}
