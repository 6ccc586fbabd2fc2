use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Typed, serde/TOML-loadable configuration surface. Values default to the
/// same constants the scorer and frecency tracker otherwise hard-code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_path: String,
    pub max_results: usize,
    pub max_threads: usize,
    pub frecency: FrecencyConfig,
    pub logging: LoggingConfig,
    pub scoring: ScoringWeights,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_path: ".".to_string(),
            max_results: 100,
            max_threads: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            frecency: FrecencyConfig::default(),
            logging: LoggingConfig::default(),
            scoring: ScoringWeights::default(),
        }
    }
}

impl Config {
    pub fn load_from_toml(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::ConfigLoad(format!("reading {}: {e}", path.as_ref().display())))?;
        toml::from_str(&contents).map_err(|e| Error::ConfigLoad(format!("parsing toml: {e}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrecencyConfig {
    pub enabled: bool,
    pub db_path: String,
    pub use_unsafe_no_lock: bool,
    pub decay_half_life_days: f64,
    pub max_history_days: f64,
}

impl Default for FrecencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            db_path: ".cache/fff_core/frecency".to_string(),
            use_unsafe_no_lock: false,
            decay_half_life_days: 10.0,
            max_history_days: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `false` by default: a host opts in either by flipping this on in a
    /// loaded config, or by calling [`crate::coordinator::Coordinator::init_tracing`]
    /// directly with its own path/level.
    pub enabled: bool,
    pub log_file_path: String,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_file_path: ".cache/fff_core/fff_core.log".to_string(),
            level: "info".to_string(),
        }
    }
}

/// Tunable scoring constants, surfaced so a host can retune ranking without
/// a rebuild. `score.rs` currently uses its own private constants with the
/// same default values; wiring the scorer through this struct is tracked
/// as follow-up work, not yet done.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub filename_overlap_bonus: i32,
    pub extension_match_bonus: i32,
    pub depth_penalty_per_segment: i32,
    pub current_file_penalty: i32,
    pub frequency_weight_percent: i32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            filename_overlap_bonus: 30,
            extension_match_bonus: 10,
            depth_penalty_per_segment: -2,
            current_file_penalty: -1000,
            frequency_weight_percent: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert!(config.max_results > 0);
        assert!(config.max_threads > 0);
    }

    #[test]
    fn loads_from_toml_overriding_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fff_core.toml");
        std::fs::write(
            &path,
            r#"
            base_path = "/tmp/project"
            max_results = 50

            [frecency]
            decay_half_life_days = 5.0
            "#,
        )
        .unwrap();

        let config = Config::load_from_toml(&path).unwrap();
        assert_eq!(config.base_path, "/tmp/project");
        assert_eq!(config.max_results, 50);
        assert_eq!(config.frecency.decay_half_life_days, 5.0);
        assert_eq!(config.frecency.max_history_days, 30.0);
    }

    #[test]
    fn missing_file_is_a_config_load_error() {
        let result = Config::load_from_toml("/nonexistent/fff_core.toml");
        assert!(matches!(result, Err(Error::ConfigLoad(_))));
    }
}
