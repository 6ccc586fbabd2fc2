//! In-process file-picker core: indexing, typo-tolerant fuzzy search,
//! frecency, and git status, fronted by a single [`coordinator::Coordinator`]
//! façade.

pub mod background_watcher;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod frecency;
pub mod fuzzy;
pub mod git;
pub mod index;
pub mod path_utils;
pub mod score;
pub mod tracing_setup;
pub mod types;

pub use config::Config;
pub use coordinator::Coordinator;
pub use error::Error;
pub use types::{FileRecord, GitStatus, ScoredResult, SearchResult};
