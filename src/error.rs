use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid base path: {0}")]
    InvalidBase(PathBuf),
    #[error("file picker not initialized")]
    NotInitialized,
    #[error("frecency database unavailable: {0}")]
    DbUnavailable(String),
    #[error("git status unavailable: {0}")]
    GitUnavailable(String),
    #[error("scan of base path failed: {0}")]
    ScanFailed(String),
    #[error("search cancelled by a newer query")]
    Cancelled,

    #[error("thread panicked")]
    ThreadPanic,
    #[error("failed to acquire lock for frecency tracker")]
    AcquireFrecencyLock,
    #[error("failed to acquire lock for index")]
    AcquireIndexLock,
    #[error("failed to create directory: {0}")]
    CreateDir(#[from] std::io::Error),
    #[error("failed to open frecency database environment: {0}")]
    EnvOpen(#[source] heed::Error),
    #[error("failed to create frecency database: {0}")]
    DbCreate(#[source] heed::Error),
    #[error("failed to clear stale readers for frecency database: {0}")]
    DbClearStaleReaders(#[source] heed::Error),
    #[error("failed to start read transaction for frecency database: {0}")]
    DbStartReadTxn(#[source] heed::Error),
    #[error("failed to start write transaction for frecency database: {0}")]
    DbStartWriteTxn(#[source] heed::Error),
    #[error("failed to read from frecency database: {0}")]
    DbRead(#[source] heed::Error),
    #[error("failed to write to frecency database: {0}")]
    DbWrite(#[source] heed::Error),
    #[error("failed to commit write transaction to frecency database: {0}")]
    DbCommit(#[source] heed::Error),
    #[error("failed to start filesystem watcher: {0}")]
    FileSystemWatch(#[from] notify::Error),
    #[error("failed to load config: {0}")]
    ConfigLoad(String),
}
