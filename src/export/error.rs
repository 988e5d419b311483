use std::path::PathBuf;

/// Errors that may occur while exporting a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no record set given to export")]
    MissingRecords,
    #[error("invalid export worker count {0}, expected 1 to {max}", max = super::MAX_WORKERS)]
    InvalidWorkerCount(usize),
    #[error("failed to create `{path}`: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write `{path}`: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("export task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("wrote {written} rows for {expected} records")]
    RowCountMismatch { expected: usize, written: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
