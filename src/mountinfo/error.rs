use std::path::PathBuf;

use crate::fsutil;

/// Errors that may occur while reading a mount table or resolving the cgroup v2 root.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    FileOpen(#[from] fsutil::FileOpenError),
    #[error("failed to read mount table `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("mount table `{path}`, line {line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: super::parser::ParseError,
    },
    #[error("no cgroup v2 mount point listed in `{path}`")]
    MissingCgroup2Mount { path: PathBuf },
    #[error("cgroup v2 root `{path}` cannot be resolved: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cgroup v2 root `{path}` is not a directory")]
    NotADirectory { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;
