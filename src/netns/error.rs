use std::path::PathBuf;

/// Errors that may occur while entering or inspecting network namespaces.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open network namespace `{path}`: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to switch to network namespace `{path}`: {source}")]
    Switch {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },
    #[error("failed to list network interfaces: {0}")]
    ListLinks(#[source] nix::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
