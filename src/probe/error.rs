use std::path::PathBuf;

use super::Hook;

/// Errors that may occur while loading, attaching or reading probes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load probe object `{path}`: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: aya::EbpfError,
    },
    #[error("probe object has no program `{0}`")]
    MissingProgram(&'static str),
    #[error("probe object has no map `{0}`")]
    MissingMap(&'static str),
    #[error("hook {hook} cannot be attached to {target}")]
    Unsupported { hook: Hook, target: &'static str },
    #[error("probe program `{name}` failed: {source}")]
    Program {
        name: &'static str,
        #[source]
        source: aya::programs::ProgramError,
    },
    #[error("failed to open cgroup `{path}`: {source}")]
    Cgroup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("counter map `{name}` failed: {source}")]
    Map {
        name: &'static str,
        #[source]
        source: aya::maps::MapError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
