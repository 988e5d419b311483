use crate::probe::Hook;
use crate::{mountinfo, netns, probe};

use super::HandleKey;

/// Why a single attachment failed.
#[derive(Debug, thiserror::Error)]
pub enum FailureCause {
    #[error(transparent)]
    Namespace(#[from] netns::Error),
    #[error(transparent)]
    Probe(#[from] probe::Error),
    #[error("interface {0} has no known name")]
    UnnamedInterface(u32),
}

/// One failed attachment inside an otherwise completed sweep.
#[derive(Debug, thiserror::Error)]
#[error("{key}: {cause}")]
pub struct AttachFailure {
    pub key: HandleKey,
    #[source]
    pub cause: FailureCause,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no usable cgroup v2 root for {hook}: {source}")]
    CgroupRoot {
        hook: Hook,
        #[source]
        source: mountinfo::Error,
    },
    #[error("failed to seed counter table of {hook}: {source}")]
    Seed {
        hook: Hook,
        #[source]
        source: probe::Error,
    },
    #[error("{hook}: {attached} attached, {} failed", .failures.len())]
    PartialFailure {
        hook: Hook,
        attached: usize,
        failures: Vec<AttachFailure>,
    },
}

impl Error {
    /// Whether the hook layer as a whole is unusable, as opposed to some of its targets.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::PartialFailure { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
