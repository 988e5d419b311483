use std::fmt;
use std::path::{Path, PathBuf};

use crate::probe::{self, Hook, ProbeLink};

/// What a probe is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    Interface(u32),
    Cgroup,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Interface(if_index) => write!(f, "{if_index}"),
            Target::Cgroup => f.write_str("cgroup"),
        }
    }
}

/// Identifies a handle: target plus layer and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleKey {
    pub target: Target,
    pub hook: Hook,
}

impl fmt::Display for HandleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.target, self.hook)
    }
}

/// One active probe attachment.
pub struct HookHandle {
    key: HandleKey,
    netns: Option<PathBuf>,
    link: Option<Box<dyn ProbeLink>>,
}

impl HookHandle {
    /// # Arguments
    ///
    /// * `netns` - Namespace the attachment was made in, `None` for the host namespace.
    pub fn new(key: HandleKey, netns: Option<PathBuf>, link: Box<dyn ProbeLink>) -> Self {
        Self {
            key,
            netns,
            link: Some(link),
        }
    }

    pub fn key(&self) -> HandleKey {
        self.key
    }

    pub fn netns(&self) -> Option<&Path> {
        self.netns.as_deref()
    }

    pub fn is_attached(&self) -> bool {
        self.link.is_some()
    }

    /// Detaches the probe. Returns `Ok(false)` if it was already released.
    ///
    /// The handle counts as released even when the detach fails.
    pub fn release(&mut self) -> probe::Result<bool> {
        match self.link.take() {
            Some(link) => link.detach().map(|()| true),
            None => Ok(false),
        }
    }
}

impl fmt::Debug for HookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookHandle")
            .field("key", &self.key)
            .field("netns", &self.netns)
            .field("attached", &self.is_attached())
            .finish()
    }
}
