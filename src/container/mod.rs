use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

mod error;

pub use error::{Error, Result};

/// The maximum allowed length for a [`ContainerID`].
const CONTAINER_ID_MAX_LEN: usize = 255;

/// Number of characters shown when a container id is abbreviated in diagnostics.
const SHORT_ID_LEN: usize = 9;

/// A validated container identifier as assigned by the container runtime.
///
/// # Examples
///
/// ```
/// # use creo_netmon::container::ContainerID;
/// let id = ContainerID::new("4f1c2a9be07d").unwrap();
/// assert_eq!(id.as_ref(), "4f1c2a9be07d");
/// assert_eq!(id.short(), "4f1c2a9be");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerID(Arc<str>);

impl ContainerID {
    /// Creates a new `ContainerID` from the given raw id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerID`] if the input is empty or longer than
    /// [`CONTAINER_ID_MAX_LEN`].
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        if src.is_empty() || src.len() > CONTAINER_ID_MAX_LEN {
            return Err(Error::InvalidContainerID(src.to_owned()));
        }

        Ok(Self(src.into()))
    }

    /// Returns the id cut to its first few characters, the way `docker ps` shows it.
    pub fn short(&self) -> &str {
        short_id(&self.0)
    }

    pub fn to_arc(&self) -> Arc<str> {
        Arc::clone(&self.0)
    }
}

impl FromStr for ContainerID {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ContainerID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContainerID {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cuts a raw container id to the abbreviated form used in diagnostics.
pub fn short_id(id: &str) -> &str {
    id.char_indices()
        .nth(SHORT_ID_LEN)
        .map_or(id, |(end, _)| &id[..end])
}

/// A running container: who it is and which process anchors its namespaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningContainer {
    pub id: ContainerID,
    /// Human readable name, verbatim as reported by the runtime (Docker prefixes a `/`).
    pub name: String,
    /// Host PID of the container's init process.
    pub pid: u32,
}
