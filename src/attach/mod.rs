//! Installing and removing probes.
//!
//! [`AttachManager`] sweeps one hook at a time over every bound interface (or the cgroup v2 root
//! for the socket buffer layer) and keeps the resulting [`HookHandle`]s until teardown.
mod error;
mod handle;
mod manager;

pub use error::{AttachFailure, Error, FailureCause, Result};
pub use handle::{HandleKey, HookHandle, Target};
pub use manager::AttachManager;
