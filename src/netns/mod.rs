//! Network namespace switching.
//!
//! A network namespace is per-thread kernel state: `setns(2)` only affects the calling thread.
//! Everything that switches namespaces therefore runs through [`run_pinned`] on a dedicated
//! thread, and the switch itself is a [`NetnsGuard`] that restores the previous namespace when it
//! goes out of scope.
mod error;
mod guard;
mod ops;

pub use error::{Error, Result};
pub use guard::{NetnsGuard, run_pinned};
pub use ops::{HostNamespaces, LinkEntry, NamespaceOps, list_links};
