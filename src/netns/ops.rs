use std::path::Path;

use super::{Error, NetnsGuard, Result, run_pinned};

/// A network interface as seen from inside one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    pub index: u32,
    pub name: String,
}

/// Namespace operations the interface mapper and the attachment manager depend on.
pub trait NamespaceOps: Sync {
    /// Scoped membership returned by [`NamespaceOps::enter`]; dropping it restores the previous
    /// namespace.
    type Guard;

    /// Moves the calling thread into the namespace at `path`.
    fn enter(&self, path: &Path) -> Result<Self::Guard>;

    /// Lists the interfaces of the namespace at `path`, or of the caller's own namespace when
    /// `path` is `None`.
    fn links(&self, path: Option<&Path>) -> Result<Vec<LinkEntry>>;
}

/// [`NamespaceOps`] backed by `setns(2)` and `if_nameindex(3)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostNamespaces;

impl NamespaceOps for HostNamespaces {
    type Guard = NetnsGuard;

    fn enter(&self, path: &Path) -> Result<NetnsGuard> {
        NetnsGuard::enter(path)
    }

    fn links(&self, path: Option<&Path>) -> Result<Vec<LinkEntry>> {
        match path {
            None => list_links(),
            Some(path) => run_pinned(|| {
                let _guard = NetnsGuard::enter(path)?;
                list_links()
            }),
        }
    }
}

/// Lists the interfaces visible in the calling thread's current network namespace.
pub fn list_links() -> Result<Vec<LinkEntry>> {
    let interfaces = nix::net::if_::if_nameindex().map_err(Error::ListLinks)?;
    Ok(interfaces
        .iter()
        .map(|iface| LinkEntry {
            index: iface.index(),
            name: iface.name().to_string_lossy().into_owned(),
        })
        .collect())
}
