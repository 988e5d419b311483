use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::container::{ContainerID, RunningContainer};

use super::sysfs::HostVeth;

/// Interface index of the loopback device in every namespace.
pub const LOOPBACK_IFINDEX: u32 = 1;
/// Binding key of the synthetic loopback entry.
pub const LOOPBACK_KEY: &str = "host_lo";
/// Binding key of the synthetic default-bridge entry.
pub const BRIDGE_KEY: &str = "docker0";

const LOOPBACK_ID: &str = "host";
const BRIDGE_ID: &str = "docker0";

/// Which side of a veth pair an interface is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Host,
    Container,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Host => f.write_str("host"),
            Location::Container => f.write_str("container"),
        }
    }
}

/// The namespace an interface lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Namespace {
    Host,
    Container { id: ContainerID, netns: PathBuf },
}

/// One endpoint of a veth pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceRecord {
    pub if_index: u32,
    pub peer_index: u32,
    pub name: Arc<str>,
    pub namespace: Namespace,
}

/// Container identity bound to one interface index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerBinding {
    /// `host:<name>`, `container:<name>`, or the key of a synthetic binding.
    pub key: Arc<str>,
    pub container_id: Arc<str>,
    /// Namespace handle to enter before touching this interface; `None` for host interfaces.
    pub netns: Option<PathBuf>,
    synthetic: bool,
}

impl ContainerBinding {
    pub fn location(&self) -> Location {
        if self.netns.is_some() {
            Location::Container
        } else {
            Location::Host
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }
}

/// What an interface index resolves to. Unknown indices resolve to empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolved {
    pub container_name: Arc<str>,
    pub container_id: Arc<str>,
    pub veth_name: Arc<str>,
}

/// Immutable snapshot of one discovery pass.
///
/// Built once through [`BindingsBuilder`] and afterwards only read, so it can be shared by
/// reference without locking.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    records: Vec<InterfaceRecord>,
    by_index: BTreeMap<u32, ContainerBinding>,
    names: BTreeMap<u32, Arc<str>>,
}

impl Bindings {
    pub fn builder() -> BindingsBuilder {
        BindingsBuilder::default()
    }

    /// All recorded veth endpoints, host side first in discovery order.
    pub fn records(&self) -> &[InterfaceRecord] {
        &self.records
    }

    pub fn get(&self, if_index: u32) -> Option<&ContainerBinding> {
        self.by_index.get(&if_index)
    }

    /// Bound interfaces ordered by index.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &ContainerBinding)> {
        self.by_index.iter().map(|(idx, binding)| (*idx, binding))
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }

    /// Number of bindings produced by discovery, i.e. excluding the synthetic ones.
    pub fn discovered_len(&self) -> usize {
        self.by_index.values().filter(|b| !b.synthetic).count()
    }

    pub fn interface_name(&self, if_index: u32) -> Option<&Arc<str>> {
        self.names.get(&if_index)
    }

    /// Resolves an interface index to the identity columns of a stat record.
    pub fn resolve(&self, if_index: u32) -> Resolved {
        let binding = self.by_index.get(&if_index);
        Resolved {
            container_name: binding.map(|b| Arc::clone(&b.key)).unwrap_or_default(),
            container_id: binding
                .map(|b| Arc::clone(&b.container_id))
                .unwrap_or_default(),
            veth_name: self.names.get(&if_index).cloned().unwrap_or_default(),
        }
    }
}

/// Accumulates a discovery pass into a [`Bindings`] snapshot.
#[derive(Debug, Default)]
pub struct BindingsBuilder {
    inner: Bindings,
}

impl BindingsBuilder {
    /// Records a host-side veth endpoint. It stays in the topology even if no container claims it.
    pub fn record_host_veth(&mut self, veth: &HostVeth) -> &mut Self {
        let name: Arc<str> = veth.name.as_str().into();
        self.inner.names.insert(veth.if_index, Arc::clone(&name));
        self.inner.records.push(InterfaceRecord {
            if_index: veth.if_index,
            peer_index: veth.peer_index,
            name,
            namespace: Namespace::Host,
        });
        self
    }

    /// Binds both ends of a veth pair to `container`.
    ///
    /// `container_link` is the interface found inside the container namespace at `netns` whose
    /// index equals the host endpoint's peer index.
    pub fn bind_pair(
        &mut self,
        container: &RunningContainer,
        host: &HostVeth,
        container_link: &str,
        netns: &Path,
    ) -> &mut Self {
        let id = container.id.to_arc();
        let link_name: Arc<str> = container_link.into();

        self.inner.by_index.insert(
            host.if_index,
            ContainerBinding {
                key: format!("{}:{}", Location::Host, container.name).into(),
                container_id: Arc::clone(&id),
                netns: None,
                synthetic: false,
            },
        );
        self.inner.by_index.insert(
            host.peer_index,
            ContainerBinding {
                key: format!("{}:{}", Location::Container, container.name).into(),
                container_id: id,
                netns: Some(netns.to_path_buf()),
                synthetic: false,
            },
        );
        self.inner
            .names
            .insert(host.peer_index, Arc::clone(&link_name));
        self.inner.records.push(InterfaceRecord {
            if_index: host.peer_index,
            peer_index: host.if_index,
            name: link_name,
            namespace: Namespace::Container {
                id: container.id.clone(),
                netns: netns.to_path_buf(),
            },
        });
        self
    }

    /// Installs the loopback and default-bridge bindings. They replace any discovered binding on
    /// the same index.
    pub fn seed_synthetic(
        &mut self,
        bridge_index: u32,
        name_of: impl Fn(u32) -> Option<String>,
    ) -> &mut Self {
        for (if_index, key, id) in [
            (LOOPBACK_IFINDEX, LOOPBACK_KEY, LOOPBACK_ID),
            (bridge_index, BRIDGE_KEY, BRIDGE_ID),
        ] {
            let name = name_of(if_index).unwrap_or_else(|| format!("iface={if_index}"));
            self.inner.names.insert(if_index, name.into());
            self.inner.by_index.insert(
                if_index,
                ContainerBinding {
                    key: key.into(),
                    container_id: id.into(),
                    netns: None,
                    synthetic: true,
                },
            );
        }
        self
    }

    pub fn build(self) -> Bindings {
        self.inner
    }
}
