use std::path::PathBuf;

use crate::error::ResultOkLogExt;
use crate::netns::{LinkEntry, NamespaceOps};
use crate::runtime::ContainerRuntime;

use super::bindings::{Bindings, BindingsBuilder};
use super::sysfs::{HostVeth, scan_host_veths};

/// Builds the interface → container tables from sysfs, the container runtime and the containers'
/// network namespaces.
pub struct InterfaceMapper<'a, R, N> {
    rootfs: PathBuf,
    bridge_index: u32,
    runtime: &'a R,
    namespaces: &'a N,
}

impl<'a, R, N> InterfaceMapper<'a, R, N>
where
    R: ContainerRuntime,
    N: NamespaceOps,
{
    /// # Arguments
    ///
    /// * `rootfs` - Prefix under which the host's `/sys` and `/proc` are visible.
    /// * `bridge_index` - Interface index that receives the synthetic bridge binding.
    pub fn new(
        rootfs: impl Into<PathBuf>,
        bridge_index: u32,
        runtime: &'a R,
        namespaces: &'a N,
    ) -> Self {
        Self {
            rootfs: rootfs.into(),
            bridge_index,
            runtime,
            namespaces,
        }
    }

    /// Runs one discovery pass.
    ///
    /// Never fails as a whole: an unreadable interface, a runtime that cannot be queried or a
    /// container namespace that cannot be entered only shrinks the result. The loopback and
    /// bridge bindings are always present.
    ///
    /// Listing a container's links blocks the calling thread until the pinned namespace thread
    /// returns.
    pub async fn discover(&self) -> Bindings {
        let mut builder = Bindings::builder();

        let veths = scan_host_veths(self.rootfs.join("sys/class/net"));
        log::debug!("Found {} host veth interfaces", veths.len());
        for veth in &veths {
            builder.record_host_veth(veth);
        }

        let containers = self
            .runtime
            .running_containers()
            .await
            .ok_log()
            .unwrap_or_default();
        log::debug!("Found {} running containers", containers.len());
        let mut claimed = vec![false; veths.len()];
        for container in &containers {
            let netns = self
                .rootfs
                .join(format!("proc/{}/ns/net", container.pid));
            let links = match self.namespaces.links(Some(&netns)) {
                Ok(links) => links,
                Err(err) => {
                    log::warn!(
                        "skipping container `{}` ({}): {}",
                        container.name,
                        container.id.short(),
                        err
                    );
                    continue;
                }
            };
            for link in links.iter().filter(|link| link.name != "lo") {
                bind_link(&mut builder, &veths, &mut claimed, container, link, &netns);
            }
        }

        let host_links = self.namespaces.links(None).ok_warn().unwrap_or_default();
        builder.seed_synthetic(self.bridge_index, |idx| {
            host_links
                .iter()
                .find(|link| link.index == idx)
                .map(|link| link.name.clone())
        });

        let bindings = builder.build();
        log_bindings(&bindings);
        bindings
    }
}

fn bind_link(
    builder: &mut BindingsBuilder,
    veths: &[HostVeth],
    claimed: &mut [bool],
    container: &crate::container::RunningContainer,
    link: &LinkEntry,
    netns: &std::path::Path,
) {
    let Some(pos) = veths.iter().position(|veth| veth.peer_index == link.index) else {
        return;
    };
    if claimed[pos] {
        log::warn!(
            "interface {}({}) of container `{}` matches already bound veth {}, keeping the first match",
            link.name,
            link.index,
            container.name,
            veths[pos].name
        );
        return;
    }
    claimed[pos] = true;
    log::debug!(
        "veth {}({}) <-> {}({}) in container `{}`",
        veths[pos].name,
        veths[pos].if_index,
        link.name,
        link.index,
        container.name
    );
    builder.bind_pair(container, &veths[pos], &link.name, netns);
}

fn log_bindings(bindings: &Bindings) {
    if bindings.discovered_len() == 0 {
        log::warn!("No container network interfaces (veth) were found");
    }

    log::info!("Interface to container mapping:");
    for (if_index, binding) in bindings.iter() {
        log::info!(
            "  interface {} ({}) -> {} {} ({})",
            if_index,
            bindings
                .interface_name(if_index)
                .map(|name| &**name)
                .unwrap_or(""),
            crate::container::short_id(&binding.container_id),
            binding.key,
            binding.location()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerID, RunningContainer};
    use crate::interfaces::sysfs::write_fake_veth;
    use crate::interfaces::{Location, Namespace};
    use crate::testing::{FakeNamespaces, FakeRuntime};

    fn container(id: &str, name: &str, pid: u32) -> RunningContainer {
        RunningContainer {
            id: ContainerID::new(id).unwrap(),
            name: name.to_owned(),
            pid,
        }
    }

    fn link(index: u32, name: &str) -> LinkEntry {
        LinkEntry {
            index,
            name: name.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_pairs_host_and_container_sides() {
        let rootfs = tempfile::tempdir().unwrap();
        let class_net = rootfs.path().join("sys/class/net");
        write_fake_veth(&class_net, "vethaaa", 12, 11);
        write_fake_veth(&class_net, "vethbbb", 14, 13);
        write_fake_veth(&class_net, "vethorphan", 20, 19);

        let runtime = FakeRuntime::new(vec![
            container("aaa111", "/web", 100),
            container("bbb222", "/db", 200),
        ]);
        let namespaces = FakeNamespaces::default()
            .with_host_links(vec![link(1, "lo"), link(6, "docker0")])
            .with_links(
                rootfs.path().join("proc/100/ns/net"),
                vec![link(1, "lo"), link(11, "eth0")],
            )
            .with_links(
                rootfs.path().join("proc/200/ns/net"),
                vec![link(1, "lo"), link(13, "eth0")],
            );

        let bindings = InterfaceMapper::new(rootfs.path(), 6, &runtime, &namespaces)
            .discover()
            .await;

        assert_eq!(bindings.discovered_len(), 4);
        assert_eq!(&*bindings.get(12).unwrap().key, "host:/web");
        assert_eq!(&*bindings.get(11).unwrap().key, "container:/web");
        assert_eq!(&*bindings.get(14).unwrap().key, "host:/db");
        assert_eq!(&*bindings.get(13).unwrap().container_id, "bbb222");
        assert!(bindings.get(20).is_none());
        assert_eq!(
            bindings.interface_name(20).map(|n| &**n),
            Some("vethorphan")
        );

        // every container-side binding has a host record whose peer is that index
        for (if_index, binding) in bindings.iter() {
            if binding.location() != Location::Container {
                continue;
            }
            assert!(bindings.records().iter().any(|record| {
                record.namespace == Namespace::Host && record.peer_index == if_index
            }));
        }
    }

    #[tokio::test]
    async fn test_no_containers_still_yields_synthetic_bindings() {
        let rootfs = tempfile::tempdir().unwrap();
        let runtime = FakeRuntime::new(Vec::new());
        let namespaces =
            FakeNamespaces::default().with_host_links(vec![link(1, "lo"), link(6, "docker0")]);

        let bindings = InterfaceMapper::new(rootfs.path(), 6, &runtime, &namespaces)
            .discover()
            .await;

        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings.discovered_len(), 0);
        assert_eq!(&*bindings.resolve(1).container_name, "host_lo");
        assert_eq!(&*bindings.resolve(6).veth_name, "docker0");
    }

    #[tokio::test]
    async fn test_unreachable_namespace_and_runtime_failures_are_skipped() {
        let rootfs = tempfile::tempdir().unwrap();
        let class_net = rootfs.path().join("sys/class/net");
        write_fake_veth(&class_net, "vethaaa", 12, 11);

        let runtime = FakeRuntime::new(vec![container("aaa111", "/web", 100)]);
        // no links registered for pid 100: entering its namespace fails
        let namespaces = FakeNamespaces::default();

        let bindings = InterfaceMapper::new(rootfs.path(), 6, &runtime, &namespaces)
            .discover()
            .await;
        assert_eq!(bindings.discovered_len(), 0);
        assert_eq!(bindings.records().len(), 1);

        let failing = FakeRuntime::failing();
        let bindings = InterfaceMapper::new(rootfs.path(), 6, &failing, &namespaces)
            .discover()
            .await;
        assert_eq!(bindings.len(), 2);
    }

    #[tokio::test]
    async fn test_first_container_claiming_a_veth_wins() {
        let rootfs = tempfile::tempdir().unwrap();
        write_fake_veth(&rootfs.path().join("sys/class/net"), "vethaaa", 12, 11);

        let runtime = FakeRuntime::new(vec![
            container("aaa111", "/first", 100),
            container("bbb222", "/second", 200),
        ]);
        let namespaces = FakeNamespaces::default()
            .with_links(rootfs.path().join("proc/100/ns/net"), vec![link(11, "eth0")])
            .with_links(rootfs.path().join("proc/200/ns/net"), vec![link(11, "eth0")]);

        let bindings = InterfaceMapper::new(rootfs.path(), 6, &runtime, &namespaces)
            .discover()
            .await;
        assert_eq!(&*bindings.get(12).unwrap().key, "host:/first");
    }
}
