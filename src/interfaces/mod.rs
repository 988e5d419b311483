//! Interface discovery: which virtual interface belongs to which container.
//!
//! Host-side veth endpoints are read from sysfs, running containers come from the
//! [`ContainerRuntime`](crate::runtime::ContainerRuntime), and each container's network namespace
//! is walked to find the peer endpoint of a host veth. The result is an immutable [`Bindings`]
//! snapshot that the attachment manager and the counter extractor read from.
mod bindings;
mod mapper;
mod sysfs;

pub use bindings::{
    BRIDGE_KEY, Bindings, BindingsBuilder, ContainerBinding, InterfaceRecord, LOOPBACK_IFINDEX,
    LOOPBACK_KEY, Location, Namespace, Resolved,
};
pub use mapper::InterfaceMapper;
pub use sysfs::{HostVeth, scan_host_veths};
