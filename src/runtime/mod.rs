//! Container runtime queries.
//!
//! The collector only needs to know which containers are running and which host process anchors
//! each one's network namespace. [`ContainerRuntime`] is that seam; [`DockerRuntime`] answers it
//! through the Docker Engine API on its unix socket.
mod docker;
mod error;
mod http;

pub use docker::{DEFAULT_DOCKER_SOCKET, DockerRuntime};
pub use error::{Error, Result};

use crate::container::RunningContainer;

pub trait ContainerRuntime {
    /// Lists running containers together with their init process id.
    ///
    /// Containers that cannot be inspected are left out rather than failing the whole listing.
    fn running_containers(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<RunningContainer>>> + Send;
}
