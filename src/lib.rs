//! Creo Netmon: a per-container network telemetry collector.
//!
//! This library maps host and container veth endpoints to the containers that own them, attaches
//! packet-counting probes at the socket buffer, traffic control and packet filter layers, and
//! exports the probes' counters as delimited text on request.
use tokio::signal::unix::{SignalKind, signal};

use attach::AttachManager;
use config::Config;
use interfaces::InterfaceMapper;
use lifecycle::{Collector, Controller, State};
use netns::HostNamespaces;
use probe::{EbpfProbes, Hook};
use runtime::DockerRuntime;

pub mod attach;
pub mod config;
pub mod container;
pub mod error;
pub mod export;
pub mod extract;
pub mod fsutil;
pub mod interfaces;
pub mod lifecycle;
pub mod mountinfo;
pub mod netns;
pub mod probe;
pub mod runtime;

#[cfg(test)]
pub(crate) mod testing;

/// Runs the collector until the second termination signal.
///
/// Discovers container interfaces, loads and attaches the probes, then waits for `SIGINT` or
/// `SIGTERM`. The first signal exports a snapshot of the counters and keeps running, the second
/// detaches every probe and returns.
///
/// Namespace work (discovery of container interfaces, attach and release) runs on a scoped OS
/// thread that the caller joins synchronously. Await this future from the runtime's `block_on`
/// thread, as `main` does, and do not `tokio::spawn` it onto a worker.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid configuration variables (e.g., a non-numeric `EXPORT_WORKERS`).
/// - A probe object that cannot be loaded.
/// - A hook layer that cannot be attached at all (e.g., no cgroup v2 mount).
/// - Failure to install the signal handlers.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    log::debug!("Final rootfs: {}", config.rootfs.display());

    probe::raise_memlock_limit();
    let mut probes = EbpfProbes::load(&config.probe_object)?;

    let runtime = DockerRuntime::new(&config.docker_socket);
    let namespaces = HostNamespaces;
    let mapper = InterfaceMapper::new(&config.rootfs, config.bridge_index, &runtime, &namespaces);
    let bindings = mapper.discover().await;

    let mut manager = AttachManager::new(&config.rootfs, &namespaces);
    for hook in Hook::ATTACHABLE {
        match manager.attach(&mut probes, hook, &bindings) {
            Ok(_) => {}
            Err(err) if !err.is_fatal() => log::warn!("{err}"),
            Err(err) => {
                log::error!("{err}");
                manager.release();
                return Err(err.into());
            }
        }
    }

    let mut controller = Controller::new(Collector::new(
        probes,
        bindings,
        manager,
        config.stats_output,
        config.export_workers,
    ));
    controller.attached();
    log::info!("Attached, send SIGINT or SIGTERM to export a snapshot, a second one to exit");

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    while controller.state() != State::Terminated {
        tokio::select! {
            _ = interrupt.recv() => log::info!("Received SIGINT"),
            _ = terminate.recv() => log::info!("Received SIGTERM"),
        }
        controller.on_signal().await;
    }

    Ok(())
}
