/// Entry point for the Creo Netmon network telemetry collector.
///
/// Attaches packet-counting probes to every container interface on the host and writes a
/// snapshot of their counters on the first `SIGINT`/`SIGTERM`. A second signal detaches the
/// probes and exits.
///
/// # Errors
///
/// Returns an error if startup fails (e.g., invalid configuration, a missing probe object, or
/// no cgroup v2 mount).
///
/// # Examples
///
/// ```bash
/// PROBE_OBJECT=./probe.bpf.o RUST_LOG=info creo-netmon
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    creo_netmon::run().await
}
