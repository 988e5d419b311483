//! Two-stage shutdown: the first termination signal exports a snapshot, the second one detaches
//! every probe and ends the process.
use std::fmt;
use std::future::Future;
use std::path::PathBuf;

use crate::attach::AttachManager;
use crate::export;
use crate::extract;
use crate::interfaces::Bindings;
use crate::netns::NamespaceOps;
use crate::probe::Probes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Initializing,
    Attached,
    Snapshotting,
    Draining,
    Terminated,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Initializing => "initializing",
            State::Attached => "attached",
            State::Snapshotting => "snapshotting",
            State::Draining => "draining",
            State::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// The work the controller triggers on signals.
pub trait Phases {
    /// Reads the counter tables and exports them. Returns the number of exported records.
    fn snapshot(&mut self) -> impl Future<Output = export::Result<usize>>;

    /// Detaches every probe. Returns the number of detached probes.
    fn teardown(&mut self) -> usize;
}

/// Drives [`Phases`] from termination signals.
#[derive(Debug)]
pub struct Controller<P> {
    phases: P,
    state: State,
    signals: usize,
}

impl<P: Phases> Controller<P> {
    pub fn new(phases: P) -> Self {
        Self {
            phases,
            state: State::Initializing,
            signals: 0,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn phases(&self) -> &P {
        &self.phases
    }

    /// Marks startup as complete.
    pub fn attached(&mut self) {
        self.transition(State::Attached);
    }

    /// Handles one termination signal and returns the state it leaves the controller in.
    ///
    /// The first signal while attached runs a snapshot and export; export failures are logged
    /// and the controller stays attached. Any later signal, or a signal during startup, tears
    /// everything down.
    pub async fn on_signal(&mut self) -> State {
        self.signals += 1;
        match self.state {
            State::Attached if self.signals == 1 => {
                self.transition(State::Snapshotting);
                match self.phases.snapshot().await {
                    Ok(count) => log::info!("Snapshot of {count} records exported"),
                    Err(err) => log::error!("snapshot export failed: {err}"),
                }
                self.transition(State::Attached);
            }
            State::Terminated => {}
            _ => {
                self.transition(State::Draining);
                let released = self.phases.teardown();
                log::info!("Detached {released} probes");
                self.transition(State::Terminated);
            }
        }
        self.state
    }

    fn transition(&mut self, next: State) {
        log::debug!("{} -> {}", self.state, next);
        self.state = next;
    }
}

/// The collector's [`Phases`]: loaded probes, the discovered bindings, and every attachment.
pub struct Collector<'a, P, N> {
    probes: P,
    bindings: Bindings,
    manager: AttachManager<'a, N>,
    destination: PathBuf,
    workers: usize,
}

impl<'a, P, N> Collector<'a, P, N>
where
    P: Probes,
    N: NamespaceOps,
{
    pub fn new(
        probes: P,
        bindings: Bindings,
        manager: AttachManager<'a, N>,
        destination: impl Into<PathBuf>,
        workers: usize,
    ) -> Self {
        Self {
            probes,
            bindings,
            manager,
            destination: destination.into(),
            workers,
        }
    }

    pub fn probes(&self) -> &P {
        &self.probes
    }
}

impl<P, N> Phases for Collector<'_, P, N>
where
    P: Probes,
    N: NamespaceOps,
{
    async fn snapshot(&mut self) -> export::Result<usize> {
        let records = extract::snapshot(&self.probes, &self.bindings);
        log::info!("Collected {} records", records.len());
        export::export(Some(records), &self.destination, self.workers).await
    }

    fn teardown(&mut self) -> usize {
        self.manager.release()
    }
}
