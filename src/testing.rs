//! In-memory stand-ins for the container runtime, network namespaces and the probe payload.
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use aya::maps::MapError;
use aya::programs::ProgramError;

use crate::container::RunningContainer;
use crate::netns::{self, LinkEntry, NamespaceOps};
use crate::probe::{self, CounterTable, Entries, Hook, PacketInfo, ProbeLink, Probes};
use crate::runtime::{self, ContainerRuntime};

pub(crate) struct FakeRuntime {
    containers: Option<Vec<RunningContainer>>,
}

impl FakeRuntime {
    pub(crate) fn new(containers: Vec<RunningContainer>) -> Self {
        Self {
            containers: Some(containers),
        }
    }

    pub(crate) fn failing() -> Self {
        Self { containers: None }
    }
}

impl ContainerRuntime for FakeRuntime {
    async fn running_containers(&self) -> runtime::Result<Vec<RunningContainer>> {
        self.containers.clone().ok_or_else(|| runtime::Error::Status {
            uri: "/containers/json".to_owned(),
            status: hyper::StatusCode::INTERNAL_SERVER_ERROR,
            body: "daemon unavailable".to_owned(),
        })
    }
}

/// Namespaces known by path. Entering or listing an unregistered path fails like a vanished
/// process would.
#[derive(Default)]
pub(crate) struct FakeNamespaces {
    host_links: Vec<LinkEntry>,
    links: HashMap<PathBuf, Vec<LinkEntry>>,
    entered: Arc<Mutex<Vec<PathBuf>>>,
    active: Arc<AtomicUsize>,
    vanished: Mutex<HashSet<PathBuf>>,
}

impl FakeNamespaces {
    pub(crate) fn with_host_links(mut self, links: Vec<LinkEntry>) -> Self {
        self.host_links = links;
        self
    }

    pub(crate) fn with_links(mut self, path: impl Into<PathBuf>, links: Vec<LinkEntry>) -> Self {
        self.links.insert(path.into(), links);
        self
    }

    /// Every namespace entered so far, in order.
    pub(crate) fn entered(&self) -> Vec<PathBuf> {
        self.entered.lock().unwrap().clone()
    }

    /// Makes `path` unreachable from now on, as if its process had exited.
    pub(crate) fn vanish(&self, path: impl Into<PathBuf>) {
        self.vanished.lock().unwrap().insert(path.into());
    }

    /// Guards currently alive.
    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    fn missing(path: &Path) -> netns::Error {
        netns::Error::Open {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
    }
}

pub(crate) struct FakeGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for FakeGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl NamespaceOps for FakeNamespaces {
    type Guard = FakeGuard;

    fn enter(&self, path: &Path) -> netns::Result<FakeGuard> {
        if !self.links.contains_key(path) || self.vanished.lock().unwrap().contains(path) {
            return Err(Self::missing(path));
        }
        self.entered.lock().unwrap().push(path.to_path_buf());
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(FakeGuard {
            active: Arc::clone(&self.active),
        })
    }

    fn links(&self, path: Option<&Path>) -> netns::Result<Vec<LinkEntry>> {
        match path {
            None => Ok(self.host_links.clone()),
            Some(path) => self.links.get(path).cloned().ok_or_else(|| Self::missing(path)),
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeTable {
    entries: BTreeMap<u64, PacketInfo>,
    broken: bool,
}

impl CounterTable for FakeTable {
    fn entries(&self) -> Entries<'_> {
        if self.broken {
            return Box::new(std::iter::once(Err(probe::Error::Map {
                name: "broken",
                source: MapError::KeyNotFound,
            })));
        }
        Box::new(self.entries.iter().map(|(key, value)| Ok((*key, *value))))
    }

    fn update(&mut self, key: u64, value: PacketInfo) -> probe::Result<()> {
        if self.broken {
            return Err(probe::Error::Map {
                name: "broken",
                source: MapError::KeyNotFound,
            });
        }
        self.entries.insert(key, value);
        Ok(())
    }
}

/// Probe payload with in-memory tables. Attaching to a scripted `(hook, target)` pair fails;
/// every detach is counted.
#[derive(Default)]
pub(crate) struct FakeProbes {
    tables: BTreeMap<Hook, FakeTable>,
    failing: HashSet<(Hook, String)>,
    attached: Vec<(Hook, String)>,
    detached: Arc<AtomicUsize>,
}

impl FakeProbes {
    pub(crate) fn new() -> Self {
        let mut probes = Self::default();
        for hook in Hook::ALL {
            probes.tables.insert(hook, FakeTable::default());
        }
        probes
    }

    pub(crate) fn fail_attach(mut self, hook: Hook, target: impl Into<String>) -> Self {
        self.failing.insert((hook, target.into()));
        self
    }

    pub(crate) fn break_table(mut self, hook: Hook) -> Self {
        self.tables.entry(hook).or_default().broken = true;
        self
    }

    pub(crate) fn with_entry(mut self, hook: Hook, key: u64, value: PacketInfo) -> Self {
        self.tables
            .entry(hook)
            .or_default()
            .entries
            .insert(key, value);
        self
    }

    /// Successful attachments as `(hook, interface or cgroup path)`.
    pub(crate) fn attached(&self) -> &[(Hook, String)] {
        &self.attached
    }

    pub(crate) fn detached(&self) -> usize {
        self.detached.load(Ordering::SeqCst)
    }

    pub(crate) fn entries(&self, hook: Hook) -> Vec<(u64, PacketInfo)> {
        self.tables
            .get(&hook)
            .map(|table| table.entries.iter().map(|(k, v)| (*k, *v)).collect())
            .unwrap_or_default()
    }

    fn attach(&mut self, hook: Hook, target: String) -> probe::Result<Box<dyn ProbeLink>> {
        if self.failing.contains(&(hook, target.clone())) {
            return Err(probe::Error::Program {
                name: hook.program_name().unwrap_or("none"),
                source: ProgramError::NotLoaded,
            });
        }
        self.attached.push((hook, target));
        Ok(Box::new(FakeLink {
            detached: Arc::clone(&self.detached),
        }))
    }
}

struct FakeLink {
    detached: Arc<AtomicUsize>,
}

impl ProbeLink for FakeLink {
    fn detach(self: Box<Self>) -> probe::Result<()> {
        self.detached.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Probes for FakeProbes {
    fn attach_interface(&mut self, hook: Hook, interface: &str) -> probe::Result<Box<dyn ProbeLink>> {
        self.attach(hook, interface.to_owned())
    }

    fn attach_cgroup(&mut self, hook: Hook, cgroup: &Path) -> probe::Result<Box<dyn ProbeLink>> {
        self.attach(hook, cgroup.display().to_string())
    }

    fn table(&self, hook: Hook) -> probe::Result<&dyn CounterTable> {
        self.tables
            .get(&hook)
            .map(|table| table as &dyn CounterTable)
            .ok_or(probe::Error::MissingMap(hook.map_name()))
    }

    fn table_mut(&mut self, hook: Hook) -> probe::Result<&mut dyn CounterTable> {
        self.tables
            .get_mut(&hook)
            .map(|table| table as &mut dyn CounterTable)
            .ok_or(probe::Error::MissingMap(hook.map_name()))
    }
}
