use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use aya::Ebpf;
use aya::maps::{HashMap, MapData};
use aya::programs::links::Link;
use aya::programs::tc::TcAttachOptions;
use aya::programs::{
    CgroupAttachMode, CgroupSkb, CgroupSkbAttachType, LinkOrder, Program, ProgramError,
    SchedClassifier, TcAttachType, Xdp, XdpFlags,
};
use nix::sys::resource::{RLIM_INFINITY, Resource, setrlimit};

use super::table::{CounterTable, Entries, ProbeLink, Probes};
use super::{Direction, Error, Hook, Layer, PacketInfo, Result};

/// Lifts the locked-memory limit so that older kernels can allocate the probe maps.
///
/// A failure is only logged: kernels with memcg-based accounting do not need the raise.
pub fn raise_memlock_limit() {
    match setrlimit(Resource::RLIMIT_MEMLOCK, RLIM_INFINITY, RLIM_INFINITY) {
        Ok(()) => log::debug!("raised RLIMIT_MEMLOCK to infinity"),
        Err(err) => log::warn!("failed to raise RLIMIT_MEMLOCK: {}", err),
    }
}

/// [`Probes`] backed by a precompiled probe object loaded into the kernel with `aya`.
pub struct EbpfProbes {
    ebpf: Ebpf,
    tables: BTreeMap<Hook, CounterMap>,
}

impl EbpfProbes {
    /// Loads the object at `path`, verifies and loads every probe program, and takes ownership
    /// of every counter map.
    ///
    /// # Errors
    ///
    /// - [`Error::Load`] if the object cannot be read or rejected by the kernel.
    /// - [`Error::MissingProgram`] / [`Error::MissingMap`] if the object lacks a required item.
    /// - [`Error::Program`] / [`Error::Map`] if an item has the wrong kind or fails to load.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut ebpf = Ebpf::load_file(path).map_err(|source| Error::Load {
            path: path.to_path_buf(),
            source,
        })?;

        for hook in Hook::ATTACHABLE {
            let Some(name) = hook.program_name() else {
                continue;
            };
            match hook.layer {
                Layer::Skb => program::<CgroupSkb>(&mut ebpf, name)?.load(),
                Layer::Tc => program::<SchedClassifier>(&mut ebpf, name)?.load(),
                Layer::Xdp => program::<Xdp>(&mut ebpf, name)?.load(),
            }
            .map_err(|source| Error::Program { name, source })?;
            log::debug!("loaded probe program {name}");
        }

        let mut tables = BTreeMap::new();
        for hook in Hook::ALL {
            let name = hook.map_name();
            let map = ebpf.take_map(name).ok_or(Error::MissingMap(name))?;
            let map = HashMap::try_from(map).map_err(|source| Error::Map { name, source })?;
            tables.insert(hook, CounterMap { name, map });
        }

        log::info!("Loaded probe object `{}`", path.display());
        Ok(Self { ebpf, tables })
    }
}

impl Probes for EbpfProbes {
    fn attach_interface(&mut self, hook: Hook, interface: &str) -> Result<Box<dyn ProbeLink>> {
        let name = hook.program_name().ok_or(Error::Unsupported {
            hook,
            target: "an interface",
        })?;
        let program_error = |source| Error::Program { name, source };

        match hook.layer {
            Layer::Tc => {
                let attach_type = match hook.direction {
                    Direction::Ingress => TcAttachType::Ingress,
                    Direction::Egress => TcAttachType::Egress,
                };
                let program = program::<SchedClassifier>(&mut self.ebpf, name)?;
                let id = program
                    .attach_with_options(
                        interface,
                        attach_type,
                        TcAttachOptions::TcxOrder(LinkOrder::default()),
                    )
                    .map_err(program_error)?;
                let link = program.take_link(id).map_err(program_error)?;
                Ok(Box::new(OwnedLink { name, link }))
            }
            Layer::Xdp => {
                let program = program::<Xdp>(&mut self.ebpf, name)?;
                let id = program
                    .attach(interface, XdpFlags::default())
                    .map_err(program_error)?;
                let link = program.take_link(id).map_err(program_error)?;
                Ok(Box::new(OwnedLink { name, link }))
            }
            Layer::Skb => Err(Error::Unsupported {
                hook,
                target: "an interface",
            }),
        }
    }

    fn attach_cgroup(&mut self, hook: Hook, cgroup: &Path) -> Result<Box<dyn ProbeLink>> {
        let name = match (hook.layer, hook.program_name()) {
            (Layer::Skb, Some(name)) => name,
            _ => {
                return Err(Error::Unsupported {
                    hook,
                    target: "a cgroup",
                });
            }
        };
        let program_error = |source| Error::Program { name, source };

        let file = File::open(cgroup).map_err(|source| Error::Cgroup {
            path: cgroup.to_path_buf(),
            source,
        })?;
        let attach_type = match hook.direction {
            Direction::Ingress => CgroupSkbAttachType::Ingress,
            Direction::Egress => CgroupSkbAttachType::Egress,
        };
        let program = program::<CgroupSkb>(&mut self.ebpf, name)?;
        let id = program
            .attach(file, attach_type, CgroupAttachMode::Single)
            .map_err(program_error)?;
        let link = program.take_link(id).map_err(program_error)?;
        Ok(Box::new(OwnedLink { name, link }))
    }

    fn table(&self, hook: Hook) -> Result<&dyn CounterTable> {
        self.tables
            .get(&hook)
            .map(|table| table as &dyn CounterTable)
            .ok_or(Error::MissingMap(hook.map_name()))
    }

    fn table_mut(&mut self, hook: Hook) -> Result<&mut dyn CounterTable> {
        self.tables
            .get_mut(&hook)
            .map(|table| table as &mut dyn CounterTable)
            .ok_or(Error::MissingMap(hook.map_name()))
    }
}

fn program<'a, T>(ebpf: &'a mut Ebpf, name: &'static str) -> Result<&'a mut T>
where
    &'a mut T: TryFrom<&'a mut Program, Error = ProgramError>,
{
    ebpf.program_mut(name)
        .ok_or(Error::MissingProgram(name))?
        .try_into()
        .map_err(|source| Error::Program { name, source })
}

struct CounterMap {
    name: &'static str,
    map: HashMap<MapData, u64, PacketInfo>,
}

impl CounterTable for CounterMap {
    fn entries(&self) -> Entries<'_> {
        let name = self.name;
        Box::new(
            self.map
                .iter()
                .map(move |entry| entry.map_err(|source| Error::Map { name, source })),
        )
    }

    fn update(&mut self, key: u64, value: PacketInfo) -> Result<()> {
        self.map
            .insert(key, value, 0)
            .map_err(|source| Error::Map {
                name: self.name,
                source,
            })
    }
}

/// A link taken out of its program, so it outlives the borrow of the program that created it.
struct OwnedLink<L> {
    name: &'static str,
    link: L,
}

impl<L> ProbeLink for OwnedLink<L>
where
    L: Link + Send,
{
    fn detach(self: Box<Self>) -> Result<()> {
        let name = self.name;
        self.link
            .detach()
            .map_err(|source| Error::Program { name, source })
    }
}
