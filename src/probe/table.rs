use std::path::Path;

use super::{Hook, PacketInfo, Result};

/// Key of the zero-valued entry every counter table carries after its attach sweep.
pub const SEED_KEY: u64 = 0;

/// Lazily evaluated `(key, value)` pairs of a counter table.
pub type Entries<'a> = Box<dyn Iterator<Item = Result<(u64, PacketInfo)>> + 'a>;

/// Read and seed access to one probe counter table.
pub trait CounterTable {
    fn entries(&self) -> Entries<'_>;

    fn update(&mut self, key: u64, value: PacketInfo) -> Result<()>;
}

/// A live probe attachment. Detaching consumes it.
pub trait ProbeLink: Send {
    fn detach(self: Box<Self>) -> Result<()>;
}

/// The loaded probe payload: attach points and counter tables for every [`Hook`].
pub trait Probes: Send {
    /// Attaches the hook's program to the interface named `interface` in the calling thread's
    /// network namespace.
    fn attach_interface(&mut self, hook: Hook, interface: &str) -> Result<Box<dyn ProbeLink>>;

    /// Attaches the hook's program to the cgroup directory at `cgroup`.
    fn attach_cgroup(&mut self, hook: Hook, cgroup: &Path) -> Result<Box<dyn ProbeLink>>;

    fn table(&self, hook: Hook) -> Result<&dyn CounterTable>;

    fn table_mut(&mut self, hook: Hook) -> Result<&mut dyn CounterTable>;
}

/// Writes the default entry under [`SEED_KEY`], so a table is never empty, even without traffic.
pub fn seed(table: &mut dyn CounterTable) -> Result<()> {
    table.update(SEED_KEY, PacketInfo::default())
}
