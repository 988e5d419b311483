//! The precompiled packet-counting probes.
//!
//! A [`Hook`] names one layer and direction. The rest of the crate talks to the loaded payload
//! only through [`Probes`] (attach points) and [`CounterTable`] (counter maps); [`EbpfProbes`]
//! implements both on top of `aya`.
mod ebpf;
mod error;
mod hook;
mod packet;
mod table;

pub use ebpf::{EbpfProbes, raise_memlock_limit};
pub use error::{Error, Result};
pub use hook::{Direction, Hook, Layer};
pub use packet::{Decoded, PacketInfo};
pub use table::{CounterTable, Entries, ProbeLink, Probes, SEED_KEY, seed};
