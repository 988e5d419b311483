//! Startup configuration read from the environment.
use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;

use crate::export::{DEFAULT_WORKERS, MAX_WORKERS};
use crate::runtime::DEFAULT_DOCKER_SOCKET;

/// Index of the default bridge (`docker0`) on a stock Docker host.
pub const DEFAULT_BRIDGE_IFINDEX: u32 = 6;

const ROOTFS_MOUNT_PATH: &str = "ROOTFS_MOUNT_PATH";
const DOCKER_SOCKET: &str = "DOCKER_SOCKET";
const PROBE_OBJECT: &str = "PROBE_OBJECT";
const STATS_OUTPUT: &str = "STATS_OUTPUT";
const EXPORT_WORKERS: &str = "EXPORT_WORKERS";
const BRIDGE_IFINDEX: &str = "BRIDGE_IFINDEX";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value `{value}` for `{key}`: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where the host's root filesystem is visible (`/` unless running in a container).
    pub rootfs: PathBuf,
    pub docker_socket: PathBuf,
    /// Precompiled probe object.
    pub probe_object: PathBuf,
    /// Export destination, relative paths resolve against the working directory.
    pub stats_output: PathBuf,
    pub export_workers: usize,
    pub bridge_index: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rootfs: PathBuf::from("/"),
            docker_socket: PathBuf::from(DEFAULT_DOCKER_SOCKET),
            probe_object: PathBuf::from("probe.bpf.o"),
            stats_output: PathBuf::from("stats.csv"),
            export_workers: DEFAULT_WORKERS,
            bridge_index: DEFAULT_BRIDGE_IFINDEX,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment. Unset variables keep their default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if a numeric variable does not parse, or if
    /// `EXPORT_WORKERS` is zero or above [`MAX_WORKERS`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Like [`Config::from_env`], with variables resolved through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup(ROOTFS_MOUNT_PATH) {
            config.rootfs = value.into();
        }
        if let Some(value) = lookup(DOCKER_SOCKET) {
            config.docker_socket = value.into();
        }
        if let Some(value) = lookup(PROBE_OBJECT) {
            config.probe_object = value.into();
        }
        if let Some(value) = lookup(STATS_OUTPUT) {
            config.stats_output = value.into();
        }
        if let Some(value) = lookup(EXPORT_WORKERS) {
            let workers: usize = parse(EXPORT_WORKERS, value)?;
            if !(1..=MAX_WORKERS).contains(&workers) {
                return Err(Error::InvalidValue {
                    key: EXPORT_WORKERS,
                    value: workers.to_string(),
                    reason: format!("must be between 1 and {MAX_WORKERS}"),
                });
            }
            config.export_workers = workers;
        }
        if let Some(value) = lookup(BRIDGE_IFINDEX) {
            config.bridge_index = parse(BRIDGE_IFINDEX, value)?;
        }

        log::debug!("{config:?}");
        Ok(config)
    }
}

fn parse<T>(key: &'static str, value: OsString) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = value.to_string_lossy();
    value.trim().parse().map_err(|err: T::Err| Error::InvalidValue {
        key,
        value: value.clone().into_owned(),
        reason: err.to_string(),
    })
}
