//! Mount table enumeration and cgroup v2 root detection.
//!
//! Accepts both `/proc/<pid>/mountinfo` and `/proc/mounts` formatted input.
mod detect;
mod error;
mod parser;

pub use detect::{Mount, detect_cgroup2_root, find_cgroup2_mount, read_mounts};
pub use error::{Error, Result};
pub use parser::{MountField, MountLine, ParseError, parse_mount_line};
