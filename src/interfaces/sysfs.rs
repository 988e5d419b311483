use std::path::Path;

use crate::error::ResultOkLogExt;
use crate::fsutil;

/// Name prefix of host-side virtual ethernet endpoints.
const VETH_PREFIX: &str = "veth";

/// Host-side endpoint of a veth pair, as exposed under `/sys/class/net/<name>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostVeth {
    pub name: String,
    /// Host namespace index (`ifindex`).
    pub if_index: u32,
    /// Index of the peer endpoint inside the other namespace (`iflink`).
    pub peer_index: u32,
}

/// Scans a `/sys/class/net`-shaped directory for veth endpoints.
///
/// Entries whose attributes cannot be read or parsed are skipped with a warning; a missing
/// directory yields an empty list. The result is ordered by interface index.
///
/// # Arguments
///
/// * `class_net` - Path to the directory, usually `<rootfs>/sys/class/net`.
pub fn scan_host_veths(class_net: impl AsRef<Path>) -> Vec<HostVeth> {
    let class_net = class_net.as_ref();
    let entries = match std::fs::read_dir(class_net) {
        Ok(entries) => entries,
        Err(err) => {
            log::warn!(
                "failed to list network interfaces in `{}`: {}",
                class_net.display(),
                err
            );
            return Vec::new();
        }
    };

    let mut veths: Vec<HostVeth> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(VETH_PREFIX) {
                return None;
            }
            let dir = entry.path();
            let if_index = fsutil::read_u32_attribute(dir.join("ifindex")).ok_warn()?;
            let peer_index = fsutil::read_u32_attribute(dir.join("iflink")).ok_warn()?;
            log::trace!("host veth {name}: ifindex={if_index}, iflink={peer_index}");
            Some(HostVeth {
                name,
                if_index,
                peer_index,
            })
        })
        .collect();

    veths.sort_by_key(|veth| veth.if_index);
    veths
}

#[cfg(test)]
pub(crate) fn write_fake_veth(class_net: &Path, name: &str, if_index: u32, peer_index: u32) {
    let dir = class_net.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("ifindex"), format!("{if_index}\n")).unwrap();
    std::fs::write(dir.join("iflink"), format!("{peer_index}\n")).unwrap();
}
