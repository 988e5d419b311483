use crate::fsutil;

use super::parser::parse_mount_line;
use super::{Error, Result};
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// A mounted filesystem as listed in a mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub mount_point: PathBuf,
    pub fs_type: String,
}

/// Enumerates all mounts listed in the given mount table file.
///
/// # Arguments
///
/// * `path` - Path to a `mountinfo` or `mounts` file (e.g., `/proc/self/mountinfo`).
///
/// # Errors
///
/// - [`Error::FileOpen`] if the file can't be opened.
/// - [`Error::Read`] if reading from the file fails.
/// - [`Error::Parse`] if any line fails to parse.
pub fn read_mounts(path: impl AsRef<Path>) -> Result<Vec<Mount>> {
    let path = path.as_ref();
    let reader = fsutil::open_file_reader(path)?;
    read_mounts_from_reader(reader, path)
}

/// Returns the first `cgroup2` mount in `mounts`, if any.
pub fn find_cgroup2_mount(mounts: &[Mount]) -> Option<&Mount> {
    mounts.iter().find(|mount| mount.fs_type == "cgroup2")
}

/// Detects the root of the unified cgroup hierarchy from the given mount table.
///
/// The first `cgroup2` mount wins. Its mount point is re-rooted under `rootfs` (so a collector
/// running with the host filesystem mounted elsewhere still finds it), canonicalized, and checked
/// to be a directory.
///
/// # Errors
///
/// Returns errors from [`read_mounts`] and:
///
/// - [`Error::MissingCgroup2Mount`] if no `cgroup2` mount is listed.
/// - [`Error::Resolve`] if the path cannot be canonicalized or stat'ed.
/// - [`Error::NotADirectory`] if the resolved path is not a directory.
///
/// # Example
///
/// ```no_run
/// use creo_netmon::mountinfo::detect_cgroup2_root;
///
/// let root = detect_cgroup2_root("/", "/proc/self/mountinfo").unwrap();
/// println!("cgroup2 root: {}", root.display());
/// ```
pub fn detect_cgroup2_root(rootfs: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let mounts = read_mounts(path)?;
    let mount = find_cgroup2_mount(&mounts).ok_or_else(|| Error::MissingCgroup2Mount {
        path: path.to_path_buf(),
    })?;
    log::debug!("Found `cgroup2` mount point: {}", mount.mount_point.display());

    let raw = rootfs.as_ref().join(
        mount
            .mount_point
            .strip_prefix("/")
            .unwrap_or(&mount.mount_point),
    );
    let canonical = std::fs::canonicalize(&raw).map_err(|source| Error::Resolve {
        path: raw.clone(),
        source,
    })?;

    let metadata = std::fs::metadata(&canonical).map_err(|source| Error::Resolve {
        path: canonical.clone(),
        source,
    })?;

    if !metadata.is_dir() {
        return Err(Error::NotADirectory { path: canonical });
    }

    Ok(canonical)
}

fn read_mounts_from_reader<R: BufRead>(mut reader: R, origin: &Path) -> Result<Vec<Mount>> {
    let mut line = String::with_capacity(256);
    let mut mounts = Vec::new();
    let mut line_no = 0;

    while reader
        .read_line(&mut line)
        .map_err(|source| Error::Read {
            path: origin.to_path_buf(),
            source,
        })?
        != 0
    {
        line_no += 1;
        if !line.trim().is_empty() {
            let parsed = parse_mount_line(line.as_str()).map_err(|source| Error::Parse {
                path: origin.to_path_buf(),
                line: line_no,
                source,
            })?;
            mounts.push(Mount {
                mount_point: PathBuf::from(parsed.decoded_mount_point().as_ref()),
                fs_type: parsed.fs_type.to_owned(),
            });
        }

        line.clear();
    }

    Ok(mounts)
}
