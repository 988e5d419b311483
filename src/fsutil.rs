use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Error that occurs when opening a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to open file `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Error that occurs when a single-value attribute file cannot be read or parsed.
#[derive(Debug, thiserror::Error)]
pub enum AttributeError {
    #[error("failed to read attribute `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid value `{value}` in attribute `{path}`: {source}")]
    Parse {
        path: PathBuf,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use creo_netmon::fsutil;
/// let reader = fsutil::open_file_reader("/proc/self/mountinfo")?;
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileOpenError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Reads a sysfs-style attribute file holding a single unsigned integer, e.g.
/// `/sys/class/net/<iface>/ifindex`.
///
/// Surrounding whitespace (including the trailing newline sysfs emits) is ignored.
///
/// # Errors
///
/// - [`AttributeError::Read`] if the file cannot be read.
/// - [`AttributeError::Parse`] if the content is not a decimal `u32`.
pub fn read_u32_attribute(path: impl AsRef<Path>) -> Result<u32, AttributeError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| AttributeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value = raw.trim();
    value.parse::<u32>().map_err(|source| AttributeError::Parse {
        path: path.to_path_buf(),
        value: value.to_owned(),
        source,
    })
}
