//! Mount table line parser for Linux systems.
//!
//! Two layouts are understood:
//!
//! - `mountinfo` (see [`proc_pid_mountinfo(5)`](https://man7.org/linux/man-pages/man5/proc_pid_mountinfo.5.html)):
//!   `36 25 0:32 / /sys rw shared:7 - sysfs sysfs rw`
//! - `mounts` / fstab (see [`fstab(5)`](https://man7.org/linux/man-pages/man5/fstab.5.html)):
//!   `cgroup2 /sys/fs/cgroup cgroup2 rw,nosuid,nodev,noexec,relatime 0 0`
//!
//! A line containing the ` - ` optional-field separator is treated as `mountinfo`.

use std::borrow::Cow;

/// The parts of a mount table line the collector cares about.
#[derive(Debug, PartialEq, Eq)]
pub struct MountLine<'a> {
    /// Mount point, still octal-escaped as the kernel prints it.
    pub mount_point: &'a str,
    /// Filesystem type (e.g., `ext4`, `cgroup2`).
    pub fs_type: &'a str,
}

impl MountLine<'_> {
    /// Returns the mount point with `\040`-style octal escapes decoded.
    pub fn decoded_mount_point(&self) -> Cow<'_, str> {
        unescape_octal(self.mount_point)
    }
}

/// Named fields in a mount table line.
#[derive(Debug)]
pub enum MountField {
    MountId,
    ParentId,
    MajorMinor,
    Root,
    MountPoint,
    FsType,
    Source,
}

impl std::fmt::Display for MountField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MountField::MountId => "mount_id",
            MountField::ParentId => "parent_id",
            MountField::MajorMinor => "major:minor",
            MountField::Root => "root",
            MountField::MountPoint => "mount_point",
            MountField::FsType => "fs_type",
            MountField::Source => "source",
        };
        write!(f, "{name}")
    }
}

/// Errors that may occur when parsing a mount table line.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("missing `{field}` in line: `{line}`")]
    MissingField { field: MountField, line: String },
}

/// Parses one line of either mount table layout.
///
/// # Errors
///
/// Returns [`ParseError::MissingField`] naming the first required field that is absent.
pub fn parse_mount_line(line: &str) -> Result<MountLine<'_>, ParseError> {
    match line.split_once(" - ") {
        Some((pre, post)) => parse_mountinfo(line, pre, post),
        None => parse_mounts(line),
    }
}

fn missing(field: MountField, line: &str) -> ParseError {
    ParseError::MissingField {
        field,
        line: line.trim_end().to_owned(),
    }
}

fn parse_mountinfo<'a>(line: &str, pre: &'a str, post: &'a str) -> Result<MountLine<'a>, ParseError> {
    let mut pre_fields = pre.split_whitespace();
    pre_fields
        .next()
        .ok_or_else(|| missing(MountField::MountId, line))?;
    pre_fields
        .next()
        .ok_or_else(|| missing(MountField::ParentId, line))?;
    pre_fields
        .next()
        .ok_or_else(|| missing(MountField::MajorMinor, line))?;
    pre_fields
        .next()
        .ok_or_else(|| missing(MountField::Root, line))?;
    let mount_point = pre_fields
        .next()
        .ok_or_else(|| missing(MountField::MountPoint, line))?;

    let mut post_fields = post.split_whitespace();
    let fs_type = post_fields
        .next()
        .ok_or_else(|| missing(MountField::FsType, line))?;
    post_fields
        .next()
        .ok_or_else(|| missing(MountField::Source, line))?;

    Ok(MountLine {
        mount_point,
        fs_type,
    })
}

fn parse_mounts(line: &str) -> Result<MountLine<'_>, ParseError> {
    let mut fields = line.split_whitespace();
    fields
        .next()
        .ok_or_else(|| missing(MountField::Source, line))?;
    let mount_point = fields
        .next()
        .ok_or_else(|| missing(MountField::MountPoint, line))?;
    let fs_type = fields
        .next()
        .ok_or_else(|| missing(MountField::FsType, line))?;

    Ok(MountLine {
        mount_point,
        fs_type,
    })
}

/// Decodes the `\ooo` octal escapes the kernel uses for whitespace and backslashes in paths.
fn unescape_octal(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') {
        return Cow::Borrowed(raw);
    }

    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Ok(value) = u8::try_from(value) {
                    out.push(value);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    Cow::Owned(String::from_utf8_lossy(&out).into_owned())
}
