use std::fs::File;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use nix::sched::{CloneFlags, setns};

use super::{Error, Result};

/// Handle to the network namespace of the calling thread.
const THREAD_NETNS: &str = "/proc/thread-self/ns/net";

/// Scoped membership in a foreign network namespace.
///
/// [`NetnsGuard::enter`] moves the calling thread into the namespace at `path`; dropping the guard
/// moves it back, on every exit path. The guard is `!Send` because the membership it represents
/// belongs to the thread that created it.
#[derive(Debug)]
pub struct NetnsGuard {
    original: File,
    entered: PathBuf,
    _thread_bound: PhantomData<*const ()>,
}

impl NetnsGuard {
    /// Switches the calling thread into the network namespace referenced by `path`
    /// (e.g., `/proc/<pid>/ns/net`).
    ///
    /// # Errors
    ///
    /// - [`Error::Open`] if either the current or the target namespace handle cannot be opened.
    /// - [`Error::Switch`] if `setns(2)` refuses the target. The thread is still in its original
    ///   namespace in that case.
    pub fn enter(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let original = File::open(THREAD_NETNS).map_err(|source| Error::Open {
            path: PathBuf::from(THREAD_NETNS),
            source,
        })?;
        let target = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;

        setns(&target, CloneFlags::CLONE_NEWNET).map_err(|source| Error::Switch {
            path: path.to_path_buf(),
            source,
        })?;
        log::trace!("entered network namespace {}", path.display());

        Ok(Self {
            original,
            entered: path.to_path_buf(),
            _thread_bound: PhantomData,
        })
    }
}

impl Drop for NetnsGuard {
    fn drop(&mut self) {
        match setns(&self.original, CloneFlags::CLONE_NEWNET) {
            Ok(()) => log::trace!("left network namespace {}", self.entered.display()),
            Err(err) => log::error!(
                "failed to restore network namespace after `{}`: {}",
                self.entered.display(),
                err
            ),
        }
    }
}

/// Runs `f` to completion on a fresh, otherwise unused OS thread and returns its result.
///
/// Namespace switches made inside `f` can never be observed by runtime worker threads or by
/// other callers, and the thread is gone once `f` returns. A panic inside `f` is re-raised on the
/// calling thread.
pub fn run_pinned<F, T>(f: F) -> T
where
    F: FnOnce() -> T + Send,
    T: Send,
{
    std::thread::scope(|scope| match scope.spawn(f).join() {
        Ok(value) => value,
        Err(payload) => std::panic::resume_unwind(payload),
    })
}
