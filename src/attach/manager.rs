use std::path::{Path, PathBuf};

use crate::interfaces::Bindings;
use crate::mountinfo::detect_cgroup2_root;
use crate::netns::{NamespaceOps, run_pinned};
use crate::probe::{self, Hook, Layer, ProbeLink, Probes};

use super::{AttachFailure, Error, FailureCause, HandleKey, HookHandle, Result, Target};

/// Mount table consulted for the cgroup v2 root, relative to the rootfs.
const MOUNTINFO: &str = "proc/1/mountinfo";

/// Owns every probe attachment from the first sweep until [`AttachManager::release`].
pub struct AttachManager<'a, N> {
    rootfs: PathBuf,
    namespaces: &'a N,
    cgroup_root: Option<PathBuf>,
    handles: Vec<HookHandle>,
}

impl<'a, N> AttachManager<'a, N>
where
    N: NamespaceOps,
{
    pub fn new(rootfs: impl Into<PathBuf>, namespaces: &'a N) -> Self {
        Self {
            rootfs: rootfs.into(),
            namespaces,
            cgroup_root: None,
            handles: Vec::new(),
        }
    }

    pub fn handles(&self) -> &[HookHandle] {
        &self.handles
    }

    /// Attaches `hook` everywhere it applies and seeds its counter tables afterwards.
    ///
    /// Socket buffer hooks attach once to the cgroup v2 root. Traffic control and packet filter
    /// hooks attach to every interface in `bindings`; interfaces inside a container are attached
    /// from within that container's network namespace.
    ///
    /// # Returns
    ///
    /// The number of new handles.
    ///
    /// # Errors
    ///
    /// - [`Error::PartialFailure`] if some targets failed. Every successful attachment of the
    ///   sweep is kept and will be released by [`AttachManager::release`].
    /// - [`Error::CgroupRoot`] if no cgroup v2 root could be found (socket buffer hooks only).
    /// - [`Error::Seed`] if a counter table could not be seeded.
    pub fn attach<P: Probes>(
        &mut self,
        probes: &mut P,
        hook: Hook,
        bindings: &Bindings,
    ) -> Result<usize> {
        let before = self.handles.len();
        let failures = match hook.layer {
            Layer::Skb => self.attach_cgroup(probes, hook)?,
            Layer::Tc | Layer::Xdp => self.attach_interfaces(probes, hook, bindings),
        };

        for &table in hook.seeded_tables() {
            probes
                .table_mut(table)
                .and_then(probe::seed)
                .map_err(|source| Error::Seed {
                    hook: table,
                    source,
                })?;
        }

        let attached = self.handles.len() - before;
        if failures.is_empty() {
            log::info!("{hook}: attached {attached} probes");
            Ok(attached)
        } else {
            Err(Error::PartialFailure {
                hook,
                attached,
                failures,
            })
        }
    }

    fn attach_cgroup<P: Probes>(
        &mut self,
        probes: &mut P,
        hook: Hook,
    ) -> Result<Vec<AttachFailure>> {
        let root = match &self.cgroup_root {
            Some(root) => root.clone(),
            None => {
                let root = detect_cgroup2_root(&self.rootfs, self.rootfs.join(MOUNTINFO))
                    .map_err(|source| Error::CgroupRoot { hook, source })?;
                self.cgroup_root = Some(root.clone());
                root
            }
        };

        let key = HandleKey {
            target: Target::Cgroup,
            hook,
        };
        log::debug!("{hook}: attaching to {}", root.display());
        match probes.attach_cgroup(hook, &root) {
            Ok(link) => {
                self.handles.push(HookHandle::new(key, None, link));
                Ok(Vec::new())
            }
            Err(err) => {
                log::warn!("{hook}: failed to attach to {}: {}", root.display(), err);
                Ok(vec![AttachFailure {
                    key,
                    cause: err.into(),
                }])
            }
        }
    }

    fn attach_interfaces<P: Probes>(
        &mut self,
        probes: &mut P,
        hook: Hook,
        bindings: &Bindings,
    ) -> Vec<AttachFailure> {
        let namespaces = self.namespaces;
        let handles = &mut self.handles;

        run_pinned(|| {
            let mut failures = Vec::new();
            for (if_index, binding) in bindings.iter() {
                let key = HandleKey {
                    target: Target::Interface(if_index),
                    hook,
                };
                let netns = binding.netns.as_deref();
                let result = match bindings.interface_name(if_index) {
                    Some(name) => {
                        log::debug!(
                            "{hook}: attaching to {}({}), {} ({})",
                            name,
                            if_index,
                            binding.key,
                            binding.location()
                        );
                        attach_in(namespaces, netns, || probes.attach_interface(hook, name))
                    }
                    None => Err(FailureCause::UnnamedInterface(if_index)),
                };

                match result {
                    Ok(link) => {
                        handles.push(HookHandle::new(key, netns.map(Path::to_path_buf), link))
                    }
                    Err(cause) => {
                        log::warn!("{hook}: failed to attach to interface {if_index}: {cause}");
                        failures.push(AttachFailure { key, cause });
                    }
                }
            }
            failures
        })
    }

    /// Detaches every handle, container handles from inside their namespace while it still
    /// exists. Failures are logged and skipped. Calling it again is a no-op.
    ///
    /// # Returns
    ///
    /// The number of probes detached by this call.
    pub fn release(&mut self) -> usize {
        let handles = std::mem::take(&mut self.handles);
        if handles.is_empty() {
            return 0;
        }
        let namespaces = self.namespaces;

        run_pinned(move || {
            let mut released = 0;
            for mut handle in handles {
                let _guard = handle.netns().and_then(|path| match namespaces.enter(path) {
                    Ok(guard) => Some(guard),
                    Err(err) => {
                        log::warn!(
                            "{}: detaching from the host namespace instead: {}",
                            handle.key(),
                            err
                        );
                        None
                    }
                });
                match handle.release() {
                    Ok(true) => released += 1,
                    Ok(false) => {}
                    Err(err) => log::error!("{}: failed to detach: {}", handle.key(), err),
                }
            }
            log::info!("Released {released} probes");
            released
        })
    }
}

/// Runs `attach` inside the namespace at `netns`, or in place for host interfaces. The previous
/// namespace is restored before returning.
fn attach_in<N, F>(
    namespaces: &N,
    netns: Option<&Path>,
    attach: F,
) -> std::result::Result<Box<dyn ProbeLink>, FailureCause>
where
    N: NamespaceOps,
    F: FnOnce() -> probe::Result<Box<dyn ProbeLink>>,
{
    let _guard = netns.map(|path| namespaces.enter(path)).transpose()?;
    Ok(attach()?)
}
